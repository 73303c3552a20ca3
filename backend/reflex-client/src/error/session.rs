use crate::error::connect::ConnectError;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SessionError {
    /// The first message of a connection epoch was not a valid identity message.
    #[error("Identity Error: {message} {location}")]
    Identity {
        message: String,
        location: ErrorLocation,
    },

    #[error("Update Error: {message} {location}")]
    Update {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Connect(#[from] ConnectError),
}

impl SessionError {
    #[track_caller]
    pub fn identity(message: impl Into<String>) -> Self {
        SessionError::Identity {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn update(message: impl Into<String>) -> Self {
        SessionError::Update {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
