use reflex_client::error::{ConfigError, CoreError, SessionError};

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error;

/// Errors surfaced by the terminal client.
///
/// Library errors are flattened to their message; the location records where
/// the application received them.
#[derive(Debug, Error)]
pub enum ReflexError {
    /// Error from this App
    #[error("Reflex Error: {message} {location}")]
    Reflex {
        message: String,
        location: ErrorLocation,
    },

    /// Error from reflex-client operations (config, connect, session)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// A stdin line could not be turned into an event
    #[error("Input Error: {message} {location}")]
    Input {
        message: String,
        location: ErrorLocation,
    },
}

impl ReflexError {
    #[track_caller]
    pub fn reflex(message: impl Into<String>) -> Self {
        ReflexError::Reflex {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn input(message: impl Into<String>) -> Self {
        ReflexError::Input {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<CoreError> for ReflexError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        ReflexError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for ReflexError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        ReflexError::from(CoreError::from(error))
    }
}

impl From<SessionError> for ReflexError {
    #[track_caller]
    fn from(error: SessionError) -> Self {
        ReflexError::from(CoreError::from(error))
    }
}
