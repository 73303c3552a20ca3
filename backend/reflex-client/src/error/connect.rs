//! Errors surfaced to explicit callers of `connect()` and `send()`.
//!
//! Failures of an already established channel never reach a caller. The
//! reconnect loop logs them and handles them.

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;
use tokio_tungstenite::tungstenite::Error as WsError;

#[derive(Debug, ThisError)]
pub enum ConnectError {
    #[error("Address Error: {message} {location}")]
    Address {
        message: String,
        location: ErrorLocation,
    },

    /// The opening handshake did not complete.
    #[error("Open Error: {message} {location}")]
    Open {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Serialize Error: {message} {location}")]
    Serialize {
        message: String,
        location: ErrorLocation,
    },
}

impl ConnectError {
    #[track_caller]
    pub fn address(message: impl Into<String>) -> Self {
        ConnectError::Address {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn open(message: impl Into<String>) -> Self {
        ConnectError::Open {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn send(message: impl Into<String>) -> Self {
        ConnectError::Send {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// True for failures of the opening handshake.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, ConnectError::Open { .. })
    }
}

impl From<url::ParseError> for ConnectError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        ConnectError::Address {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for ConnectError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        ConnectError::Serialize {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<WsError> for ConnectError {
    #[track_caller]
    fn from(error: WsError) -> Self {
        ConnectError::Open {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
