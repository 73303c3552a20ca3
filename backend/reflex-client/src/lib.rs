pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod proto;
pub mod session;

#[cfg(test)]
mod tests;

use std::time::Duration;

/// Delay between reconnect attempts when nothing else is configured.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(5000);

/// Close code a server sends to tell the client not to reconnect.
pub const DO_NOT_RECONNECT_CLOSE_CODE: u16 = 4000;

/// Close code used for an ordinary local shutdown.
pub const NORMAL_CLOSE_CODE: u16 = 1000;
