//! Connection management for the duplex channel to the page server.
//!
//! This module owns everything below the message protocol:
//!
//! - Address derivation from the page URL (`http` → `ws`, `https` → `wss`)
//! - The [`Connector`] seam that opens channels (WebSocket in production)
//! - [`ConnectionManager`], the connect / detect-drop / retry state machine
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected → Connecting → Open → Closing → Closed
//!                    ↑          │
//!                    └─ delay ──┘  (transport error or unexpected close)
//! ```
//!
//! A failed opening handshake is returned to whoever called `connect()` or
//! `send()`. Once a channel has been open, its failures are never returned to
//! anyone: they are logged and the manager reconnects on a fixed delay until an
//! attempt succeeds, the application closes locally, or the server closes with
//! the terminal close code.

mod address;
mod channel;
mod manager;
mod state;
mod websocket;

pub use address::socket_address;
pub use channel::{Channel, ChannelEvent, ChannelRemote, Connector, Frame};
pub use manager::{ConnectionManager, ConnectionSettings};
pub use state::{ConnectionState, Disconnect};
pub use websocket::WebSocketConnector;

#[cfg(test)]
pub(crate) use state::Ending;
