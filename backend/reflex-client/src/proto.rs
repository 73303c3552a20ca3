//! Wire messages exchanged with the server.
//!
//! Outbound, the client sends one JSON text frame per UI interaction:
//!
//! ```json
//! { "name": "increment", "event": { "type": "click", ... }, "args": [1] }
//! ```
//!
//! Inbound, the first frame of every connection epoch is an identity message
//! (`{"elementID": "root"}`) and every later frame is raw markup for that element.

use crate::error::connect::ConnectError;
use crate::event::EventSnapshot;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Data handed to [`ConnectionManager::send`](crate::connection::ConnectionManager::send).
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Sent unmodified as a text frame.
    Text(String),
    /// Sent unmodified as a binary frame.
    Binary(Vec<u8>),
    /// Serialized to JSON and sent as a text frame.
    Structured(Value),
}

impl Payload {
    /// Serialize any value into a structured payload.
    pub fn structured<T: Serialize>(value: &T) -> Result<Self, ConnectError> {
        Ok(Payload::Structured(serde_json::to_value(value)?))
    }

    /// Text view of the payload, if it is (or decodes to) UTF-8.
    pub fn as_text(&self) -> Option<std::borrow::Cow<'_, str>> {
        match self {
            Payload::Text(text) => Some(text.as_str().into()),
            Payload::Binary(bytes) => std::str::from_utf8(bytes).ok().map(Into::into),
            Payload::Structured(value) => Some(value.to_string().into()),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(bytes)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Structured(value)
    }
}

/// One UI interaction forwarded to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub name: String,
    pub event: EventSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

/// First message of a connection epoch: binds the session to a page element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMessage {
    #[serde(rename = "elementID")]
    pub element_id: String,
}

/// A message received from the server, tagged with the epoch of the channel it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    pub epoch: u64,
    pub payload: Payload,
}
