//! The seam between the connection manager and the network.
//!
//! A [`Connector`] opens a [`Channel`]: a pair of unbounded queues, one carrying
//! [`Frame`]s out to the transport and one carrying [`ChannelEvent`]s back.
//! Whoever drives the transport holds the matching [`ChannelRemote`].

use crate::error::connect::ConnectError;
use crate::proto::Payload;

use futures_util::future::BoxFuture;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use url::Url;

/// Something the manager asks the transport to put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Close {
        code: Option<u16>,
        reason: Option<String>,
    },
}

impl TryFrom<Payload> for Frame {
    type Error = ConnectError;

    fn try_from(payload: Payload) -> Result<Self, Self::Error> {
        Ok(match payload {
            Payload::Text(text) => Frame::Text(text),
            Payload::Binary(bytes) => Frame::Binary(bytes),
            Payload::Structured(value) => Frame::Text(serde_json::to_string(&value)?),
        })
    }
}

/// Something the transport observed on an open channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Message(Payload),
    Error(String),
    Closed { code: Option<u16>, reason: String },
}

/// Manager side of an open channel.
#[derive(Debug)]
pub struct Channel {
    pub outbound: UnboundedSender<Frame>,
    pub inbound: UnboundedReceiver<ChannelEvent>,
}

/// Transport side of an open channel.
#[derive(Debug)]
pub struct ChannelRemote {
    pub events: UnboundedSender<ChannelEvent>,
    pub frames: UnboundedReceiver<Frame>,
}

impl Channel {
    /// Create a connected channel and its remote end.
    pub fn pair() -> (Channel, ChannelRemote) {
        let (frames_tx, frames_rx) = unbounded_channel();
        let (events_tx, events_rx) = unbounded_channel();

        (
            Channel {
                outbound: frames_tx,
                inbound: events_rx,
            },
            ChannelRemote {
                events: events_tx,
                frames: frames_rx,
            },
        )
    }
}

/// Opens channels to an address.
///
/// The returned future resolves once the remote end has acknowledged the open,
/// or fails with [`ConnectError::Open`] if the opening handshake does not complete.
pub trait Connector: Send + Sync + 'static {
    fn open(&self, address: &Url) -> BoxFuture<'static, Result<Channel, ConnectError>>;
}
