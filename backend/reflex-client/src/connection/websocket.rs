//! WebSocket transport for the connection manager.
//!
//! [`WebSocketConnector`] performs the opening handshake with
//! tokio-tungstenite and then hands the socket to a pump task that shuttles
//! frames between the socket and the [`ChannelRemote`] queues.

use crate::connection::channel::{Channel, ChannelEvent, ChannelRemote, Connector, Frame};
use crate::error::connect::ConnectError;
use crate::proto::Payload;

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use log::{debug, trace, warn};
use tokio::net::TcpStream;
use tokio::spawn as TokioSpawn;
use tokio::time::timeout as TokioTimeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

type SocketStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to keep reading after a close frame so the handshake can finish.
const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Opens real WebSocket channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn open(&self, address: &Url) -> BoxFuture<'static, Result<Channel, ConnectError>> {
        let address = address.to_string();

        Box::pin(async move {
            debug!("Opening WebSocket to {address}");

            let (stream, response) = connect_async(address.as_str())
                .await
                .map_err(|e| ConnectError::open(format!("Handshake with {address} failed: {e}")))?;

            debug!(
                "WebSocket handshake with {address} completed (HTTP {})",
                response.status()
            );

            let (channel, remote) = Channel::pair();
            TokioSpawn(pump(stream, remote));
            Ok(channel)
        })
    }
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(bytes) => Message::Binary(bytes.into()),
        Frame::Close { code: None, .. } => Message::Close(None),
        Frame::Close {
            code: Some(code),
            reason,
        } => Message::Close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: reason.unwrap_or_default().into(),
        })),
    }
}

/// Moves frames between the socket and the manager until either side goes away.
///
/// Exactly one terminal event (`Error` or `Closed`) is reported per socket. If
/// the manager drops its end first, the socket is closed quietly.
async fn pump(stream: SocketStream, remote: ChannelRemote) {
    let ChannelRemote { events, mut frames } = remote;
    let (mut write, mut read) = stream.split();
    let mut closing = false;

    loop {
        tokio::select! {
            frame = frames.recv(), if !closing => match frame {
                Some(frame) => {
                    closing = matches!(frame, Frame::Close { .. });
                    if let Err(e) = write.send(to_message(frame)).await {
                        warn!("WebSocket write failed: {e}");
                        let _ = events.send(ChannelEvent::Error(e.to_string()));
                        return;
                    }
                }
                None => {
                    debug!("Channel discarded, closing socket");
                    let _ = write.close().await;
                    return;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    trace!("Received text frame ({} bytes)", text.len());
                    let _ = events.send(ChannelEvent::Message(Payload::Text(text.to_string())));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    trace!("Received binary frame ({} bytes)", bytes.len());
                    let _ = events.send(ChannelEvent::Message(Payload::Binary(bytes.to_vec())));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                        .unwrap_or((None, String::new()));
                    debug!("Received close frame (code {code:?})");
                    let _ = events.send(ChannelEvent::Closed { code, reason });

                    // Keep polling so tungstenite can answer the close and finish the handshake.
                    let _ = TokioTimeout(CLOSE_DRAIN_TIMEOUT, async {
                        while let Some(Ok(_)) = read.next().await {}
                    })
                    .await;
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket read failed: {e}");
                    let _ = events.send(ChannelEvent::Error(e.to_string()));
                    return;
                }
                None => {
                    let _ = events.send(ChannelEvent::Closed {
                        code: None,
                        reason: String::new(),
                    });
                    return;
                }
            },
        }
    }
}
