//! Test helpers for WebSocket integration tests.
//!
//! This module provides a local page server the client can talk to:
//! - Accepting WebSocket connections on an ephemeral port
//! - Handing each accepted socket to the test body, in accept order
//! - Sending and receiving text frames
//! - Closing with a chosen close code

use reflex_client::config::ClientConfig;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{WebSocketStream, accept_async};

pub type ServerSocket = WebSocketStream<TcpStream>;

/// Short reconnect delay so reconnect tests finish quickly on a real clock.
pub const TEST_RETRY_DELAY_MS: u64 = 100;

/// Upper bound for anything the tests wait on.
pub const WAIT: Duration = Duration::from_secs(5);

/// A page server on 127.0.0.1 that accepts every WebSocket upgrade.
pub struct TestServer {
    pub port: u16,
    sockets: UnboundedReceiver<ServerSocket>,
    accept_task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let port = listener.local_addr().expect("No local address").port();
        let (sockets_tx, sockets) = unbounded_channel();

        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                match accept_async(stream).await {
                    Ok(socket) => {
                        if sockets_tx.send(socket).is_err() {
                            return;
                        }
                    }
                    Err(e) => eprintln!("Test server handshake failed: {e}"),
                }
            }
        });

        Self {
            port,
            sockets,
            accept_task,
        }
    }

    /// Address of the page this server serves.
    pub fn page_url(&self) -> String {
        format!("http://127.0.0.1:{}/counter", self.port)
    }

    /// Next accepted socket, in accept order.
    pub async fn next_socket(&mut self) -> ServerSocket {
        timeout(WAIT, self.sockets.recv())
            .await
            .expect("Timed out waiting for a client connection")
            .expect("Accept loop stopped")
    }

    /// Whether another client connects within `within`.
    pub async fn accepts_within(&mut self, within: Duration) -> bool {
        matches!(timeout(within, self.sockets.recv()).await, Ok(Some(_)))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// Client config pointing at nothing, with the short test delay.
pub fn test_config() -> ClientConfig {
    ClientConfig {
        retry_delay_ms: TEST_RETRY_DELAY_MS,
        ..ClientConfig::default()
    }
}

/// Port that nothing listens on.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    listener.local_addr().expect("No local address").port()
}

pub async fn send_text(socket: &mut ServerSocket, text: &str) {
    socket
        .send(Message::Text(text.into()))
        .await
        .expect("Failed to send text frame");
}

/// Next text frame from the client, skipping control frames.
pub async fn receive_text(socket: &mut ServerSocket) -> String {
    loop {
        let message = timeout(WAIT, socket.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Socket ended")
            .expect("Error receiving frame");

        match message {
            Message::Text(text) => return text.to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Expected a text frame, got {other:?}"),
        }
    }
}

/// Wait for the client's close frame and return its code.
pub async fn receive_close(socket: &mut ServerSocket) -> Option<u16> {
    loop {
        let message = timeout(WAIT, socket.next())
            .await
            .expect("Timed out waiting for close")
            .expect("Socket ended before close")
            .expect("Error receiving close");

        if let Message::Close(frame) = message {
            return frame.map(|f| u16::from(f.code));
        }
    }
}

/// Close from the server side with `code` and let the handshake finish.
pub async fn close_with(mut socket: ServerSocket, code: u16, reason: &str) {
    socket
        .close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        }))
        .await
        .expect("Failed to send close frame");

    let _ = timeout(WAIT, async { while let Some(Ok(_)) = socket.next().await {} }).await;
}

/// Poll `condition` until it holds or the wait bound passes.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
