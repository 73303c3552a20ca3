use crate::helpers::{
    TestServer, close_with, eventually, receive_close, receive_text, send_text, test_config,
    unused_port,
};

use reflex_client::connection::{ConnectionManager, ConnectionState};
use reflex_client::proto::Payload;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

/// **VALUE**: Verifies a real WebSocket round trip: the client connects on send and the
/// server's replies reach the observer.
///
/// **WHY THIS MATTERS**: The unit tests use a scripted channel. This proves the
/// tokio-tungstenite transport honours the same contract.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The http → ws address switch produces an unreachable URL
/// - Frames are not pumped in one of the two directions
/// - Structured payloads are not sent as JSON text
#[tokio::test]
async fn given_running_server_when_sending_then_frames_flow_both_ways() {
    // GIVEN: A local server and a manager observing inbound messages
    let mut server = TestServer::start().await;
    let manager = ConnectionManager::from_page_url(&server.page_url(), &test_config())
        .expect("Address should derive");
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    manager.set_message_observer(move |frame| {
        let text = frame.payload.as_text().map(|t| t.into_owned());
        sink.lock().unwrap().push(text);
    });

    // WHEN: Sending before any explicit connect
    manager
        .send_json(&json!({"name": "ping"}))
        .await
        .expect("send should connect and succeed");
    let mut socket = server.next_socket().await;

    // THEN: The server gets the JSON text
    let sent: serde_json::Value = serde_json::from_str(&receive_text(&mut socket).await).unwrap();
    assert_eq!(sent, json!({"name": "ping"}));

    // WHEN: The server replies
    send_text(&mut socket, "pong").await;

    // THEN: The observer sees it
    assert!(
        eventually(|| received.lock().unwrap().len() == 1).await,
        "Reply should reach the observer"
    );
    assert_eq!(received.lock().unwrap()[0].as_deref(), Some("pong"));
    assert_eq!(manager.state(), ConnectionState::Open);
}

/// **VALUE**: Verifies connecting to a port with no server fails with an open error.
///
/// **BUG THIS CATCHES**: Would catch if connection refusal is swallowed or retried.
#[tokio::test]
async fn given_no_server_when_connecting_then_open_failure() {
    let port = unused_port().await;
    let page_url = format!("http://127.0.0.1:{port}/counter");
    let manager = ConnectionManager::from_page_url(&page_url, &test_config()).unwrap();

    let err = manager.connect().await.expect_err("connect should fail");

    assert!(err.is_open_failure(), "got {err}");
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

/// **VALUE**: Verifies the client reconnects after the server closes the socket.
///
/// **WHY THIS MATTERS**: Server restarts and deploys close every socket with 1001.
/// Clients must come back without the user reloading.
#[tokio::test]
async fn given_open_connection_when_server_closes_then_client_reconnects() {
    // GIVEN: A connected client
    let mut server = TestServer::start().await;
    let manager = ConnectionManager::from_page_url(&server.page_url(), &test_config()).unwrap();
    manager.connect().await.expect("connect");
    let socket = server.next_socket().await;

    // WHEN: The server goes away
    close_with(socket, 1001, "restarting").await;

    // THEN: The client connects again
    let mut socket = server.next_socket().await;
    assert!(eventually(|| manager.is_open()).await);
    assert_eq!(manager.epoch(), 2);

    // AND: The new connection carries traffic
    manager.send(Payload::from("after reconnect")).await.unwrap();
    assert_eq!(receive_text(&mut socket).await, "after reconnect");
}

/// **VALUE**: Verifies a server close with the terminal code is final.
#[tokio::test]
async fn given_open_connection_when_server_closes_with_terminal_code_then_no_reconnect() {
    let mut server = TestServer::start().await;
    let manager = ConnectionManager::from_page_url(&server.page_url(), &test_config()).unwrap();
    manager.connect().await.expect("connect");
    let socket = server.next_socket().await;

    close_with(socket, reflex_client::DO_NOT_RECONNECT_CLOSE_CODE, "go away").await;

    assert!(eventually(|| manager.state() == ConnectionState::Closed).await);
    assert!(
        !server.accepts_within(Duration::from_millis(500)).await,
        "Terminal close must not reconnect"
    );
}

/// **VALUE**: Verifies a local close sends the close code to the server and never reconnects.
///
/// **BUG THIS CATCHES**: Would catch if the close frame is not written, or if the echoed
/// close from the server is mistaken for an unexpected close.
#[tokio::test]
async fn given_open_connection_when_closed_locally_then_server_sees_code_and_no_reconnect() {
    let mut server = TestServer::start().await;
    let manager = ConnectionManager::from_page_url(&server.page_url(), &test_config()).unwrap();
    manager.connect().await.expect("connect");
    let mut socket = server.next_socket().await;

    manager.close(Some(reflex_client::NORMAL_CLOSE_CODE), Some("done"));

    assert_eq!(receive_close(&mut socket).await, Some(1000));
    drop(socket);
    assert!(eventually(|| manager.state() == ConnectionState::Closed).await);
    assert!(!server.accepts_within(Duration::from_millis(500)).await);
}
