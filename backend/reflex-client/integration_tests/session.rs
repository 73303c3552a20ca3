use crate::helpers::{TestServer, close_with, eventually, receive_text, send_text, test_config};

use reflex_client::event::MouseEvent;
use reflex_client::session::{MemoryPage, Session};

use serde_json::{Value, json};

/// **VALUE**: Verifies the whole protocol against a real server: identity, event, markup,
/// then a server restart with a new identity.
///
/// **WHY THIS MATTERS**: This is what a counter page does in production.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The event envelope does not reach the server as JSON
/// - Markup is not applied to the element named by the identity message
/// - The session does not rebind after reconnecting
#[tokio::test]
async fn given_counter_page_when_clicking_and_server_restarts_then_page_tracks_server() {
    // GIVEN: A session for a page with a counter element
    let mut server = TestServer::start().await;
    let page = MemoryPage::new().with_element("counter", "Count: 0");
    let session = Session::new(&server.page_url(), &test_config(), page).expect("session");
    session.connect().await.expect("connect");
    let mut socket = server.next_socket().await;

    // WHEN: The server binds the session and the user clicks
    send_text(&mut socket, r#"{"elementID":"counter"}"#).await;
    session
        .event(&MouseEvent::click(), "increment", Some(json!([1])))
        .await
        .expect("event");

    // THEN: The server receives the event envelope
    let sent: Value = serde_json::from_str(&receive_text(&mut socket).await).unwrap();
    assert_eq!(sent["name"], "increment");
    assert_eq!(sent["args"], json!([1]));
    assert_eq!(sent["event"]["type"], "click");

    // WHEN: The server renders the new count
    send_text(&mut socket, "Count: 1").await;

    // THEN: The page shows it
    assert!(
        eventually(|| session.page().content("counter").as_deref() == Some("Count: 1")).await
    );

    // WHEN: The server restarts and the client comes back
    close_with(socket, 1001, "restarting").await;
    let mut socket = server.next_socket().await;
    send_text(&mut socket, r#"{"elementID":"counter"}"#).await;
    send_text(&mut socket, "Count: 0").await;

    // THEN: The identity is consumed and the fresh markup applied
    assert!(
        eventually(|| session.page().content("counter").as_deref() == Some("Count: 0")).await
    );
    assert_eq!(session.state().bound_epoch, Some(2));
}
