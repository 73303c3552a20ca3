// Unit tests for the connection state machine.
// Time is paused: every retry delay is crossed deterministically by sleeping.

use crate::connection::{ChannelEvent, ConnectionState, Frame};
use crate::proto::{InboundFrame, Payload};
use crate::tests::support::{
    Attempt, RETRY_DELAY, ScriptedConnector, scripted_manager, settle,
};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;

/// **VALUE**: Verifies that `send()` on a fresh manager connects exactly once, then transmits.
///
/// **WHY THIS MATTERS**: The first UI event of a page is usually what opens the channel.
/// If `send()` skipped the connect or connected twice, that event would be lost or duplicated.
///
/// **BUG THIS CATCHES**: Would catch if the open-state check before sending is inverted,
/// or if the connect gate re-check is removed and both checks connect.
#[tokio::test(start_paused = true)]
async fn given_no_channel_when_send_called_then_connects_once_and_transmits() {
    // GIVEN: A manager that has never connected
    let connector = ScriptedConnector::new();
    let manager = scripted_manager(&connector);
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    // WHEN: Sending a text payload
    manager.send("hello").await.expect("send should succeed");

    // THEN: Exactly one connect happened and the frame reached the transport unmodified
    assert_eq!(connector.attempts(), 1, "Should connect exactly once");
    assert_eq!(manager.state(), ConnectionState::Open);
    let mut remote = connector.take_remote();
    assert_eq!(remote.frames.recv().await, Some(Frame::Text("hello".to_string())));

    // AND: A second send reuses the open channel
    manager.send(vec![1u8, 2, 3]).await.expect("second send");
    assert_eq!(connector.attempts(), 1, "Should not reconnect while open");
    assert_eq!(remote.frames.recv().await, Some(Frame::Binary(vec![1, 2, 3])));
}

/// **VALUE**: Verifies that structured payloads go out as JSON text frames.
///
/// **WHY THIS MATTERS**: The server reads events with a JSON decoder. A structured value
/// sent as anything but its JSON text would be unreadable on the other side.
///
/// **BUG THIS CATCHES**: Would catch if `Payload::Structured` were sent via `Debug` formatting
/// or as a binary frame.
#[tokio::test(start_paused = true)]
async fn given_structured_payload_when_sent_then_transmitted_as_json_text() {
    // GIVEN: An open manager
    let connector = ScriptedConnector::new();
    let manager = scripted_manager(&connector);
    manager.connect().await.expect("connect");
    let mut remote = connector.take_remote();

    // WHEN: Sending a structured value
    manager
        .send_json(&json!({"name": "increment", "args": [1]}))
        .await
        .expect("send_json");

    // THEN: The transport receives its JSON text
    match remote.frames.recv().await {
        Some(Frame::Text(text)) => {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value, json!({"name": "increment", "args": [1]}));
        }
        other => panic!("Expected a text frame, got {other:?}"),
    }
}

/// **VALUE**: Verifies that a failed opening handshake is returned to the caller and
/// does not start the reconnect loop.
///
/// **WHY THIS MATTERS**: Explicit callers decide what to do about a server that is not
/// there yet. Retrying behind their back would hide the failure and race their own retry.
///
/// **BUG THIS CATCHES**: Would catch if the open-failure path schedules a retry, or if
/// the error is swallowed instead of propagated.
#[tokio::test(start_paused = true)]
async fn given_open_failure_when_connect_called_then_error_returned_and_no_retry() {
    // GIVEN: A server that refuses the first handshake
    let connector = ScriptedConnector::new();
    connector.then(Attempt::Fail, 1);
    let manager = scripted_manager(&connector);

    // WHEN: Connecting
    let result = manager.connect().await;

    // THEN: The open failure is returned
    let err = result.expect_err("connect should fail");
    assert!(err.is_open_failure(), "Should be an open failure: {err}");
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    // AND: Nothing retries, even after several delays
    sleep(RETRY_DELAY * 3).await;
    assert_eq!(connector.attempts(), 1, "Open failures must not be retried");
    assert_eq!(manager.connect_attempts(), 1);
    assert_eq!(manager.epoch(), 0, "No channel was ever opened");
    assert_eq!(manager.settings().retry_delay, RETRY_DELAY);
}

/// **VALUE**: Verifies that `send()` propagates an open failure of its implicit connect.
///
/// **WHY THIS MATTERS**: The caller of `send()` must learn that its event was not delivered.
///
/// **BUG THIS CATCHES**: Would catch if `send()` ignored the connect result and queued the
/// frame on a missing channel.
#[tokio::test(start_paused = true)]
async fn given_unreachable_server_when_send_called_then_open_failure_propagates() {
    let connector = ScriptedConnector::new();
    connector.then(Attempt::Fail, 1);
    let manager = scripted_manager(&connector);

    let result = manager.send("lost").await;

    assert!(result.expect_err("send should fail").is_open_failure());
    assert_eq!(connector.attempts(), 1);
}

/// **VALUE**: Verifies that reconnects keep going through N failures, one attempt per delay,
/// until the server is back.
///
/// **WHY THIS MATTERS**: The client assumes the server comes back eventually. Giving up after
/// a few failures would leave the page frozen after a server restart.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The loop stops after the first failed attempt
/// - Attempts are not spaced by the configured delay (e.g. exponential growth)
/// - The loop keeps connecting after it succeeded
#[tokio::test(start_paused = true)]
async fn given_transport_error_when_reconnects_fail_n_times_then_n_plus_one_attempts_spaced_by_delay()
 {
    // GIVEN: An open connection and a server that will refuse the next 3 handshakes
    const FAILURES: usize = 3;
    let connector = ScriptedConnector::new();
    let manager = scripted_manager(&connector);
    manager.connect().await.expect("initial connect");
    let remote = connector.take_remote();
    connector.then(Attempt::Fail, FAILURES);

    // WHEN: The established channel reports a transport error
    remote
        .events
        .send(ChannelEvent::Error("connection reset".to_string()))
        .unwrap();
    settle().await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    // THEN: After enough delays the manager is open again
    sleep(RETRY_DELAY * (FAILURES as u32 + 2)).await;
    assert_eq!(manager.state(), ConnectionState::Open);
    assert_eq!(manager.epoch(), 2, "Should be on the second epoch");

    // AND: Exactly N+1 reconnect attempts happened after the initial connect
    let times = connector.attempt_times();
    assert_eq!(times.len(), 1 + FAILURES + 1, "Should make N+1 reconnect attempts");

    // AND: Consecutive reconnect attempts are exactly one delay apart
    for pair in times[1..].windows(2) {
        assert_eq!(pair[1] - pair[0], RETRY_DELAY, "Attempts should be one delay apart");
    }
}

/// **VALUE**: Verifies that an unexpected remote close reconnects after the delay, not before.
///
/// **WHY THIS MATTERS**: Reconnecting immediately would hammer a server that just went down.
///
/// **BUG THIS CATCHES**: Would catch if the retry delay is skipped or applied twice.
#[tokio::test(start_paused = true)]
async fn given_unexpected_close_when_delay_elapses_then_reconnects() {
    // GIVEN: An open connection
    let connector = ScriptedConnector::new();
    let manager = scripted_manager(&connector);
    manager.connect().await.expect("connect");
    let remote = connector.take_remote();

    // WHEN: The server closes without being asked
    remote
        .events
        .send(ChannelEvent::Closed {
            code: Some(1001),
            reason: "going away".to_string(),
        })
        .unwrap();

    // THEN: No attempt just before the delay elapses
    sleep(RETRY_DELAY - Duration::from_millis(10)).await;
    assert_eq!(connector.attempts(), 1, "Should wait for the retry delay");

    // AND: One attempt right after it
    sleep(Duration::from_millis(20)).await;
    assert_eq!(connector.attempts(), 2, "Should reconnect after the delay");
    assert!(manager.is_open());
}

/// **VALUE**: Verifies that a transport that vanishes without a close frame counts as an
/// unexpected close.
///
/// **WHY THIS MATTERS**: Network drops often produce no close frame at all.
///
/// **BUG THIS CATCHES**: Would catch if the watcher exits silently when its event stream ends.
#[tokio::test(start_paused = true)]
async fn given_transport_gone_without_close_frame_when_delay_elapses_then_reconnects() {
    let connector = ScriptedConnector::new();
    let manager = scripted_manager(&connector);
    manager.connect().await.expect("connect");

    drop(connector.take_remote());
    sleep(RETRY_DELAY + Duration::from_millis(10)).await;

    assert_eq!(connector.attempts(), 2);
    assert!(manager.is_open());
}

/// **VALUE**: Verifies that the close event produced by a local `close()` never reconnects.
///
/// **WHY THIS MATTERS**: Local close is the only way an embedding application can stop the
/// client. If it reconnected, the application could never shut the connection down.
///
/// **BUG THIS CATCHES**: Would catch if the manual-close flag is not set before the close
/// request, or is ignored when the close event arrives.
#[tokio::test(start_paused = true)]
async fn given_local_close_when_close_event_arrives_then_no_reconnect() {
    // GIVEN: An open connection
    let connector = ScriptedConnector::new();
    let manager = scripted_manager(&connector);
    manager.connect().await.expect("connect");
    let mut remote = connector.take_remote();

    // WHEN: Closing locally with a code and reason
    manager.close(Some(1000), Some("bye"));
    assert_eq!(manager.state(), ConnectionState::Closing);

    // THEN: The close request reaches the transport
    assert_eq!(
        remote.frames.recv().await,
        Some(Frame::Close {
            code: Some(1000),
            reason: Some("bye".to_string()),
        })
    );

    // WHEN: The transport confirms the close
    remote
        .events
        .send(ChannelEvent::Closed {
            code: Some(1000),
            reason: "bye".to_string(),
        })
        .unwrap();

    // THEN: No reconnect, even after several delays
    sleep(RETRY_DELAY * 3).await;
    assert_eq!(connector.attempts(), 1, "Local close must not reconnect");
    assert_eq!(manager.state(), ConnectionState::Closed);
}

/// **VALUE**: Verifies that a local close also stops a reconnect loop waiting between attempts.
///
/// **WHY THIS MATTERS**: An application shutting down during an outage must be able to stop
/// the loop; otherwise it reconnects after the application considered itself closed.
///
/// **BUG THIS CATCHES**: Would catch if the retry loop ignores its superseded generation.
#[tokio::test(start_paused = true)]
async fn given_pending_reconnect_when_closed_locally_then_loop_stops() {
    // GIVEN: A connection that dropped and is waiting to reconnect
    let connector = ScriptedConnector::new();
    let manager = scripted_manager(&connector);
    manager.connect().await.expect("connect");
    drop(connector.take_remote());
    settle().await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    // WHEN: Closing locally before the delay elapses
    manager.close(None, None);

    // THEN: Closed, and no reconnect attempt ever happens
    assert_eq!(manager.state(), ConnectionState::Closed);
    sleep(RETRY_DELAY * 3).await;
    assert_eq!(connector.attempts(), 1);
}

/// **VALUE**: Verifies that a remote close with the reserved "do not reconnect" code is final.
///
/// **WHY THIS MATTERS**: It is the server's only way to tell a client to go away for good.
///
/// **BUG THIS CATCHES**: Would catch if the terminal code comparison is dropped and every
/// remote close is retried.
#[tokio::test(start_paused = true)]
async fn given_terminal_close_code_when_server_closes_then_no_reconnect() {
    let connector = ScriptedConnector::new();
    let manager = scripted_manager(&connector);
    manager.connect().await.expect("connect");
    let remote = connector.take_remote();

    remote
        .events
        .send(ChannelEvent::Closed {
            code: Some(crate::DO_NOT_RECONNECT_CLOSE_CODE),
            reason: "session over".to_string(),
        })
        .unwrap();

    sleep(RETRY_DELAY * 3).await;
    assert_eq!(connector.attempts(), 1);
    assert_eq!(manager.state(), ConnectionState::Closed);
}

/// **VALUE**: Verifies that events from a replaced channel are ignored.
///
/// **WHY THIS MATTERS**: Only one channel may be live. A late error from the previous
/// channel must not tear down or duplicate the current one.
///
/// **BUG THIS CATCHES**: Would catch if the epoch check in the end-of-channel handler is removed.
#[tokio::test(start_paused = true)]
async fn given_replaced_channel_when_old_channel_errors_then_current_channel_unaffected() {
    // GIVEN: Two consecutive explicit connects
    let connector = ScriptedConnector::new();
    let manager = scripted_manager(&connector);
    manager.connect().await.expect("first connect");
    let first = connector.take_remote();
    manager.connect().await.expect("second connect");
    let _second = connector.take_remote();
    assert_eq!(manager.epoch(), 2);

    // WHEN: The first channel reports an error afterwards
    let _ = first
        .events
        .send(ChannelEvent::Error("late failure".to_string()));

    // THEN: The second channel stays open and nothing reconnects
    sleep(RETRY_DELAY * 3).await;
    assert_eq!(connector.attempts(), 2);
    assert!(manager.is_open());
    assert_eq!(manager.epoch(), 2);
}

/// **VALUE**: Verifies that inbound messages reach the observer in transport order,
/// tagged with their epoch.
///
/// **WHY THIS MATTERS**: The session treats the first message as identity and later ones as
/// updates. Any reordering would apply markup as identity or vice versa.
///
/// **BUG THIS CATCHES**: Would catch if delivery is parallelized or batched.
#[tokio::test(start_paused = true)]
async fn given_observer_when_messages_arrive_then_delivered_in_order_with_epoch() {
    // GIVEN: An observer recording every frame
    let connector = ScriptedConnector::new();
    let manager = scripted_manager(&connector);
    let seen: Arc<Mutex<Vec<InboundFrame>>> = Arc::default();
    let sink = Arc::clone(&seen);
    manager.set_message_observer(move |frame| sink.lock().unwrap().push(frame));
    manager.connect().await.expect("connect");
    let remote = connector.take_remote();

    // WHEN: Three messages arrive
    for text in ["one", "two", "three"] {
        remote
            .events
            .send(ChannelEvent::Message(Payload::Text(text.to_string())))
            .unwrap();
    }
    settle().await;

    // THEN: All three arrive in order on epoch 1
    let seen = seen.lock().unwrap();
    let texts: Vec<_> = seen
        .iter()
        .map(|frame| frame.payload.as_text().unwrap().into_owned())
        .collect();
    assert_eq!(texts, ["one", "two", "three"]);
    assert!(seen.iter().all(|frame| frame.epoch == 1));
}

/// **VALUE**: Verifies that `send()` after a local close starts the machine again.
///
/// **WHY THIS MATTERS**: Closed is terminal only until the application explicitly reconnects.
///
/// **BUG THIS CATCHES**: Would catch if a stale manual-close flag survives the new open and
/// suppresses retries on the new channel.
#[tokio::test(start_paused = true)]
async fn given_closed_manager_when_send_called_then_reconnects_and_retries_again() {
    // GIVEN: A locally closed manager
    let connector = ScriptedConnector::new();
    let manager = scripted_manager(&connector);
    manager.connect().await.expect("connect");
    let first = connector.take_remote();
    manager.close(Some(1000), None);
    first
        .events
        .send(ChannelEvent::Closed {
            code: Some(1000),
            reason: String::new(),
        })
        .unwrap();
    settle().await;
    assert_eq!(manager.state(), ConnectionState::Closed);

    // WHEN: Sending again
    manager.send("again").await.expect("send after close");

    // THEN: A new channel was opened
    assert_eq!(connector.attempts(), 2);
    assert!(manager.is_open());

    // AND: Its unexpected loss is retried again
    drop(connector.take_remote());
    sleep(RETRY_DELAY + Duration::from_millis(10)).await;
    assert_eq!(connector.attempts(), 3, "Manual close flag should reset on open");
}

/// **VALUE**: Verifies that dropping the last manager handle stops a pending reconnect loop.
///
/// **WHY THIS MATTERS**: Background tasks must not outlive the session that owns them.
///
/// **BUG THIS CATCHES**: Would catch if the retry loop holds a strong reference to the manager.
#[tokio::test(start_paused = true)]
async fn given_pending_reconnect_when_manager_dropped_then_no_attempt() {
    let connector = ScriptedConnector::new();
    let manager = scripted_manager(&connector);
    manager.connect().await.expect("connect");
    drop(connector.take_remote());
    settle().await;

    drop(manager);
    sleep(RETRY_DELAY * 3).await;

    assert_eq!(connector.attempts(), 1);
}
