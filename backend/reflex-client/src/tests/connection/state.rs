// Unit tests for disconnect classification

use crate::connection::{ConnectionState, Disconnect, Ending};

const TERMINAL: Option<u16> = Some(4000);

/// **VALUE**: Verifies how each channel ending is classified while no local close is pending.
///
/// **WHY THIS MATTERS**: Classification decides between reconnecting and staying down.
/// Every misclassification is either a client that never recovers or one that cannot be stopped.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Transport errors are treated as terminal
/// - A close without a code is treated as the terminal code
/// - Ordinary remote close codes (1000, 1001) are treated as terminal
#[test]
fn given_no_local_close_when_classifying_then_only_terminal_code_is_terminal() {
    let error = Disconnect::classify(Ending::Error("reset".to_string()), false, TERMINAL);
    assert_eq!(error, Disconnect::TransportError("reset".to_string()));
    assert!(!error.is_terminal());

    for code in [None, Some(1000), Some(1001), Some(4001)] {
        let ending = Ending::Closed {
            code,
            reason: String::new(),
        };
        let disconnect = Disconnect::classify(ending, false, TERMINAL);
        assert!(
            !disconnect.is_terminal(),
            "Close with {code:?} should reconnect, got {disconnect}"
        );
    }

    let terminal = Disconnect::classify(
        Ending::Closed {
            code: Some(4000),
            reason: "done".to_string(),
        },
        false,
        TERMINAL,
    );
    assert_eq!(
        terminal,
        Disconnect::TerminalClose {
            code: 4000,
            reason: "done".to_string()
        }
    );
    assert!(terminal.is_terminal());
}

/// **VALUE**: Verifies that a pending local close makes any ending a local close.
///
/// **WHY THIS MATTERS**: A transport error can race the close handshake. Retrying then
/// would reopen a connection the application asked to shut.
#[test]
fn given_local_close_when_classifying_error_or_close_then_local_close() {
    let error = Disconnect::classify(Ending::Error("broken pipe".to_string()), true, TERMINAL);
    assert_eq!(error, Disconnect::LocalClose { code: None });

    let closed = Disconnect::classify(
        Ending::Closed {
            code: Some(1000),
            reason: String::new(),
        },
        true,
        TERMINAL,
    );
    assert_eq!(closed, Disconnect::LocalClose { code: Some(1000) });
    assert!(closed.is_terminal());
}

/// **VALUE**: Verifies that disabling the terminal code retries every remote close.
#[test]
fn given_no_terminal_code_when_server_closes_with_4000_then_unexpected_close() {
    let disconnect = Disconnect::classify(
        Ending::Closed {
            code: Some(4000),
            reason: String::new(),
        },
        false,
        None,
    );

    assert!(matches!(disconnect, Disconnect::UnexpectedClose { code: Some(4000), .. }));
}

#[test]
fn given_states_when_displayed_then_lowercase_names() {
    assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    assert_eq!(ConnectionState::Open.to_string(), "open");
    assert_eq!(ConnectionState::Closing.to_string(), "closing");
}
