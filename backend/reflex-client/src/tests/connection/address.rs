// Unit tests for socket address derivation

use crate::connection::socket_address;
use crate::error::connect::ConnectError;

/// **VALUE**: Verifies plain and TLS page URLs map to the matching WebSocket schemes.
///
/// **WHY THIS MATTERS**: The socket lives on the same host, port and path as the page.
/// A wrong scheme or a lost port would point the client at nothing.
///
/// **BUG THIS CATCHES**: Would catch if `https` is mapped to `ws`, or if the port,
/// path or query are dropped while switching schemes.
#[test]
fn given_http_page_urls_when_deriving_socket_address_then_scheme_switches_and_rest_is_kept() {
    let plain = socket_address("http://localhost:3000/counter?user=7").unwrap();
    assert_eq!(plain.as_str(), "ws://localhost:3000/counter?user=7");

    let secure = socket_address("https://example.com/app/page").unwrap();
    assert_eq!(secure.as_str(), "wss://example.com/app/page");
}

/// **VALUE**: Verifies WebSocket URLs pass through unchanged.
///
/// **BUG THIS CATCHES**: Would catch if a `ws` URL were rejected as an unknown scheme.
#[test]
fn given_websocket_urls_when_deriving_socket_address_then_passed_through() {
    assert_eq!(
        socket_address("ws://127.0.0.1:9000/live").unwrap().as_str(),
        "ws://127.0.0.1:9000/live"
    );
    assert_eq!(
        socket_address("wss://example.com/live").unwrap().as_str(),
        "wss://example.com/live"
    );
}

/// **VALUE**: Verifies the fragment is stripped.
///
/// **WHY THIS MATTERS**: The WebSocket handshake rejects URLs with a fragment, and
/// page URLs often carry one for in-page navigation.
#[test]
fn given_page_url_with_fragment_when_deriving_socket_address_then_fragment_dropped() {
    let url = socket_address("http://localhost:3000/counter#section-2").unwrap();

    assert_eq!(url.fragment(), None);
    assert_eq!(url.as_str(), "ws://localhost:3000/counter");
}

/// **VALUE**: Verifies unusable page URLs become address errors, not panics.
///
/// **BUG THIS CATCHES**: Would catch if unknown schemes are passed on to the transport.
#[test]
fn given_unsupported_or_malformed_urls_when_deriving_socket_address_then_address_error() {
    for page_url in ["ftp://example.com/page", "file:///tmp/page.html", "not a url"] {
        let err = socket_address(page_url).expect_err(page_url);
        assert!(
            matches!(err, ConnectError::Address { .. }),
            "Expected address error for {page_url}, got {err:?}"
        );
    }
}
