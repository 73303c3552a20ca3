use crate::error::connect::ConnectError;

use url::Url;

const WS_SCHEME: &str = "ws";
const WSS_SCHEME: &str = "wss";

/// Derive the WebSocket address from the address of the page being driven.
///
/// `http` becomes `ws` and `https` becomes `wss`; host, port, path and query
/// are kept. `ws`/`wss` addresses pass through. The fragment is dropped since
/// WebSocket URLs cannot carry one.
///
/// # Errors
///
/// Returns [`ConnectError::Address`] if the URL does not parse or uses any other scheme.
pub fn socket_address(page_url: &str) -> Result<Url, ConnectError> {
    let mut url = Url::parse(page_url)?;

    let scheme = match url.scheme() {
        "http" | WS_SCHEME => WS_SCHEME,
        "https" | WSS_SCHEME => WSS_SCHEME,
        other => {
            return Err(ConnectError::address(format!(
                "Unsupported scheme '{other}' in page URL {page_url}"
            )));
        }
    };

    if url.scheme() != scheme {
        url.set_scheme(scheme).map_err(|()| {
            ConnectError::address(format!("Cannot switch {page_url} to scheme {scheme}"))
        })?;
    }
    url.set_fragment(None);

    Ok(url)
}
