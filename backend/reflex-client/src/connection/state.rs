use std::fmt::{Display, Formatter, Result as FormatResult};

/// Phase of the connection state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    /// A local close was requested and the close handshake is in progress.
    Closing,
    /// Closed for good: locally, or by the server with the terminal close code.
    Closed,
}

impl Display for ConnectionState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        formatter.write_str(name)
    }
}

/// How an established channel ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disconnect {
    /// The transport reported an error after the channel was open.
    TransportError(String),
    /// The remote end closed without being asked to.
    UnexpectedClose { code: Option<u16>, reason: String },
    /// The close followed a local `close()` request.
    LocalClose { code: Option<u16> },
    /// The server closed with the code reserved for "do not reconnect".
    TerminalClose { code: u16, reason: String },
}

impl Disconnect {
    /// Whether the manager should stay down instead of reconnecting.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Disconnect::LocalClose { .. } | Disconnect::TerminalClose { .. }
        )
    }

    pub(crate) fn classify(
        ending: Ending,
        manual_close: bool,
        terminal_close_code: Option<u16>,
    ) -> Self {
        match ending {
            _ if manual_close => Disconnect::LocalClose {
                code: ending.code(),
            },
            Ending::Error(message) => Disconnect::TransportError(message),
            Ending::Closed {
                code: Some(code),
                reason,
            } if Some(code) == terminal_close_code => Disconnect::TerminalClose { code, reason },
            Ending::Closed { code, reason } => Disconnect::UnexpectedClose { code, reason },
        }
    }
}

impl Display for Disconnect {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            Disconnect::TransportError(message) => write!(formatter, "transport error: {message}"),
            Disconnect::UnexpectedClose { code, reason } => {
                write!(formatter, "unexpected close (code {code:?}, reason '{reason}')")
            }
            Disconnect::LocalClose { code } => write!(formatter, "local close (code {code:?})"),
            Disconnect::TerminalClose { code, reason } => {
                write!(formatter, "terminal close (code {code}, reason '{reason}')")
            }
        }
    }
}

/// Raw end-of-channel signal before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Ending {
    Error(String),
    Closed { code: Option<u16>, reason: String },
}

impl Ending {
    fn code(&self) -> Option<u16> {
        match self {
            Ending::Error(_) => None,
            Ending::Closed { code, .. } => *code,
        }
    }
}
