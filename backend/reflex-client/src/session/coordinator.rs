use crate::config::ClientConfig;
use crate::connection::ConnectionManager;
use crate::error::session::SessionError;
use crate::event::{RawEvent, encode};
use crate::proto::{IdentityMessage, InboundFrame, OutboundEvent, Payload};
use crate::session::page::Page;
use crate::session::state::SessionState;

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use serde_json::Value;

/// What handling one inbound message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Identity message: the session is now bound to this element.
    Bound { element_id: String },
    /// Update applied to the bound element.
    Applied { element_id: String },
    /// Update dropped because the page has no element with the bound id.
    Dropped { element_id: String },
}

/// One client session: a connection plus the page it drives.
pub struct Session<P: Page> {
    connection: ConnectionManager,
    state: Arc<Mutex<SessionState>>,
    page: Arc<P>,
}

impl<P: Page> Session<P> {
    /// Create a session for the page at `page_url`, talking WebSocket.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connect`] if no socket address can be derived from `page_url`.
    pub fn new(page_url: &str, config: &ClientConfig, page: P) -> Result<Self, SessionError> {
        let connection = ConnectionManager::from_page_url(page_url, config)?;
        Ok(Self::with_connection(connection, Arc::new(page)))
    }

    /// Create a session over an existing connection manager.
    ///
    /// The session registers itself as the manager's message observer right
    /// away, so messages on a channel opened implicitly by `event()` are not lost.
    pub fn with_connection(connection: ConnectionManager, page: Arc<P>) -> Self {
        let session = Self {
            connection,
            state: Arc::new(Mutex::new(SessionState::default())),
            page,
        };
        session.install_observer();
        session
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn page(&self) -> &Arc<P> {
        &self.page
    }

    pub fn state(&self) -> SessionState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn bound_element_id(&self) -> Option<String> {
        self.state().bound_element_id
    }

    /// Open the connection.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connect`] if the opening handshake fails.
    pub async fn connect(&self) -> Result<(), SessionError> {
        self.connection.connect().await?;
        self.install_observer();
        Ok(())
    }

    /// Forward one UI interaction to the server as `name`, with optional arguments.
    ///
    /// Reconnects first if the connection is not open.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connect`] if the event cannot be serialized,
    /// the implicit connect fails, or the channel is gone.
    pub async fn event<E: RawEvent + ?Sized>(
        &self,
        raw: &E,
        name: &str,
        args: Option<Value>,
    ) -> Result<(), SessionError> {
        let outbound = OutboundEvent {
            name: name.to_string(),
            event: encode(raw),
            args,
        };

        debug!("Sending event '{name}'");
        self.connection.send(Payload::structured(&outbound)?).await?;
        Ok(())
    }

    /// Apply one inbound message.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Identity`] if the first message of an epoch is not `{"elementID": string}`
    /// - [`SessionError::Update`] if an update is not UTF-8 text
    pub fn on_message(&self, frame: &InboundFrame) -> Result<MessageOutcome, SessionError> {
        apply_message(&self.state, self.page.as_ref(), frame)
    }

    /// Close the connection locally; no reconnect follows.
    pub fn close(&self, code: Option<u16>, reason: Option<&str>) {
        self.connection.close(code, reason);
    }

    fn install_observer(&self) {
        let state = Arc::clone(&self.state);
        let page = Arc::clone(&self.page);

        self.connection.set_message_observer(move |frame| {
            if let Err(e) = apply_message(&state, page.as_ref(), &frame) {
                warn!("Dropping message from epoch {}: {e}", frame.epoch);
            }
        });
    }
}

fn apply_message<P: Page + ?Sized>(
    state: &Mutex<SessionState>,
    page: &P,
    frame: &InboundFrame,
) -> Result<MessageOutcome, SessionError> {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);

    if state.expects_identity(frame.epoch) {
        let identity = parse_identity(&frame.payload)?;
        info!(
            "Session bound to element '{}' (epoch {})",
            identity.element_id, frame.epoch
        );
        state.bind(frame.epoch, identity.element_id.clone());
        return Ok(MessageOutcome::Bound {
            element_id: identity.element_id,
        });
    }

    let element_id = state
        .bound_element_id
        .clone()
        .ok_or_else(|| SessionError::update("Update received before any identity message"))?;
    drop(state);

    let markup = frame
        .payload
        .as_text()
        .ok_or_else(|| SessionError::update("Update payload is not valid UTF-8"))?;

    match page.element_by_id(&element_id) {
        Some(element) => {
            page.set_content(&element, &markup);
            debug!("Replaced content of '{element_id}' ({} bytes)", markup.len());
            Ok(MessageOutcome::Applied { element_id })
        }
        None => {
            debug!("Element '{element_id}' not on page, dropping update");
            Ok(MessageOutcome::Dropped { element_id })
        }
    }
}

fn parse_identity(payload: &Payload) -> Result<IdentityMessage, SessionError> {
    let parsed = match payload {
        Payload::Text(text) => serde_json::from_str::<IdentityMessage>(text),
        Payload::Binary(bytes) => serde_json::from_slice::<IdentityMessage>(bytes),
        Payload::Structured(value) => serde_json::from_value::<IdentityMessage>(value.clone()),
    };

    let identity = parsed.map_err(|e| {
        SessionError::identity(format!("Expected {{\"elementID\": string}}: {e}"))
    })?;

    if identity.element_id.is_empty() {
        return Err(SessionError::identity("elementID is empty"));
    }

    Ok(identity)
}
