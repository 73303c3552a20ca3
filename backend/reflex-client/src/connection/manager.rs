//! The resilient connection state machine.
//!
//! # Architecture
//!
//! - [`ConnectionManager`] is a cheap `Clone` handle over shared state
//! - A connect gate (`tokio::sync::Mutex<()>`) serializes every connect attempt,
//!   whether it comes from `connect()`, `send()` or the reconnect loop
//! - Short-lived state (`std::sync::Mutex`) is never held across an `.await`
//! - One watcher task per connection epoch observes the channel and forwards
//!   messages to the registered observer in arrival order
//! - At most one reconnect loop is current; scheduling a new one, a successful
//!   open or a local close supersedes it
//! - Background tasks only hold a `Weak` reference, so dropping the last
//!   handle stops them

use crate::DEFAULT_RETRY_DELAY;
use crate::DO_NOT_RECONNECT_CLOSE_CODE;
use crate::config::ClientConfig;
use crate::connection::address::socket_address;
use crate::connection::channel::{Channel, ChannelEvent, Connector, Frame};
use crate::connection::state::{ConnectionState, Disconnect, Ending};
use crate::connection::websocket::WebSocketConnector;
use crate::error::connect::ConnectError;
use crate::proto::{InboundFrame, Payload};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use log::{debug, info, trace, warn};
use serde::Serialize;
use tokio::spawn as TokioSpawn;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::sleep as TokioSleep;
use url::Url;

type MessageObserver = Arc<dyn Fn(InboundFrame) + Send + Sync>;

/// Reconnect behaviour of a [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Fixed delay before every reconnect attempt.
    pub retry_delay: Duration,
    /// Remote close code that ends the connection for good.
    pub terminal_close_code: Option<u16>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
            terminal_close_code: Some(DO_NOT_RECONNECT_CLOSE_CODE),
        }
    }
}

impl From<&ClientConfig> for ConnectionSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            retry_delay: config.retry_delay(),
            terminal_close_code: config.terminal_close_code,
        }
    }
}

/// Owns the duplex channel to the page server and keeps it alive.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    address: Url,
    settings: ConnectionSettings,
    connector: Arc<dyn Connector>,
    connect_gate: AsyncMutex<()>,
    shared: Mutex<Shared>,
    observer: RwLock<Option<MessageObserver>>,
}

#[derive(Default)]
struct Shared {
    state: ConnectionState,
    channel: Option<ChannelHandle>,
    manual_close: bool,
    epoch: u64,
    connect_attempts: u64,
    retry_generation: u64,
    retry_task: Option<JoinHandle<()>>,
}

struct ChannelHandle {
    epoch: u64,
    outbound: UnboundedSender<Frame>,
    watcher: JoinHandle<()>,
}

impl ChannelHandle {
    fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Stop observing this channel. Dropping `outbound` lets the transport close the socket.
    fn discard(self) {
        self.watcher.abort();
    }
}

impl Inner {
    fn lock_shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let shared = self.shared.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(channel) = shared.channel.take() {
            channel.discard();
        }
        if let Some(task) = shared.retry_task.take() {
            task.abort();
        }
    }
}

impl ConnectionManager {
    /// Create a manager for `address`. Nothing is opened until `connect()` or `send()`.
    pub fn new(address: Url, settings: ConnectionSettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                address,
                settings,
                connector,
                connect_gate: AsyncMutex::new(()),
                shared: Mutex::new(Shared::default()),
                observer: RwLock::new(None),
            }),
        }
    }

    /// Create a WebSocket manager for the page at `page_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Address`] if no socket address can be derived from `page_url`.
    pub fn from_page_url(page_url: &str, config: &ClientConfig) -> Result<Self, ConnectError> {
        let address = socket_address(page_url)?;
        Ok(Self::new(
            address,
            ConnectionSettings::from(config),
            Arc::new(WebSocketConnector),
        ))
    }

    pub fn address(&self) -> &Url {
        &self.inner.address
    }

    pub fn settings(&self) -> ConnectionSettings {
        self.inner.settings
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock_shared().state
    }

    /// Epoch of the most recently opened channel (0 before the first open).
    pub fn epoch(&self) -> u64 {
        self.inner.lock_shared().epoch
    }

    /// Number of connect attempts made so far, successful or not.
    pub fn connect_attempts(&self) -> u64 {
        self.inner.lock_shared().connect_attempts
    }

    pub fn is_open(&self) -> bool {
        let shared = self.inner.lock_shared();
        shared.state == ConnectionState::Open
            && shared.channel.as_ref().is_some_and(ChannelHandle::is_open)
    }

    /// Register the callback that receives every inbound message.
    ///
    /// Replaces any previous observer. Messages arriving while no observer is
    /// registered are dropped.
    pub fn set_message_observer<F>(&self, observer: F)
    where
        F: Fn(InboundFrame) + Send + Sync + 'static,
    {
        let mut slot = self
            .inner
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(observer));
    }

    /// Open a new channel, replacing the current one.
    ///
    /// Resolves once the remote end has acknowledged the open.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Open`] if the opening handshake fails. This path
    /// never schedules a reconnect.
    pub async fn connect(&self) -> Result<(), ConnectError> {
        let _gate = self.inner.connect_gate.lock().await;
        self.open_channel().await
    }

    /// Transmit `payload`, connecting first if there is no open channel.
    ///
    /// Text and binary payloads are sent unmodified; structured payloads are
    /// serialized to JSON text.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::Serialize`] if a structured payload cannot be serialized
    /// - [`ConnectError::Open`] if the connect performed on the caller's behalf fails
    /// - [`ConnectError::Send`] if the channel went away before the frame was queued
    pub async fn send(&self, payload: impl Into<Payload>) -> Result<(), ConnectError> {
        let frame = Frame::try_from(payload.into())?;

        if !self.is_open() {
            let _gate = self.inner.connect_gate.lock().await;
            if !self.is_open() {
                debug!("No open channel to {}, connecting before send", self.inner.address);
                self.open_channel().await?;
            }
        }

        let shared = self.inner.lock_shared();
        let channel = shared
            .channel
            .as_ref()
            .ok_or_else(|| ConnectError::send("No channel available after connect"))?;

        channel.outbound.send(frame).map_err(|_| {
            ConnectError::send(format!(
                "Channel for epoch {} closed before the frame was queued",
                channel.epoch
            ))
        })
    }

    /// Serialize `value` to JSON and send it.
    pub async fn send_json<T: Serialize>(&self, value: &T) -> Result<(), ConnectError> {
        self.send(Payload::structured(value)?).await
    }

    /// Close the channel on request of the local side.
    ///
    /// The resulting close event does not trigger a reconnect, and a reconnect
    /// loop waiting for its next attempt stops. An attempt already in flight is
    /// not cancelled. A later `connect()` or `send()` starts over.
    pub fn close(&self, code: Option<u16>, reason: Option<&str>) {
        let mut shared = self.inner.lock_shared();
        shared.manual_close = true;
        shared.retry_generation += 1;

        let requested = match shared.channel.as_ref() {
            Some(channel) => channel
                .outbound
                .send(Frame::Close {
                    code,
                    reason: reason.map(str::to_string),
                })
                .is_ok(),
            None => false,
        };

        shared.state = if requested {
            ConnectionState::Closing
        } else {
            ConnectionState::Closed
        };

        info!(
            "Local close requested for {} (code {:?}, state {})",
            self.inner.address, code, shared.state
        );
    }

    /// Discard any current channel and open a new one. Caller must hold the connect gate.
    async fn open_channel(&self) -> Result<(), ConnectError> {
        let attempt = {
            let mut shared = self.inner.lock_shared();
            if let Some(previous) = shared.channel.take() {
                debug!("Discarding channel from epoch {}", previous.epoch);
                previous.discard();
            }
            shared.state = ConnectionState::Connecting;
            shared.connect_attempts += 1;
            shared.connect_attempts
        };

        info!("Connecting to {} (attempt {attempt})", self.inner.address);

        let Channel { outbound, inbound } =
            match self.inner.connector.open(&self.inner.address).await {
                Ok(channel) => channel,
                Err(e) => {
                    self.inner.lock_shared().state = ConnectionState::Disconnected;
                    warn!("Failed to open channel to {}: {e}", self.inner.address);
                    return Err(e);
                }
            };

        let mut shared = self.inner.lock_shared();
        shared.epoch += 1;
        shared.manual_close = false;
        shared.retry_generation += 1;
        shared.state = ConnectionState::Open;

        let epoch = shared.epoch;
        let watcher = TokioSpawn(watch(Arc::downgrade(&self.inner), epoch, inbound));
        shared.channel = Some(ChannelHandle {
            epoch,
            outbound,
            watcher,
        });
        drop(shared);

        info!("Connected to {} (epoch {epoch})", self.inner.address);
        Ok(())
    }

    fn deliver(&self, frame: InboundFrame) {
        let observer = self
            .inner
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match observer {
            Some(observer) => observer(frame),
            None => debug!(
                "No message observer registered, dropping message from epoch {}",
                frame.epoch
            ),
        }
    }

    fn on_channel_end(&self, epoch: u64, ending: Ending) {
        let mut shared = self.inner.lock_shared();

        if shared.channel.as_ref().map(|channel| channel.epoch) != Some(epoch) {
            debug!("Ignoring end of stale channel from epoch {epoch}");
            return;
        }
        // Detach rather than abort: this runs on the watcher task itself.
        drop(shared.channel.take());

        let disconnect = Disconnect::classify(
            ending,
            shared.manual_close,
            self.inner.settings.terminal_close_code,
        );

        if disconnect.is_terminal() {
            shared.state = ConnectionState::Closed;
            info!(
                "Connection to {} ended (epoch {epoch}): {disconnect}",
                self.inner.address
            );
            return;
        }

        shared.state = ConnectionState::Disconnected;
        warn!(
            "Connection to {} lost (epoch {epoch}): {disconnect}",
            self.inner.address
        );
        self.schedule_retry(&mut shared);
    }

    fn schedule_retry(&self, shared: &mut Shared) {
        shared.retry_generation += 1;
        let generation = shared.retry_generation;
        let delay = self.inner.settings.retry_delay;

        info!("Reconnecting to {} in {delay:?}", self.inner.address);

        let task = TokioSpawn(retry_loop(Arc::downgrade(&self.inner), generation, delay));
        // A superseded loop notices on its next wake-up and exits on its own.
        drop(shared.retry_task.replace(task));
    }

    fn retry_is_current(&self, generation: u64) -> bool {
        self.inner.lock_shared().retry_generation == generation
    }
}

/// Observe one channel epoch until it ends.
async fn watch(inner: Weak<Inner>, epoch: u64, mut inbound: UnboundedReceiver<ChannelEvent>) {
    while let Some(event) = inbound.recv().await {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let manager = ConnectionManager { inner };

        match event {
            ChannelEvent::Message(payload) => {
                trace!("Message received on epoch {epoch}");
                manager.deliver(InboundFrame { epoch, payload });
            }
            ChannelEvent::Error(message) => {
                manager.on_channel_end(epoch, Ending::Error(message));
                return;
            }
            ChannelEvent::Closed { code, reason } => {
                manager.on_channel_end(epoch, Ending::Closed { code, reason });
                return;
            }
        }
    }

    if let Some(inner) = inner.upgrade() {
        ConnectionManager { inner }.on_channel_end(
            epoch,
            Ending::Closed {
                code: None,
                reason: String::from("transport went away without a close frame"),
            },
        );
    }
}

/// Reconnect on a fixed delay until an attempt succeeds or the loop is superseded.
async fn retry_loop(inner: Weak<Inner>, generation: u64, delay: Duration) {
    let mut schedule = Constant::new(delay);
    let mut attempt: u64 = 0;

    while let Some(wait) = schedule.next_backoff() {
        TokioSleep(wait).await;

        let Some(inner) = inner.upgrade() else {
            return;
        };
        let manager = ConnectionManager { inner };
        let _gate = manager.inner.connect_gate.lock().await;

        if !manager.retry_is_current(generation) {
            debug!("Reconnect loop {generation} superseded, stopping");
            return;
        }
        if manager.is_open() {
            return;
        }

        attempt += 1;
        match manager.open_channel().await {
            Ok(()) => {
                info!("Reconnected to {} after {attempt} attempt(s)", manager.inner.address);
                return;
            }
            Err(e) => warn!("Reconnect attempt {attempt} failed, retrying in {delay:?}: {e}"),
        }
    }
}
