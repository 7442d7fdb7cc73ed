//! Visibility-Gated Stream Subscriber
//!
//! Maintains at most one live streaming connection to an endpoint, tearing
//! it down while the consuming surface is not observably active and
//! re-establishing it when activity resumes. All state transitions run on a
//! single engine task, strictly in the order the inputs arrive, so no two
//! transitions are ever concurrent with each other.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::activity::{ActivityState, HostSignal};
use crate::error::SubscriberError;
use crate::handler::StreamHandler;
use crate::metrics::SubscriberMetrics;
use crate::transport::{Connection, Connector, TransportEvent};

const COMMAND_BUFFER: usize = 16;
const SIGNAL_BUFFER: usize = 16;

/// Externally visible connection state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Disconnected,
    Connected,
}

impl LinkStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Initial state for a subscription.
#[derive(Debug, Clone)]
pub struct SubscriberOptions {
    /// Endpoint to subscribe to. `None` means "no subscription desired"
    /// until one is supplied via `configure`.
    pub endpoint: Option<String>,
    /// Initial document visibility.
    pub visible: bool,
    /// Initial window focus.
    pub focused: bool,
}

impl Default for SubscriberOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            visible: true,
            focused: true,
        }
    }
}

enum Command<T> {
    Configure {
        endpoint: Option<String>,
        handler: Box<dyn StreamHandler<T>>,
    },
    Shutdown,
}

/// Handle to a running subscription engine.
///
/// Dropping the handle is equivalent to [`Subscriber::shutdown`] without
/// waiting for the engine to finish.
pub struct Subscriber<T> {
    commands: mpsc::Sender<Command<T>>,
    signals: mpsc::Sender<HostSignal>,
    status: watch::Receiver<LinkStatus>,
    metrics: Arc<SubscriberMetrics>,
    task: JoinHandle<()>,
}

impl<T> Subscriber<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Spawn the engine with an initial endpoint and handler.
    ///
    /// If the endpoint is set and the initial activity state is active, a
    /// connection is opened immediately.
    pub fn spawn<C, H>(connector: C, handler: H, options: SubscriberOptions) -> Self
    where
        C: Connector,
        H: StreamHandler<T> + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_BUFFER);
        let (status_tx, status_rx) = watch::channel(LinkStatus::Disconnected);
        let metrics = Arc::new(SubscriberMetrics::new());

        let engine = Engine {
            connector,
            endpoint: options.endpoint,
            connection: None,
            activity: ActivityState::new(options.visible, options.focused),
            closing: false,
            handler: Box::new(handler),
            commands: command_rx,
            signals: signal_rx,
            status: status_tx,
            metrics: metrics.clone(),
        };
        let task = tokio::spawn(engine.run());

        Self {
            commands: command_tx,
            signals: signal_tx,
            status: status_rx,
            metrics,
            task,
        }
    }

    /// Replace the endpoint and handlers.
    ///
    /// Changing the endpoint tears down any existing connection and, when
    /// the new endpoint is set and the surface is active, opens a new one.
    /// Supplying the same endpoint only swaps the handlers, leaving the
    /// connection in place; future events use the latest handlers.
    pub async fn configure<H>(
        &self,
        endpoint: Option<String>,
        handler: H,
    ) -> Result<(), SubscriberError>
    where
        H: StreamHandler<T> + 'static,
    {
        self.commands
            .send(Command::Configure {
                endpoint,
                handler: Box::new(handler),
            })
            .await
            .map_err(|_| SubscriberError::Closed)
    }

    /// Deliver a host environment signal (visibility, focus, unload).
    pub async fn notify(&self, signal: HostSignal) -> Result<(), SubscriberError> {
        self.signals
            .send(signal)
            .await
            .map_err(|_| SubscriberError::Closed)
    }

    /// Watch the connection state.
    pub fn status(&self) -> watch::Receiver<LinkStatus> {
        self.status.clone()
    }

    /// Current connection state.
    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }

    /// Counters for this subscription.
    pub fn metrics(&self) -> Arc<SubscriberMetrics> {
        self.metrics.clone()
    }

    /// Graceful shutdown: suppress further callbacks, close any connection,
    /// and wait for the engine to finish.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown).await;
        let _ = self.task.await;
    }
}

/// One multiplexed input to the engine loop.
enum Step<T> {
    Command(Option<Command<T>>),
    Signal(Option<HostSignal>),
    Transport(Option<TransportEvent>),
}

struct Engine<T, C> {
    connector: C,
    endpoint: Option<String>,
    /// Exclusively owned; at most one live connection at any instant.
    connection: Option<Connection>,
    activity: ActivityState,
    /// Once set, no new connection may be created and no callback fires.
    closing: bool,
    handler: Box<dyn StreamHandler<T>>,
    commands: mpsc::Receiver<Command<T>>,
    signals: mpsc::Receiver<HostSignal>,
    status: watch::Sender<LinkStatus>,
    metrics: Arc<SubscriberMetrics>,
}

impl<T, C> Engine<T, C>
where
    T: DeserializeOwned + Send + 'static,
    C: Connector,
{
    async fn run(mut self) {
        self.sync_connection();
        loop {
            let step = tokio::select! {
                command = self.commands.recv() => Step::Command(command),
                signal = self.signals.recv() => Step::Signal(signal),
                event = Self::next_transport(&mut self.connection) => Step::Transport(event),
            };
            match step {
                Step::Command(Some(Command::Configure { endpoint, handler })) => {
                    self.reconfigure(endpoint, handler);
                }
                Step::Command(Some(Command::Shutdown))
                | Step::Command(None)
                | Step::Signal(None) => {
                    self.begin_close();
                    break;
                }
                Step::Signal(Some(signal)) => self.apply_signal(signal),
                Step::Transport(event) => self.handle_transport(event),
            }
        }
        debug!("subscription engine stopped");
    }

    /// Pends while no connection exists, so the loop only races transport
    /// events against commands and signals when there is something to read.
    async fn next_transport(connection: &mut Option<Connection>) -> Option<TransportEvent> {
        match connection {
            Some(conn) => conn.recv().await,
            None => std::future::pending().await,
        }
    }

    fn reconfigure(&mut self, endpoint: Option<String>, handler: Box<dyn StreamHandler<T>>) {
        // The latest callbacks always win, even when the connection is kept.
        self.handler = handler;
        if self.endpoint == endpoint {
            debug!("handlers updated, endpoint unchanged");
            return;
        }
        self.disconnect("endpoint changed");
        self.endpoint = endpoint;
        self.sync_connection();
    }

    fn apply_signal(&mut self, signal: HostSignal) {
        match signal {
            HostSignal::Visibility { visible } => self.activity.set_visible(visible),
            HostSignal::Focus { focused } => self.activity.set_focused(focused),
            HostSignal::Unload => {
                info!("unload signal, closing subscription");
                self.begin_close();
                return;
            }
        }
        self.sync_connection();
    }

    /// Reconcile the connection with the desired state: connected iff an
    /// endpoint is configured, the surface is active, and no close has been
    /// requested. Redundant triggers are no-ops.
    fn sync_connection(&mut self) {
        if self.closing {
            return;
        }
        let wanted = self.endpoint.is_some() && self.activity.is_active();
        if wanted && self.connection.is_none() {
            self.connect();
        } else if !wanted && self.connection.is_some() {
            let reason = if self.endpoint.is_none() {
                "endpoint cleared"
            } else {
                "surface inactive"
            };
            self.disconnect(reason);
        }
    }

    fn connect(&mut self) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };
        let connection = self.connector.open(&endpoint);
        info!(endpoint = %endpoint, connection = %connection.id(), "stream connection opened");
        self.metrics.record_connection_opened();
        self.connection = Some(connection);
        self.status.send_replace(LinkStatus::Connected);
    }

    fn disconnect(&mut self, reason: &str) {
        if let Some(connection) = self.connection.take() {
            debug!(connection = %connection.id(), reason, "stream connection closed");
            connection.close();
            self.metrics.record_connection_closed();
            self.status.send_replace(LinkStatus::Disconnected);
        }
    }

    /// Set the closing flag before dropping the connection, so nothing
    /// observed during teardown can reach the handler.
    fn begin_close(&mut self) {
        self.closing = true;
        self.disconnect("shutdown");
    }

    fn handle_transport(&mut self, event: Option<TransportEvent>) {
        if self.closing {
            return;
        }
        match event {
            Some(TransportEvent::Message(raw)) => {
                self.metrics.record_message_received();
                match serde_json::from_str::<T>(&raw) {
                    Ok(data) => {
                        self.metrics.record_message_delivered();
                        self.handler.on_message(data);
                    }
                    Err(e) => {
                        // Malformed payloads are noise, not connection
                        // failures: no callback, no state change.
                        self.metrics.record_decode_drop();
                        debug!("dropping undecodable payload: {}", e);
                    }
                }
            }
            Some(TransportEvent::Error(err)) => {
                warn!("transport error: {}", err);
                self.metrics.record_transport_error();
                self.handler.on_error();
                // No timed retry: the subscription stays disconnected until
                // the next activity transition opens a fresh connection.
                self.disconnect("transport error");
            }
            None => {
                warn!("transport reader ended without an error event");
                self.metrics.record_transport_error();
                self.handler.on_error();
                self.disconnect("reader ended");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_status_helpers() {
        assert!(LinkStatus::Connected.is_connected());
        assert!(!LinkStatus::Disconnected.is_connected());
        assert_eq!(LinkStatus::Connected.to_string(), "connected");
        assert_eq!(LinkStatus::Disconnected.to_string(), "disconnected");
    }

    #[test]
    fn default_options_are_active_with_no_endpoint() {
        let options = SubscriberOptions::default();
        assert!(options.endpoint.is_none());
        assert!(options.visible);
        assert!(options.focused);
    }
}
