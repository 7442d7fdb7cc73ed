//! Transport Capability
//!
//! The streaming primitive behind a subscription, abstracted so the state
//! machine is independent of the concrete transport (SSE today; long-polling
//! or a platform stream API would slot in behind the same trait).

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub mod sse;

/// Transport-level failure, distinct from a payload decode failure.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request never reached the endpoint.
    #[error("connect failed: {reason}")]
    Connect { reason: String },
    /// The endpoint answered with a non-success status.
    #[error("endpoint returned status {status}")]
    Status { status: u16 },
    /// The body stream failed mid-flight.
    #[error("stream read failed: {reason}")]
    Read { reason: String },
    /// The server ended the stream.
    #[error("stream closed by server")]
    Closed,
}

/// Event delivered by a live connection's reader.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// One complete, UTF-8 decoded data payload.
    Message(String),
    /// The connection failed. No further events follow on this connection.
    Error(TransportError),
}

/// A live connection, exclusively owned by the subscription that opened it.
///
/// Consuming the handle closes the transport and detaches the event stream
/// in the same step, so no event from a closed connection is delivered
/// afterwards. Closing is synchronous and immediate from the caller's point
/// of view; the reader task observes the cancellation and winds down on its
/// own.
pub struct Connection {
    id: String,
    events: mpsc::Receiver<TransportEvent>,
    cancel: CancellationToken,
}

impl Connection {
    /// Wrap a reader task's event channel and cancellation token.
    pub fn new(
        id: String,
        events: mpsc::Receiver<TransportEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self { id, events, cancel }
    }

    /// Correlation id for logs.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Next transport event. `None` means the reader ended without an
    /// explicit error event.
    pub(crate) async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    /// Close the transport.
    pub fn close(self) {
        self.cancel.cancel();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Opens connections to a streaming endpoint.
///
/// `open` must not block and must not fail synchronously: implementations
/// spawn their I/O and report connect failures through the returned
/// connection's event stream.
pub trait Connector: Send + 'static {
    fn open(&self, endpoint: &str) -> Connection;
}
