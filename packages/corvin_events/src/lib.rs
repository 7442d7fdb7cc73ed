//! Corvin Event-Stream Client
//!
//! Client-side subscription engine for the Corvin server's task event
//! streams. A [`Subscriber`] maintains at most one live connection to a
//! streaming endpoint, tears it down while the consuming surface is not
//! observably active (hidden or unfocused), and re-establishes it when
//! activity resumes. Decoded events are delivered to a caller-supplied
//! [`StreamHandler`] in receipt order.
//!
//! The transport behind a subscription is an injected [`Connector`]
//! capability; [`SseConnector`] is the server-sent-events implementation
//! used against a real Corvin server.

pub mod activity;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod protocol;
pub mod subscriber;
pub mod transport;

pub use activity::{ActivityState, HostSignal};
pub use error::SubscriberError;
pub use handler::{FnHandler, StreamHandler};
pub use metrics::{MetricsSnapshot, SubscriberMetrics};
pub use protocol::{TaskEvent, TaskStatus};
pub use subscriber::{LinkStatus, Subscriber, SubscriberOptions};
pub use transport::sse::{SseConnector, SseFrameDecoder};
pub use transport::{Connection, Connector, TransportError, TransportEvent};
