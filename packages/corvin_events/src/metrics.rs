//! Subscription Metrics
//!
//! Runtime counters for monitoring a subscription's connection churn and
//! message flow. Read-only observability; no behavior depends on them.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-subscription counters.
#[derive(Debug, Default)]
pub struct SubscriberMetrics {
    /// Connections opened over the subscription's lifetime
    pub connections_opened: AtomicU64,
    /// Connections closed (teardown or error)
    pub connections_closed: AtomicU64,
    /// Raw payloads received from the transport
    pub messages_received: AtomicU64,
    /// Payloads decoded and delivered to the handler
    pub messages_delivered: AtomicU64,
    /// Payloads dropped because they failed to decode
    pub decode_drops: AtomicU64,
    /// Transport-level errors
    pub transport_errors: AtomicU64,
}

impl SubscriberMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_delivered(&self) {
        self.messages_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_drop(&self) {
        self.decode_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            decode_drops: self.decode_drops.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of subscription counters (for serialization/logging).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub messages_received: u64,
    pub messages_delivered: u64,
    pub decode_drops: u64,
    pub transport_errors: u64,
}
