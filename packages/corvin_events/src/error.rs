//! Subscriber Errors

use thiserror::Error;

/// Errors surfaced by the subscription handle.
///
/// Transport-level failures never appear here: they are reported through the
/// handler's `on_error` callback and the subscription stays eligible to
/// reconnect.
#[derive(Debug, Error)]
pub enum SubscriberError {
    /// The engine has shut down; the handle can no longer reach it.
    #[error("subscription is closed")]
    Closed,
}
