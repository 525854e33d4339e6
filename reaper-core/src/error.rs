//! Error types for the reactive runtime.

use std::any::Any;

use crate::graph::SubscriberId;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReactiveError>;

/// Errors raised while propagating a write or running a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReactiveError {
    /// A subscriber run would have pushed the context stack past the
    /// configured `max_depth`. Usually a reaction that writes a signal it
    /// also reads.
    #[error("reactive recursion limit exceeded: depth {depth} > limit {limit}")]
    RecursionLimit { depth: usize, limit: usize },

    /// A subscriber body (or one of its cleanups) panicked.
    #[error("subscriber {subscriber:?} panicked: {message}")]
    SubscriberPanicked {
        subscriber: SubscriberId,
        message: String,
    },

    /// The subscriber was retired from the graph; its id is stale.
    #[error("subscriber {0:?} has been retired")]
    StaleSubscriber(SubscriberId),

    /// The runtime configuration failed to parse or validate.
    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(String),
}

impl ReactiveError {
    /// Convert a panic payload caught while running `subscriber`.
    ///
    /// A payload that already is a `ReactiveError` (raised by a nested write
    /// under `FailurePolicy::Propagate`) is recovered as-is.
    pub(crate) fn from_panic(subscriber: SubscriberId, payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<ReactiveError>() {
            Ok(err) => return *err,
            Err(payload) => payload,
        };

        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        ReactiveError::SubscriberPanicked {
            subscriber,
            message,
        }
    }
}
