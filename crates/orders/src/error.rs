//! The error taxonomy of the order workflow.

use thiserror::Error;

use till_core::OrderStatus;

use crate::db::StoreError;
use crate::events::{OrderEvent, SubscriberError};
use crate::snapshot::SnapshotError;
use crate::validate::ValidationReport;

/// Errors surfaced by the order service.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The payload failed validation; the report carries every field error so
    /// the caller can re-render the whole form at once.
    #[error("order validation failed")]
    Validation(ValidationReport),

    /// The order does not exist, or is not owned by the caller. One uniform
    /// message for both conditions so another user's order is never revealed
    /// to exist.
    #[error("The order does not exist.")]
    NotFound,

    /// The stored cart snapshot could not be decoded. Fatal for that read,
    /// never retried.
    #[error(transparent)]
    SnapshotCorrupt(#[from] SnapshotError),

    /// A uniqueness collision that survived the internal retry.
    #[error("persistence conflict: {0}")]
    Conflict(String),

    /// Any other storage failure.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// A subscriber rejected `Order.beforeCreateOrder`, vetoing creation.
    #[error(transparent)]
    Subscriber(#[from] SubscriberError),

    /// An event payload could not be serialized or a subscriber left it in a
    /// shape that no longer deserializes.
    #[error("event payload for {event} could not be converted: {source}")]
    Payload {
        event: OrderEvent,
        #[source]
        source: serde_json::Error,
    },

    /// A status change that would move the order backwards.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_is_uniform() {
        assert_eq!(OrderError::NotFound.to_string(), "The order does not exist.");
    }

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err = OrderError::from(StoreError::NotFound);
        assert!(matches!(err, OrderError::NotFound));

        let err = OrderError::from(StoreError::Conflict("invoice".to_owned()));
        assert!(matches!(err, OrderError::Store(StoreError::Conflict(_))));
    }
}
