//! Lifecycle event bus for order workflow extension points.
//!
//! A synchronous, in-process publish/subscribe registry keyed by event name.
//! Subscribers run in registration order, may mutate the JSON payload, and may
//! stop the event with an optional result. A stopped event short-circuits the
//! remaining subscribers and hands the result back to the publisher; the
//! invoice number generator uses this to let a subscriber supply its own
//! number. There is no queuing and no cross-process delivery.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

/// Named lifecycle events of the order workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderEvent {
    /// Fired before the order row is persisted; subscribers may mutate the
    /// draft or veto creation by returning an error.
    BeforeCreateOrder,
    /// Fired before the default invoice number algorithm runs; a subscriber
    /// stopping the event with a string result overrides the number.
    CreateInvoiceNumber,
    /// Fired once after an order has been fully created.
    Created,
    /// Fired after an update changed at least one order field.
    Changed,
}

impl std::fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BeforeCreateOrder => write!(f, "Order.beforeCreateOrder"),
            Self::CreateInvoiceNumber => write!(f, "Order.createInvoiceNumber"),
            Self::Created => write!(f, "Order.created"),
            Self::Changed => write!(f, "Order.changed"),
        }
    }
}

/// What a subscriber asks the bus to do after it ran.
#[derive(Debug)]
pub enum HandlerFlow {
    /// Run the remaining subscribers.
    Continue,
    /// Skip the remaining subscribers and return the attached result to the
    /// publisher.
    Stop(Option<Value>),
}

/// Error type subscribers may fail with.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by subscribers.
pub type HandlerResult = Result<HandlerFlow, HandlerError>;

type Handler = Box<dyn Fn(&mut Value) -> HandlerResult + Send + Sync>;

/// A subscriber failed while handling an event.
///
/// The publisher decides policy: failures during `Order.beforeCreateOrder`
/// veto creation, failures during notification events are logged and ignored.
#[derive(Debug, Error)]
#[error("subscriber failed during {event}: {source}")]
pub struct SubscriberError {
    pub event: OrderEvent,
    #[source]
    pub source: HandlerError,
}

/// Outcome of publishing an event.
#[derive(Debug, Default)]
pub struct EventOutcome {
    /// Whether a subscriber stopped the event.
    pub stopped: bool,
    /// The result attached by the stopping subscriber, if any.
    pub result: Option<Value>,
}

/// In-process registry of lifecycle event subscribers.
#[derive(Default)]
pub struct OrderEventBus {
    handlers: HashMap<OrderEvent, Vec<Handler>>,
}

impl OrderEventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for `event`.
    ///
    /// Subscribers for a given event run in registration order.
    pub fn subscribe<F>(&mut self, event: OrderEvent, handler: F)
    where
        F: Fn(&mut Value) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers
            .entry(event)
            .or_default()
            .push(Box::new(handler));
    }

    /// Publish `event`, running its subscribers in order against `payload`.
    ///
    /// # Errors
    ///
    /// Returns the first subscriber failure; subscribers registered after the
    /// failing one do not run.
    pub fn publish(
        &self,
        event: OrderEvent,
        payload: &mut Value,
    ) -> Result<EventOutcome, SubscriberError> {
        let Some(handlers) = self.handlers.get(&event) else {
            return Ok(EventOutcome::default());
        };

        for handler in handlers {
            match handler(payload) {
                Ok(HandlerFlow::Continue) => {}
                Ok(HandlerFlow::Stop(result)) => {
                    return Ok(EventOutcome {
                        stopped: true,
                        result,
                    });
                }
                Err(source) => return Err(SubscriberError { event, source }),
            }
        }

        Ok(EventOutcome::default())
    }
}

impl std::fmt::Debug for OrderEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<String, usize> = self
            .handlers
            .iter()
            .map(|(event, handlers)| (event.to_string(), handlers.len()))
            .collect();
        f.debug_struct("OrderEventBus")
            .field("subscribers", &counts)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use serde_json::json;

    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_a_noop() {
        let bus = OrderEventBus::new();
        let mut payload = json!({});
        let outcome = bus.publish(OrderEvent::Created, &mut payload).unwrap();
        assert!(!outcome.stopped);
        assert!(outcome.result.is_none());
    }

    #[test]
    fn test_subscribers_run_in_registration_order() {
        let mut bus = OrderEventBus::new();
        bus.subscribe(OrderEvent::Created, |payload| {
            payload["trace"]
                .as_array_mut()
                .unwrap()
                .push(json!("first"));
            Ok(HandlerFlow::Continue)
        });
        bus.subscribe(OrderEvent::Created, |payload| {
            payload["trace"]
                .as_array_mut()
                .unwrap()
                .push(json!("second"));
            Ok(HandlerFlow::Continue)
        });

        let mut payload = json!({ "trace": [] });
        bus.publish(OrderEvent::Created, &mut payload).unwrap();
        assert_eq!(payload["trace"], json!(["first", "second"]));
    }

    #[test]
    fn test_stop_short_circuits_and_returns_result() {
        let ran_after_stop = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran_after_stop);

        let mut bus = OrderEventBus::new();
        bus.subscribe(OrderEvent::CreateInvoiceNumber, |_| {
            Ok(HandlerFlow::Stop(Some(json!("INV-42"))))
        });
        bus.subscribe(OrderEvent::CreateInvoiceNumber, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(HandlerFlow::Continue)
        });

        let mut payload = json!({});
        let outcome = bus
            .publish(OrderEvent::CreateInvoiceNumber, &mut payload)
            .unwrap();
        assert!(outcome.stopped);
        assert_eq!(outcome.result, Some(json!("INV-42")));
        assert_eq!(ran_after_stop.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscriber_error_is_returned_with_event_name() {
        let mut bus = OrderEventBus::new();
        bus.subscribe(OrderEvent::BeforeCreateOrder, |_| Err("out of stock".into()));

        let mut payload = json!({});
        let err = bus
            .publish(OrderEvent::BeforeCreateOrder, &mut payload)
            .unwrap_err();
        assert_eq!(err.event, OrderEvent::BeforeCreateOrder);
        assert!(err.to_string().contains("Order.beforeCreateOrder"));
    }

    #[test]
    fn test_event_names_match_wire_format() {
        assert_eq!(
            OrderEvent::BeforeCreateOrder.to_string(),
            "Order.beforeCreateOrder"
        );
        assert_eq!(
            OrderEvent::CreateInvoiceNumber.to_string(),
            "Order.createInvoiceNumber"
        );
        assert_eq!(OrderEvent::Created.to_string(), "Order.created");
        assert_eq!(OrderEvent::Changed.to_string(), "Order.changed");
    }
}
