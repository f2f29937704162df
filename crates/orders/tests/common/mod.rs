//! Shared fixtures for the integration tests.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use till_orders::models::{AddressFields, OrderDraft, OrderItemDraft};
use till_orders::{MemoryOrderStore, OrderEventBus, OrderService, OrdersConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// A service over a fresh in-memory store, returned alongside the store so
/// tests can assert on row counts.
pub fn service_with(bus: OrderEventBus) -> (OrderService, Arc<MemoryOrderStore>) {
    init_tracing();
    let store = Arc::new(MemoryOrderStore::new());
    let service = OrderService::new(store.clone(), bus, OrdersConfig::default());
    (service, store)
}

pub fn service() -> (OrderService, Arc<MemoryOrderStore>) {
    service_with(OrderEventBus::new())
}

pub fn billing_address() -> AddressFields {
    AddressFields {
        first_name: "Jane".to_owned(),
        last_name: "Doe".to_owned(),
        street: "1 Main St".to_owned(),
        city: "Springfield".to_owned(),
        zip: "12345".to_owned(),
        country: "US".to_owned(),
    }
}

/// A complete, valid draft: one line item, shipping aliased to billing, no
/// explicit currency.
pub fn draft() -> OrderDraft {
    OrderDraft {
        user_id: None,
        cart_id: None,
        processor: "stripe".to_owned(),
        payment_status: till_core::PaymentStatus::Pending,
        total: Decimal::new(4999, 2),
        currency: None,
        cart_snapshot: json!({
            "items": [{ "sku": "A1", "qty": 2, "price": "19.99" }],
            "requires_shipping": true,
        }),
        items: vec![OrderItemDraft {
            name: "Widget".to_owned(),
            sku: "A1".to_owned(),
            quantity: 2,
            price: Decimal::new(1999, 2),
        }],
        billing_address: billing_address(),
        shipping_address: None,
        shipping_same_as_billing: true,
    }
}
