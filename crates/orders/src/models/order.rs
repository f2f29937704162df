//! Order domain types.
//!
//! [`OrderRecord`] is the persisted row shape (snapshot still encoded);
//! [`Order`] is the domain shape handed to callers (snapshot decoded,
//! identifiers assigned). The service layer converts between the two so the
//! raw blob never leaks out.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use till_core::{AddressId, CartId, OrderId, OrderItemId, OrderStatus, PaymentStatus, UserId};

use super::address::{AddressFields, OrderAddress};

/// The payload submitted to create an order from a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub cart_id: Option<CartId>,
    /// Payment processor handling this order (e.g. "stripe").
    pub processor: String,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub total: Decimal,
    /// Defaulted from configuration at creation when absent.
    #[serde(default)]
    pub currency: Option<String>,
    /// The full cart state to freeze onto the order.
    pub cart_snapshot: Value,
    #[serde(default)]
    pub items: Vec<OrderItemDraft>,
    pub billing_address: AddressFields,
    #[serde(default)]
    pub shipping_address: Option<AddressFields>,
    /// When set, the shipping address aliases the billing address and any
    /// submitted shipping fields are ignored.
    #[serde(default)]
    pub shipping_same_as_billing: bool,
}

/// A line item captured alongside the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemDraft {
    pub name: String,
    pub sku: String,
    pub quantity: i32,
    pub price: Decimal,
}

/// A persisted line item. Append-only: created with the order, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub name: String,
    pub sku: String,
    pub quantity: i32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// An order row ready for first persistence (identifiers not yet assigned).
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub cart_id: Option<CartId>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub processor: String,
    pub total: Decimal,
    pub currency: Option<String>,
    /// The encoded snapshot blob.
    pub cart_snapshot: String,
    pub billing_address_id: AddressId,
    pub shipping_address_id: AddressId,
    pub items: Vec<OrderItemDraft>,
}

/// Identifiers assigned in the post-persist write.
#[derive(Debug, Clone)]
pub struct OrderIdentifiers {
    pub order_number: String,
    pub invoice_number: String,
    pub currency: String,
}

/// Fields an existing order may be updated with.
///
/// Identity fields (order number, invoice number, cart snapshot, addresses)
/// are deliberately not representable here.
#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub total: Option<Decimal>,
    pub currency: Option<String>,
}

/// The persisted shape of an order row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub cart_id: Option<CartId>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub processor: String,
    pub total: Decimal,
    pub currency: Option<String>,
    pub order_number: Option<String>,
    pub invoice_number: Option<String>,
    /// The encoded snapshot blob as stored.
    pub cart_snapshot: String,
    pub billing_address_id: AddressId,
    pub shipping_address_id: AddressId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order as handed to callers: identifiers assigned, snapshot decoded.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub cart_id: Option<CartId>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub processor: String,
    pub total: Decimal,
    pub currency: String,
    pub order_number: String,
    pub invoice_number: String,
    /// The decoded cart state frozen at checkout.
    pub cart_snapshot: Value,
    pub billing_address_id: AddressId,
    pub shipping_address_id: AddressId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order with its owned items and address rows, for the read APIs.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub billing_address: Option<OrderAddress>,
    pub shipping_address: Option<OrderAddress>,
}

/// Field-by-field diff between two stored states of the same order.
///
/// Only business fields participate; `updated_at` churn alone never counts as
/// a change.
#[must_use]
pub fn changed_fields(before: &OrderRecord, after: &OrderRecord) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if before.status != after.status {
        changed.push("status");
    }
    if before.payment_status != after.payment_status {
        changed.push("payment_status");
    }
    if before.processor != after.processor {
        changed.push("processor");
    }
    if before.total != after.total {
        changed.push("total");
    }
    if before.currency != after.currency {
        changed.push("currency");
    }
    if before.order_number != after.order_number {
        changed.push("order_number");
    }
    if before.invoice_number != after.invoice_number {
        changed.push("invoice_number");
    }
    if before.cart_snapshot != after.cart_snapshot {
        changed.push("cart_snapshot");
    }
    if before.billing_address_id != after.billing_address_id {
        changed.push("billing_address_id");
    }
    if before.shipping_address_id != after.shipping_address_id {
        changed.push("shipping_address_id");
    }
    changed
}
