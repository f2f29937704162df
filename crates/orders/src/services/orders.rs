//! The order creation and lifecycle workflow.
//!
//! [`OrderService`] is the single entry point for turning a cart into an
//! order and for mutating orders afterwards. It owns the full creation
//! pipeline: validation, address resolution, the `Order.beforeCreateOrder`
//! extension point, snapshot encoding, the initial insert and the follow-up
//! identifier write. Read APIs return orders with the snapshot decoded and
//! the owned rows attached.

use std::sync::Arc;

use serde_json::{Value, json};

use till_core::{AddressKind, OrderId, OrderStatus, UserId};

use crate::config::OrdersConfig;
use crate::db::{OrderStore, StoreError};
use crate::error::OrderError;
use crate::events::{OrderEvent, OrderEventBus};
use crate::models::{
    NewOrder, Order, OrderChanges, OrderDraft, OrderIdentifiers, OrderRecord, OrderView,
    changed_fields,
};
use crate::services::address::AddressDeduplicator;
use crate::services::invoice::InvoiceNumberGenerator;
use crate::snapshot::{CartSnapshotCodec, SnapshotField};
use crate::validate::OrderValidator;

/// Orchestrates order creation, updates and reads.
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    bus: OrderEventBus,
    config: OrdersConfig,
    codec: CartSnapshotCodec,
    validator: OrderValidator,
    addresses: AddressDeduplicator,
    invoices: InvoiceNumberGenerator,
}

impl OrderService {
    /// Build a service on top of a store and a subscriber registry.
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>, bus: OrderEventBus, config: OrdersConfig) -> Self {
        Self {
            store,
            bus,
            config,
            codec: CartSnapshotCodec,
            validator: OrderValidator,
            addresses: AddressDeduplicator::new(),
            invoices: InvoiceNumberGenerator,
        }
    }

    /// Create an order from a cart draft.
    ///
    /// The pipeline: validate everything up front, resolve both addresses to
    /// deduplicated rows, give `Order.beforeCreateOrder` subscribers a chance
    /// to adjust or veto the draft, freeze the cart snapshot, insert the row
    /// with its items, then assign order and invoice numbers in a second
    /// write. `Order.created` failures are logged and ignored; the order
    /// already exists at that point.
    ///
    /// # Errors
    ///
    /// - `OrderError::Validation` with the full field report
    /// - `OrderError::Subscriber` when a subscriber vetoes; nothing is
    ///   persisted
    /// - `OrderError::Conflict` when the invoice number collides twice; the
    ///   order is left behind marked [`OrderStatus::Failed`]
    pub async fn create(&self, draft: OrderDraft) -> Result<Order, OrderError> {
        let report = self.validator.validate(&draft);
        if !report.is_valid() {
            return Err(OrderError::Validation(report));
        }

        let billing_id = self
            .addresses
            .find_or_create(self.store.as_ref(), &draft.billing_address, AddressKind::Billing)
            .await?;
        let shipping_id = if draft.shipping_same_as_billing {
            billing_id
        } else {
            let shipping_fields = draft.shipping_address.clone().unwrap_or_default();
            self.addresses
                .find_or_create(self.store.as_ref(), &shipping_fields, AddressKind::Shipping)
                .await?
        };

        let mut payload =
            serde_json::to_value(&draft).map_err(|source| OrderError::Payload {
                event: OrderEvent::BeforeCreateOrder,
                source,
            })?;
        self.bus.publish(OrderEvent::BeforeCreateOrder, &mut payload)?;
        let draft: OrderDraft =
            serde_json::from_value(payload).map_err(|source| OrderError::Payload {
                event: OrderEvent::BeforeCreateOrder,
                source,
            })?;

        let blob = self
            .codec
            .encode(&SnapshotField::Decoded(draft.cart_snapshot.clone()))?;

        let record = self
            .store
            .insert_order(&NewOrder {
                user_id: draft.user_id,
                cart_id: draft.cart_id,
                status: OrderStatus::Pending,
                payment_status: draft.payment_status,
                processor: draft.processor.clone(),
                total: draft.total,
                currency: draft.currency.clone(),
                cart_snapshot: blob,
                billing_address_id: billing_id,
                shipping_address_id: shipping_id,
                items: draft.items.clone(),
            })
            .await?;

        let record = self.assign_identifiers_with_retry(record).await?;
        let order = self.materialize(record)?;

        let payload = serde_json::to_value(&order).map_err(|source| OrderError::Payload {
            event: OrderEvent::Created,
            source,
        })?;
        self.notify(OrderEvent::Created, payload);

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            invoice_number = %order.invoice_number,
            "order created"
        );
        Ok(order)
    }

    /// Apply changes to an existing order.
    ///
    /// Fires `Order.changed` with the list of changed fields and both states,
    /// but only when at least one business field actually changed; a no-op
    /// update fires nothing.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` when the changes break a field rule
    /// (negative total, emptied currency), and
    /// `OrderError::InvalidTransition` when the requested status would move
    /// the order back to [`OrderStatus::Pending`].
    pub async fn update(&self, order_id: OrderId, changes: OrderChanges) -> Result<Order, OrderError> {
        let report = self.validator.validate_changes(&changes);
        if !report.is_valid() {
            return Err(OrderError::Validation(report));
        }

        let previous = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if let Some(next) = changes.status
            && !previous.status.allows_transition_to(next)
        {
            return Err(OrderError::InvalidTransition {
                from: previous.status,
                to: next,
            });
        }

        let updated = self.store.update_order(order_id, &changes).await?;
        let changed = changed_fields(&previous, &updated);

        if !changed.is_empty() {
            match serde_json::to_value(&updated) {
                Ok(after) => {
                    let before = serde_json::to_value(&previous).unwrap_or(Value::Null);
                    self.notify(
                        OrderEvent::Changed,
                        json!({ "changed": changed, "before": before, "after": after }),
                    );
                }
                Err(error) => {
                    tracing::warn!(%error, "could not build Order.changed payload");
                }
            }
            tracing::info!(order_id = %order_id, fields = ?changed, "order updated");
        }

        self.materialize(updated)
    }

    /// Read an order on behalf of its owner.
    ///
    /// An order belonging to someone else is indistinguishable from a missing
    /// one.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` when the order is absent or not owned
    /// by `user_id`.
    pub async fn view(&self, order_id: OrderId, user_id: UserId) -> Result<OrderView, OrderError> {
        let record = match self.store.get_order(order_id).await? {
            Some(record) if record.user_id == Some(user_id) => record,
            _ => return Err(OrderError::NotFound),
        };
        self.load_view(record).await
    }

    /// Read any order, regardless of ownership.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` when the order is absent.
    pub async fn admin_view(&self, order_id: OrderId) -> Result<OrderView, OrderError> {
        let record = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        self.load_view(record).await
    }

    /// Assign order number, invoice number and currency in a follow-up write.
    ///
    /// A same-day race on the invoice sequence trips the uniqueness index;
    /// the write is retried once. The retry cannot reuse the count-based
    /// algorithm (the count already included both racing rows, so it would
    /// reproduce the colliding number) and instead takes the next suffix
    /// past the highest one actually assigned for the day. A second
    /// collision marks the order failed and surfaces the conflict, so no
    /// order ever keeps [`OrderStatus::Pending`] without its numbers.
    async fn assign_identifiers_with_retry(
        &self,
        record: OrderRecord,
    ) -> Result<OrderRecord, OrderError> {
        let identifiers = self.build_identifiers(&record).await?;
        match self.store.assign_identifiers(record.id, &identifiers).await {
            Ok(updated) => Ok(updated),
            Err(StoreError::Conflict(_)) => {
                tracing::warn!(
                    order_id = %record.id,
                    invoice_number = %identifiers.invoice_number,
                    "invoice number collision, recomputing"
                );
                let invoice_number = self
                    .invoices
                    .next_free(self.store.as_ref(), record.created_at.date_naive())
                    .await?;
                let identifiers = OrderIdentifiers {
                    invoice_number,
                    ..identifiers
                };
                match self.store.assign_identifiers(record.id, &identifiers).await {
                    Ok(updated) => Ok(updated),
                    Err(StoreError::Conflict(message)) => {
                        tracing::error!(
                            order_id = %record.id,
                            "invoice number collided twice, marking order failed"
                        );
                        let failed = OrderChanges {
                            status: Some(OrderStatus::Failed),
                            ..OrderChanges::default()
                        };
                        if let Err(error) = self.store.update_order(record.id, &failed).await {
                            tracing::error!(order_id = %record.id, %error, "could not mark order failed");
                        }
                        Err(OrderError::Conflict(message))
                    }
                    Err(err) => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn build_identifiers(&self, record: &OrderRecord) -> Result<OrderIdentifiers, OrderError> {
        let order_number = self.store.count_orders().await?.to_string();
        let invoice_number = self
            .invoices
            .next(
                self.store.as_ref(),
                &self.bus,
                record,
                record.created_at.date_naive(),
            )
            .await?;
        let currency = record
            .currency
            .clone()
            .filter(|currency| !currency.trim().is_empty())
            .unwrap_or_else(|| self.config.default_currency.clone());

        Ok(OrderIdentifiers {
            order_number,
            invoice_number,
            currency,
        })
    }

    async fn load_view(&self, record: OrderRecord) -> Result<OrderView, OrderError> {
        let items = self.store.get_order_items(record.id).await?;
        let billing_address = self.store.get_address(record.billing_address_id).await?;
        let shipping_address = self.store.get_address(record.shipping_address_id).await?;
        let order = self.materialize(record)?;

        Ok(OrderView {
            order,
            items,
            billing_address,
            shipping_address,
        })
    }

    /// Convert a stored row into the domain shape, decoding the snapshot.
    fn materialize(&self, record: OrderRecord) -> Result<Order, OrderError> {
        let cart_snapshot = self.codec.decode(&record.cart_snapshot).map_err(|error| {
            tracing::error!(order_id = %record.id, %error, "stored cart snapshot is corrupt");
            error
        })?;

        Ok(Order {
            id: record.id,
            user_id: record.user_id,
            cart_id: record.cart_id,
            status: record.status,
            payment_status: record.payment_status,
            processor: record.processor,
            total: record.total,
            currency: record.currency.unwrap_or_default(),
            order_number: record.order_number.unwrap_or_default(),
            invoice_number: record.invoice_number.unwrap_or_default(),
            cart_snapshot,
            billing_address_id: record.billing_address_id,
            shipping_address_id: record.shipping_address_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Publish a notification event, swallowing subscriber failures.
    fn notify(&self, event: OrderEvent, mut payload: Value) {
        if let Err(error) = self.bus.publish(event, &mut payload) {
            tracing::warn!(%event, %error, "subscriber failed during notification");
        }
    }
}
