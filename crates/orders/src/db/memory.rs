//! In-memory order store.
//!
//! Backs the test-suite and embedded use. Enforces the same uniqueness rules
//! as the Postgres schema (invoice number, address content) so conflict
//! handling in the service layer behaves identically against either backend.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use till_core::{AddressId, OrderId, OrderItemId};

use super::{OrderStore, StoreError};
use crate::models::{
    AddressProbe, NewAddress, NewOrder, OrderAddress, OrderChanges, OrderIdentifiers, OrderItem,
    OrderRecord, changed_fields,
};

#[derive(Default)]
struct Inner {
    orders: Vec<OrderRecord>,
    addresses: Vec<OrderAddress>,
    items: Vec<OrderItem>,
}

/// A `Mutex`-guarded in-process implementation of [`OrderStore`].
#[derive(Default)]
pub struct MemoryOrderStore {
    inner: Mutex<Inner>,
}

impl MemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored address rows.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex was poisoned.
    #[must_use]
    pub fn address_count(&self) -> usize {
        self.lock().addresses.len()
    }

    /// Number of stored order rows.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex was poisoned.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    #[allow(clippy::unwrap_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Mutex poisoning only happens after a panic elsewhere.
        self.inner.lock().unwrap()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn find_address(&self, probe: &AddressProbe) -> Result<Option<OrderAddress>, StoreError> {
        let inner = self.lock();
        // Insertion order doubles as created_at order, so the first match is
        // the earliest created.
        Ok(inner
            .addresses
            .iter()
            .find(|address| probe.matches(address))
            .cloned())
    }

    async fn insert_address(&self, address: &NewAddress) -> Result<OrderAddress, StoreError> {
        let mut inner = self.lock();
        let duplicate = inner.addresses.iter().any(|stored| {
            stored.kind == address.kind && stored.fields == address.fields
        });
        if duplicate {
            return Err(StoreError::Conflict(
                "address content already exists".to_owned(),
            ));
        }

        let stored = OrderAddress {
            id: AddressId::generate(),
            kind: address.kind,
            fields: address.fields.clone(),
            created_at: Utc::now(),
        };
        inner.addresses.push(stored.clone());
        Ok(stored)
    }

    async fn get_address(&self, id: AddressId) -> Result<Option<OrderAddress>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .addresses
            .iter()
            .find(|address| address.id == id)
            .cloned())
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<OrderRecord, StoreError> {
        let mut inner = self.lock();
        let now = Utc::now();
        let record = OrderRecord {
            id: OrderId::generate(),
            user_id: order.user_id,
            cart_id: order.cart_id,
            status: order.status,
            payment_status: order.payment_status,
            processor: order.processor.clone(),
            total: order.total,
            currency: order.currency.clone(),
            order_number: None,
            invoice_number: None,
            cart_snapshot: order.cart_snapshot.clone(),
            billing_address_id: order.billing_address_id,
            shipping_address_id: order.shipping_address_id,
            created_at: now,
            updated_at: now,
        };

        let items: Vec<OrderItem> = order
            .items
            .iter()
            .map(|item| OrderItem {
                id: OrderItemId::generate(),
                order_id: record.id,
                name: item.name.clone(),
                sku: item.sku.clone(),
                quantity: item.quantity,
                price: item.price,
                created_at: now,
            })
            .collect();

        inner.orders.push(record.clone());
        inner.items.extend(items);
        Ok(record)
    }

    async fn assign_identifiers(
        &self,
        id: OrderId,
        identifiers: &OrderIdentifiers,
    ) -> Result<OrderRecord, StoreError> {
        let mut inner = self.lock();
        let taken = inner.orders.iter().any(|order| {
            order.id != id && order.invoice_number.as_deref() == Some(&identifiers.invoice_number)
        });
        if taken {
            return Err(StoreError::Conflict(format!(
                "invoice number {} already exists",
                identifiers.invoice_number
            )));
        }

        let order = inner
            .orders
            .iter_mut()
            .find(|order| order.id == id)
            .ok_or(StoreError::NotFound)?;
        order.order_number = Some(identifiers.order_number.clone());
        order.invoice_number = Some(identifiers.invoice_number.clone());
        order.currency = Some(identifiers.currency.clone());
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn update_order(
        &self,
        id: OrderId,
        changes: &OrderChanges,
    ) -> Result<OrderRecord, StoreError> {
        let mut inner = self.lock();
        let order = inner
            .orders
            .iter_mut()
            .find(|order| order.id == id)
            .ok_or(StoreError::NotFound)?;

        let before = order.clone();
        if let Some(status) = changes.status {
            order.status = status;
        }
        if let Some(payment_status) = changes.payment_status {
            order.payment_status = payment_status;
        }
        if let Some(total) = changes.total {
            order.total = total;
        }
        if let Some(currency) = &changes.currency {
            order.currency = Some(currency.clone());
        }
        if !changed_fields(&before, order).is_empty() {
            order.updated_at = Utc::now();
        }
        Ok(order.clone())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>, StoreError> {
        let inner = self.lock();
        Ok(inner.orders.iter().find(|order| order.id == id).cloned())
    }

    async fn get_order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .items
            .iter()
            .filter(|item| item.order_id == id)
            .cloned()
            .collect())
    }

    async fn count_orders(&self) -> Result<i64, StoreError> {
        let inner = self.lock();
        Ok(i64::try_from(inner.orders.len()).unwrap_or(i64::MAX))
    }

    async fn count_orders_on(&self, day: NaiveDate) -> Result<i64, StoreError> {
        let inner = self.lock();
        let count = inner
            .orders
            .iter()
            .filter(|order| order.created_at.date_naive() == day)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn max_invoice_suffix_on(&self, day: NaiveDate) -> Result<Option<i64>, StoreError> {
        let prefix = format!("{}-", day.format("%Y%m%d"));
        let inner = self.lock();
        Ok(inner
            .orders
            .iter()
            .filter_map(|order| order.invoice_number.as_deref())
            .filter_map(|number| number.strip_prefix(&prefix))
            .filter_map(|suffix| suffix.parse::<i64>().ok())
            .max())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use till_core::AddressKind;

    use super::*;
    use crate::models::{AddressField, AddressFields};

    fn jane() -> AddressFields {
        AddressFields {
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            street: "1 Main St".to_owned(),
            city: "Springfield".to_owned(),
            zip: "12345".to_owned(),
            country: "US".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_address_content_conflicts() {
        let store = MemoryOrderStore::new();
        let address = NewAddress {
            kind: AddressKind::Billing,
            fields: jane(),
        };
        store.insert_address(&address).await.unwrap();
        let err = store.insert_address(&address).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.address_count(), 1);
    }

    #[tokio::test]
    async fn test_same_fields_different_kind_do_not_conflict() {
        let store = MemoryOrderStore::new();
        store
            .insert_address(&NewAddress {
                kind: AddressKind::Billing,
                fields: jane(),
            })
            .await
            .unwrap();
        store
            .insert_address(&NewAddress {
                kind: AddressKind::Shipping,
                fields: jane(),
            })
            .await
            .unwrap();
        assert_eq!(store.address_count(), 2);
    }

    #[tokio::test]
    async fn test_find_address_returns_earliest_match() {
        let store = MemoryOrderStore::new();
        let first = store
            .insert_address(&NewAddress {
                kind: AddressKind::Billing,
                fields: jane(),
            })
            .await
            .unwrap();
        // A second row with the same zip but a different street; probe on
        // zip alone matches both.
        let mut moved = jane();
        moved.street = "2 Oak Ave".to_owned();
        store
            .insert_address(&NewAddress {
                kind: AddressKind::Billing,
                fields: moved,
            })
            .await
            .unwrap();

        let probe = AddressProbe::over(&[AddressField::Zip], AddressKind::Billing, &jane());
        let found = store.find_address(&probe).await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn test_duplicate_invoice_number_conflicts() {
        let store = MemoryOrderStore::new();
        let billing = store
            .insert_address(&NewAddress {
                kind: AddressKind::Billing,
                fields: jane(),
            })
            .await
            .unwrap();

        let new_order = NewOrder {
            user_id: None,
            cart_id: None,
            status: till_core::OrderStatus::Pending,
            payment_status: till_core::PaymentStatus::Pending,
            processor: "stripe".to_owned(),
            total: rust_decimal::Decimal::ZERO,
            currency: None,
            cart_snapshot: "{}".to_owned(),
            billing_address_id: billing.id,
            shipping_address_id: billing.id,
            items: Vec::new(),
        };
        let first = store.insert_order(&new_order).await.unwrap();
        let second = store.insert_order(&new_order).await.unwrap();

        let identifiers = OrderIdentifiers {
            order_number: "1".to_owned(),
            invoice_number: "20260826-1".to_owned(),
            currency: "USD".to_owned(),
        };
        store.assign_identifiers(first.id, &identifiers).await.unwrap();
        let err = store
            .assign_identifiers(second.id, &identifiers)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_max_invoice_suffix_skips_custom_formats_and_other_days() {
        let store = MemoryOrderStore::new();
        let billing = store
            .insert_address(&NewAddress {
                kind: AddressKind::Billing,
                fields: jane(),
            })
            .await
            .unwrap();
        let new_order = NewOrder {
            user_id: None,
            cart_id: None,
            status: till_core::OrderStatus::Pending,
            payment_status: till_core::PaymentStatus::Pending,
            processor: "stripe".to_owned(),
            total: rust_decimal::Decimal::ZERO,
            currency: None,
            cart_snapshot: "{}".to_owned(),
            billing_address_id: billing.id,
            shipping_address_id: billing.id,
            items: Vec::new(),
        };
        let today = Utc::now().date_naive();
        assert_eq!(store.max_invoice_suffix_on(today).await.unwrap(), None);

        let first = store.insert_order(&new_order).await.unwrap();
        let second = store.insert_order(&new_order).await.unwrap();
        store
            .assign_identifiers(
                first.id,
                &OrderIdentifiers {
                    order_number: "1".to_owned(),
                    invoice_number: format!("{}-7", today.format("%Y%m%d")),
                    currency: "USD".to_owned(),
                },
            )
            .await
            .unwrap();
        store
            .assign_identifiers(
                second.id,
                &OrderIdentifiers {
                    order_number: "2".to_owned(),
                    invoice_number: "SHOP-2026-00042".to_owned(),
                    currency: "USD".to_owned(),
                },
            )
            .await
            .unwrap();

        assert_eq!(store.max_invoice_suffix_on(today).await.unwrap(), Some(7));
        assert_eq!(
            store
                .max_invoice_suffix_on(today.pred_opt().unwrap())
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_counts_and_day_bucketing() {
        let store = MemoryOrderStore::new();
        assert_eq!(store.count_orders().await.unwrap(), 0);

        let billing = store
            .insert_address(&NewAddress {
                kind: AddressKind::Billing,
                fields: jane(),
            })
            .await
            .unwrap();
        let new_order = NewOrder {
            user_id: None,
            cart_id: None,
            status: till_core::OrderStatus::Pending,
            payment_status: till_core::PaymentStatus::Pending,
            processor: "stripe".to_owned(),
            total: rust_decimal::Decimal::ZERO,
            currency: None,
            cart_snapshot: "{}".to_owned(),
            billing_address_id: billing.id,
            shipping_address_id: billing.id,
            items: Vec::new(),
        };
        store.insert_order(&new_order).await.unwrap();
        store.insert_order(&new_order).await.unwrap();

        let today = Utc::now().date_naive();
        assert_eq!(store.count_orders().await.unwrap(), 2);
        assert_eq!(store.count_orders_on(today).await.unwrap(), 2);
        assert_eq!(
            store
                .count_orders_on(today.pred_opt().unwrap())
                .await
                .unwrap(),
            0
        );
    }
}
