//! Postgres-backed order store.
//!
//! Uniqueness of invoice numbers and of address content is enforced by the
//! indexes in `migrations/0001_orders.sql`; violations are reported as
//! [`StoreError::Conflict`] so the service layer can retry.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use till_core::{AddressId, OrderId, OrderItemId};

use super::{OrderStore, StoreError};
use crate::models::{
    AddressFields, AddressProbe, NewAddress, NewOrder, OrderAddress, OrderChanges,
    OrderIdentifiers, OrderItem, OrderRecord,
};

const ORDER_COLUMNS: &str = "id, user_id, cart_id, status, payment_status, processor, \
     total, currency, order_number, invoice_number, cart_snapshot, \
     billing_address_id, shipping_address_id, created_at, updated_at";

const ADDRESS_COLUMNS: &str =
    "id, kind, first_name, last_name, street, city, zip, country, created_at";

/// Repository for order database operations.
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new store on top of an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn order_from_row(row: &PgRow) -> Result<OrderRecord, StoreError> {
    let status: String = row.try_get("status")?;
    let payment_status: String = row.try_get("payment_status")?;
    Ok(OrderRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        cart_id: row.try_get("cart_id")?,
        status: status
            .parse()
            .map_err(|e: String| StoreError::DataCorruption(format!("invalid status: {e}")))?,
        payment_status: payment_status.parse().map_err(|e: String| {
            StoreError::DataCorruption(format!("invalid payment status: {e}"))
        })?,
        processor: row.try_get("processor")?,
        total: row.try_get("total")?,
        currency: row.try_get("currency")?,
        order_number: row.try_get("order_number")?,
        invoice_number: row.try_get("invoice_number")?,
        cart_snapshot: row.try_get("cart_snapshot")?,
        billing_address_id: row.try_get("billing_address_id")?,
        shipping_address_id: row.try_get("shipping_address_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn address_from_row(row: &PgRow) -> Result<OrderAddress, StoreError> {
    let kind: String = row.try_get("kind")?;
    Ok(OrderAddress {
        id: row.try_get("id")?,
        kind: kind
            .parse()
            .map_err(|e: String| StoreError::DataCorruption(format!("invalid kind: {e}")))?,
        fields: AddressFields {
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            street: row.try_get("street")?,
            city: row.try_get("city")?,
            zip: row.try_get("zip")?,
            country: row.try_get("country")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

fn item_from_row(row: &PgRow) -> Result<OrderItem, StoreError> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        name: row.try_get("name")?,
        sku: row.try_get("sku")?,
        quantity: row.try_get("quantity")?,
        price: row.try_get("price")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_unique_violation(err: sqlx::Error, message: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(message.to_owned());
    }
    StoreError::Database(err)
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn find_address(&self, probe: &AddressProbe) -> Result<Option<OrderAddress>, StoreError> {
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(format!(
            "SELECT {ADDRESS_COLUMNS} FROM order_addresses WHERE TRUE"
        ));
        for (field, value) in &probe.fields {
            // Column names come from the AddressField enum, never from input.
            builder.push(" AND ");
            builder.push(field.column());
            builder.push(" = ");
            builder.push_bind(value);
        }
        builder.push(" ORDER BY created_at ASC LIMIT 1");

        let row = builder.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(address_from_row).transpose()
    }

    async fn insert_address(&self, address: &NewAddress) -> Result<OrderAddress, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO order_addresses (id, kind, first_name, last_name, street, city, zip, country) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(AddressId::generate())
        .bind(address.kind.to_string())
        .bind(&address.fields.first_name)
        .bind(&address.fields.last_name)
        .bind(&address.fields.street)
        .bind(&address.fields.city)
        .bind(&address.fields.zip)
        .bind(&address.fields.country)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "address content already exists"))?;

        address_from_row(&row)
    }

    async fn get_address(&self, id: AddressId) -> Result<Option<OrderAddress>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM order_addresses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(address_from_row).transpose()
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<OrderRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "INSERT INTO orders (id, user_id, cart_id, status, payment_status, processor, \
                                 total, currency, cart_snapshot, billing_address_id, shipping_address_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(OrderId::generate())
        .bind(order.user_id)
        .bind(order.cart_id)
        .bind(order.status.to_string())
        .bind(order.payment_status.to_string())
        .bind(&order.processor)
        .bind(order.total)
        .bind(order.currency.clone())
        .bind(&order.cart_snapshot)
        .bind(order.billing_address_id)
        .bind(order.shipping_address_id)
        .fetch_one(&mut *tx)
        .await?;

        let record = order_from_row(&row)?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, name, sku, quantity, price) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(OrderItemId::generate())
            .bind(record.id)
            .bind(&item.name)
            .bind(&item.sku)
            .bind(item.quantity)
            .bind(item.price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(record)
    }

    async fn assign_identifiers(
        &self,
        id: OrderId,
        identifiers: &OrderIdentifiers,
    ) -> Result<OrderRecord, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE orders \
             SET order_number = $1, invoice_number = $2, currency = $3, updated_at = now() \
             WHERE id = $4 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&identifiers.order_number)
        .bind(&identifiers.invoice_number)
        .bind(&identifiers.currency)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "invoice number already exists"))?;

        let row = row.ok_or(StoreError::NotFound)?;
        order_from_row(&row)
    }

    async fn update_order(
        &self,
        id: OrderId,
        changes: &OrderChanges,
    ) -> Result<OrderRecord, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE orders \
             SET status = COALESCE($1, status), \
                 payment_status = COALESCE($2, payment_status), \
                 total = COALESCE($3, total), \
                 currency = COALESCE($4, currency), \
                 updated_at = now() \
             WHERE id = $5 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(changes.status.map(|status| status.to_string()))
        .bind(changes.payment_status.map(|status| status.to_string()))
        .bind(changes.total)
        .bind(changes.currency.clone())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(StoreError::NotFound)?;
        order_from_row(&row)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn get_order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, order_id, name, sku, quantity, price, created_at \
             FROM order_items WHERE order_id = $1 ORDER BY created_at ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(item_from_row).collect()
    }

    async fn count_orders(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    async fn count_orders_on(&self, day: NaiveDate) -> Result<i64, StoreError> {
        let start = day.and_time(NaiveTime::MIN).and_utc();
        let end = start + chrono::Duration::days(1);

        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM orders WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("count")?)
    }

    async fn max_invoice_suffix_on(&self, day: NaiveDate) -> Result<Option<i64>, StoreError> {
        // The regex guard keeps free-form subscriber overrides out of the cast.
        let row = sqlx::query(
            "SELECT MAX(CAST(SPLIT_PART(invoice_number, '-', 2) AS BIGINT)) AS max_suffix \
             FROM orders WHERE invoice_number ~ ('^' || $1 || '-[0-9]+$')",
        )
        .bind(day.format("%Y%m%d").to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("max_suffix")?)
    }
}
