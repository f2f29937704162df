//! Persistence contract for the order aggregate.
//!
//! # Tables
//!
//! - `orders` - the aggregate root rows, unique on `invoice_number`
//! - `order_addresses` - deduplicated billing/shipping rows, unique on their
//!   full content (kind + the six identity fields)
//! - `order_items` - append-only line items
//!
//! # Migrations
//!
//! Migrations are stored in `crates/orders/migrations/` and run with
//! `sqlx migrate run` against the configured database.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use till_core::{AddressId, OrderId};

use crate::models::{
    AddressProbe, NewAddress, NewOrder, OrderAddress, OrderChanges, OrderIdentifiers, OrderItem,
    OrderRecord,
};

pub use memory::MemoryOrderStore;
pub use postgres::PgOrderStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (invoice number or address content uniqueness).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Storage contract for orders, their items and their addresses.
///
/// Implementations must enforce uniqueness of `invoice_number` and of address
/// content, reporting collisions as [`StoreError::Conflict`]; the service
/// layer relies on this to keep concurrent checkouts correct.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Find an address matching every probe field exactly.
    ///
    /// When several rows match (pre-existing duplicate data), the earliest
    /// created row is returned so the choice is deterministic.
    async fn find_address(&self, probe: &AddressProbe) -> Result<Option<OrderAddress>, StoreError>;

    /// Insert a new address row.
    async fn insert_address(&self, address: &NewAddress) -> Result<OrderAddress, StoreError>;

    /// Fetch an address by id.
    async fn get_address(&self, id: AddressId) -> Result<Option<OrderAddress>, StoreError>;

    /// Persist a new order row together with its items, all-or-nothing.
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderRecord, StoreError>;

    /// Assign order/invoice numbers and the final currency to an existing
    /// row. This is the create workflow's second write; it runs no
    /// validation and fires no hooks.
    async fn assign_identifiers(
        &self,
        id: OrderId,
        identifiers: &OrderIdentifiers,
    ) -> Result<OrderRecord, StoreError>;

    /// Apply the given changes to an existing order.
    async fn update_order(
        &self,
        id: OrderId,
        changes: &OrderChanges,
    ) -> Result<OrderRecord, StoreError>;

    /// Fetch an order row by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>, StoreError>;

    /// Fetch the line items belonging to an order.
    async fn get_order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, StoreError>;

    /// Total number of orders ever created.
    async fn count_orders(&self) -> Result<i64, StoreError>;

    /// Number of orders created on the given calendar day (creation
    /// timestamp range match).
    async fn count_orders_on(&self, day: NaiveDate) -> Result<i64, StoreError>;

    /// The highest `N` among invoice numbers of the form `YYYYMMDD-N` already
    /// assigned for the given day, or `None` when none are. Numbers in other
    /// formats (subscriber overrides) are ignored.
    async fn max_invoice_suffix_on(&self, day: NaiveDate) -> Result<Option<i64>, StoreError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
