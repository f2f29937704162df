//! Till Orders - the order creation core.
//!
//! Turns an in-progress shopping cart into an immutable, auditable order
//! record: a point-in-time snapshot of the cart is frozen onto the order,
//! billing/shipping addresses are deduplicated by content, order and invoice
//! numbers are assigned exactly once, and lifecycle events are published for
//! downstream collaborators (payment processors, notifications, inventory).
//!
//! # Modules
//!
//! - [`config`] - Environment-driven configuration (default currency, database URL)
//! - [`error`] - The [`OrderError`] taxonomy returned by the service layer
//! - [`events`] - Synchronous in-process publish/subscribe for lifecycle events
//! - [`snapshot`] - Lossless cart snapshot encoding/decoding
//! - [`validate`] - Declarative, non-short-circuiting order + address validation
//! - [`models`] - Domain and persistence types
//! - [`db`] - The [`OrderStore`] contract with Postgres and in-memory backends
//! - [`services`] - The [`OrderService`] orchestrator and its helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod services;
pub mod snapshot;
pub mod validate;

pub use config::OrdersConfig;
pub use db::{MemoryOrderStore, OrderStore, PgOrderStore, StoreError};
pub use error::OrderError;
pub use events::{EventOutcome, HandlerFlow, OrderEvent, OrderEventBus};
pub use services::{AddressDeduplicator, InvoiceNumberGenerator, OrderService};
pub use snapshot::{CartSnapshotCodec, SnapshotError, SnapshotField};
pub use validate::{OrderValidator, ValidationReport};
