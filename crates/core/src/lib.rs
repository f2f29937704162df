//! Till Core - Shared types library.
//!
//! This crate provides the common types used across the till order system,
//! most notably the typed entity IDs and the order/payment status enums
//! consumed by `till-orders`.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access. This
//! keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
