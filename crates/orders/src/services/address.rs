//! Address deduplication.
//!
//! Billing and shipping addresses are content-addressed: before inserting a
//! new row the store is probed for an existing row with identical comparison
//! fields, and a match is reused as-is. This is a find-or-create, not an
//! upsert: an existing address is never mutated.

use till_core::{AddressId, AddressKind};

use crate::db::{OrderStore, StoreError};
use crate::error::OrderError;
use crate::models::{AddressField, AddressFields, AddressProbe, NewAddress};

/// Finds-or-creates address rows, collapsing duplicates.
#[derive(Debug, Clone)]
pub struct AddressDeduplicator {
    compare_fields: Vec<AddressField>,
}

impl Default for AddressDeduplicator {
    fn default() -> Self {
        Self {
            compare_fields: AddressField::ALL.to_vec(),
        }
    }
}

impl AddressDeduplicator {
    /// Deduplicator over the full comparison field set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deduplicator over a custom comparison field set.
    #[must_use]
    pub const fn with_fields(compare_fields: Vec<AddressField>) -> Self {
        Self { compare_fields }
    }

    /// Resolve `fields`/`kind` to an address id, inserting a row only when no
    /// duplicate exists.
    ///
    /// A concurrent identical insert losing the race against the content
    /// uniqueness constraint is retried as a find.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Conflict` if the constraint fired but the
    /// duplicate row cannot be found on retry, or any store error.
    pub async fn find_or_create(
        &self,
        store: &dyn OrderStore,
        fields: &AddressFields,
        kind: AddressKind,
    ) -> Result<AddressId, OrderError> {
        let probe = AddressProbe::over(&self.compare_fields, kind, fields);

        if let Some(existing) = store.find_address(&probe).await? {
            return Ok(existing.id);
        }

        let new_address = NewAddress {
            kind,
            fields: fields.clone(),
        };
        match store.insert_address(&new_address).await {
            Ok(created) => Ok(created.id),
            Err(StoreError::Conflict(message)) => {
                tracing::warn!(kind = %kind, "concurrent duplicate address insert, retrying as find");
                match store.find_address(&probe).await? {
                    Some(existing) => Ok(existing.id),
                    None => Err(OrderError::Conflict(message)),
                }
            }
            Err(err) => Err(err.into()),
        }
    }
}
