//! Order address types.
//!
//! Addresses are content-addressed: two addresses with identical comparison
//! fields are the same logical address and share one stored row. Deduplication
//! probes carry the comparison field set explicitly so it stays configurable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use till_core::{AddressId, AddressKind};

/// The six identity fields of a billing or shipping address.
///
/// All fields are mandatory for a valid address.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddressFields {
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub city: String,
    pub zip: String,
    pub country: String,
}

/// An address to be inserted.
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub kind: AddressKind,
    pub fields: AddressFields,
}

/// A stored order address row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAddress {
    pub id: AddressId,
    pub kind: AddressKind,
    #[serde(flatten)]
    pub fields: AddressFields,
    pub created_at: DateTime<Utc>,
}

/// A comparison field used for address deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressField {
    FirstName,
    LastName,
    Street,
    City,
    Zip,
    Country,
    Kind,
}

impl AddressField {
    /// The full comparison field set (the default for deduplication).
    pub const ALL: [Self; 7] = [
        Self::FirstName,
        Self::LastName,
        Self::Street,
        Self::City,
        Self::Zip,
        Self::Country,
        Self::Kind,
    ];

    /// The database column backing this field.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Street => "street",
            Self::City => "city",
            Self::Zip => "zip",
            Self::Country => "country",
            Self::Kind => "kind",
        }
    }

    /// Extract this field's value from an address.
    #[must_use]
    pub fn value_of(self, kind: AddressKind, fields: &AddressFields) -> String {
        match self {
            Self::FirstName => fields.first_name.clone(),
            Self::LastName => fields.last_name.clone(),
            Self::Street => fields.street.clone(),
            Self::City => fields.city.clone(),
            Self::Zip => fields.zip.clone(),
            Self::Country => fields.country.clone(),
            Self::Kind => kind.to_string(),
        }
    }
}

/// An exact-equality probe over a set of comparison fields.
///
/// All listed fields must match for a stored address to count as a duplicate;
/// matching is never fuzzy.
#[derive(Debug, Clone)]
pub struct AddressProbe {
    pub fields: Vec<(AddressField, String)>,
}

impl AddressProbe {
    /// Build a probe for `fields`/`kind` over the given comparison set.
    #[must_use]
    pub fn over(
        compare: &[AddressField],
        kind: AddressKind,
        fields: &AddressFields,
    ) -> Self {
        Self {
            fields: compare
                .iter()
                .map(|field| (*field, field.value_of(kind, fields)))
                .collect(),
        }
    }

    /// Whether a stored address matches every probe field exactly.
    #[must_use]
    pub fn matches(&self, address: &OrderAddress) -> bool {
        self.fields
            .iter()
            .all(|(field, value)| field.value_of(address.kind, &address.fields) == *value)
    }
}
