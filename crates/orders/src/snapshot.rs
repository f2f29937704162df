//! Cart snapshot encoding and decoding.
//!
//! An order carries a frozen copy of the cart as it looked at checkout. The
//! snapshot is stored as an opaque serialized blob and decoded transparently
//! whenever an order is read back, so callers only ever see the structured
//! value, never the blob.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while encoding or decoding a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The stored blob is not valid snapshot data.
    #[error("corrupt cart snapshot: {0}")]
    Corrupt(#[source] serde_json::Error),

    /// The cart state could not be serialized.
    #[error("cart snapshot could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A snapshot field as held on an order: either the raw stored blob or the
/// structured cart state.
///
/// Keeping both shapes explicit makes encoding idempotent: encoding an
/// already-encoded field returns the blob verbatim rather than wrapping it a
/// second time.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotField {
    /// The serialized blob as stored on the order row.
    Encoded(String),
    /// The structured cart state.
    Decoded(Value),
}

/// Serializes and deserializes cart state, losslessly, for arbitrarily nested
/// mapping/sequence structures.
#[derive(Debug, Clone, Copy, Default)]
pub struct CartSnapshotCodec;

impl CartSnapshotCodec {
    /// Encode a snapshot field into the stored blob form.
    ///
    /// Already-encoded fields pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Encode` if the cart state cannot be serialized.
    pub fn encode(&self, field: &SnapshotField) -> Result<String, SnapshotError> {
        match field {
            SnapshotField::Encoded(blob) => Ok(blob.clone()),
            SnapshotField::Decoded(value) => {
                serde_json::to_string(value).map_err(SnapshotError::Encode)
            }
        }
    }

    /// Decode a stored blob back into structured cart state.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Corrupt` if the blob cannot be parsed; no
    /// partial data is ever returned.
    pub fn decode(&self, blob: &str) -> Result<Value, SnapshotError> {
        serde_json::from_str(blob).map_err(SnapshotError::Corrupt)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_round_trip_preserves_nested_structure() {
        let codec = CartSnapshotCodec;
        let cart = json!({
            "items": [
                { "sku": "A1", "qty": 2, "price": "19.99" },
                { "sku": "B7", "qty": 1, "options": { "giftwrap": true } },
            ],
            "requires_shipping": true,
            "totals": { "sub": "41.97", "tax": "3.99" },
        });

        let blob = codec.encode(&SnapshotField::Decoded(cart.clone())).unwrap();
        let decoded = codec.decode(&blob).unwrap();
        assert_eq!(decoded, cart);
    }

    #[test]
    fn test_encode_is_idempotent_for_encoded_fields() {
        let codec = CartSnapshotCodec;
        let cart = json!({ "items": [{ "sku": "A1", "qty": 2 }] });

        let once = codec.encode(&SnapshotField::Decoded(cart.clone())).unwrap();
        let twice = codec.encode(&SnapshotField::Encoded(once.clone())).unwrap();
        assert_eq!(once, twice);
        assert_eq!(codec.decode(&twice).unwrap(), cart);
    }

    #[test]
    fn test_corrupt_blob_surfaces_error() {
        let codec = CartSnapshotCodec;
        assert!(matches!(
            codec.decode("{ not json"),
            Err(SnapshotError::Corrupt(_))
        ));
        assert!(matches!(codec.decode(""), Err(SnapshotError::Corrupt(_))));
    }
}
