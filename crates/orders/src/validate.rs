//! Order and address validation.
//!
//! Validation is declarative: each entity has a typed rule table (field name,
//! message, check) evaluated by a generic runner into a field-keyed error map.
//! The order's own fields, the billing address and the shipping address are
//! validated to completion independently, so a caller rendering a form gets
//! every field error at once instead of one at a time.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{AddressFields, OrderChanges, OrderDraft};

/// Per-field validation failure messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

const NON_NEGATIVE_TOTAL: &str = "This must be a non-negative amount";
const CURRENCY_REQUIRED: &str = "You must select a currency";

/// One declarative validation rule for an entity of type `T`.
struct FieldRule<T> {
    field: &'static str,
    message: &'static str,
    check: fn(&T) -> bool,
}

const ORDER_RULES: &[FieldRule<OrderDraft>] = &[
    FieldRule {
        field: "processor",
        message: "The order requires a payment processor",
        check: |draft| !draft.processor.trim().is_empty(),
    },
    FieldRule {
        field: "total",
        message: NON_NEGATIVE_TOTAL,
        check: |draft| draft.total >= Decimal::ZERO,
    },
    FieldRule {
        field: "currency",
        message: CURRENCY_REQUIRED,
        check: |draft| {
            draft
                .currency
                .as_deref()
                .is_none_or(|currency| !currency.trim().is_empty())
        },
    },
    FieldRule {
        field: "cart_snapshot",
        message: "You must add the cart data to the order",
        check: |draft| !draft.cart_snapshot.is_null(),
    },
];

const ADDRESS_RULES: &[FieldRule<AddressFields>] = &[
    FieldRule {
        field: "first_name",
        message: "This field cannot be left empty",
        check: |address| !address.first_name.trim().is_empty(),
    },
    FieldRule {
        field: "last_name",
        message: "This field cannot be left empty",
        check: |address| !address.last_name.trim().is_empty(),
    },
    FieldRule {
        field: "street",
        message: "This field cannot be left empty",
        check: |address| !address.street.trim().is_empty(),
    },
    FieldRule {
        field: "city",
        message: "This field cannot be left empty",
        check: |address| !address.city.trim().is_empty(),
    },
    FieldRule {
        field: "zip",
        message: "This field cannot be left empty",
        check: |address| !address.zip.trim().is_empty(),
    },
    FieldRule {
        field: "country",
        message: "This field cannot be left empty",
        check: |address| !address.country.trim().is_empty(),
    },
];

fn run_rules<T>(rules: &[FieldRule<T>], value: &T) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for rule in rules {
        if !(rule.check)(value) {
            errors
                .entry(rule.field.to_owned())
                .or_default()
                .push(rule.message.to_owned());
        }
    }
    errors
}

/// The aggregate result of validating an order payload.
///
/// Valid only when all three sub-validations pass; each error map populates
/// independently of the others.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub order: FieldErrors,
    pub billing_address: FieldErrors,
    pub shipping_address: FieldErrors,
}

impl ValidationReport {
    /// Whether the payload passed every sub-validation.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.order.is_empty() && self.billing_address.is_empty() && self.shipping_address.is_empty()
    }
}

/// Validates an order draft plus its nested address entities as one unit,
/// without short-circuiting on the first failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderValidator;

impl OrderValidator {
    /// Validate the draft's own fields and both addresses.
    ///
    /// When the draft signals "shipping same as billing", shipping validation
    /// is skipped entirely: the shipping address is valid by construction
    /// because it will alias the billing address.
    #[must_use]
    pub fn validate(&self, draft: &OrderDraft) -> ValidationReport {
        let order = run_rules(ORDER_RULES, draft);
        let billing_address = run_rules(ADDRESS_RULES, &draft.billing_address);
        let shipping_address = if draft.shipping_same_as_billing {
            FieldErrors::new()
        } else {
            run_rules(
                ADDRESS_RULES,
                &draft.shipping_address.clone().unwrap_or_default(),
            )
        };

        ValidationReport {
            order,
            billing_address,
            shipping_address,
        }
    }

    /// Validate an update payload.
    ///
    /// The same field rules apply to updates as to creation; the stores must
    /// never see a negative total or an emptied currency.
    #[must_use]
    pub fn validate_changes(&self, changes: &OrderChanges) -> ValidationReport {
        let mut order = FieldErrors::new();
        if changes.total.is_some_and(|total| total < Decimal::ZERO) {
            order
                .entry("total".to_owned())
                .or_default()
                .push(NON_NEGATIVE_TOTAL.to_owned());
        }
        if changes
            .currency
            .as_deref()
            .is_some_and(|currency| currency.trim().is_empty())
        {
            order
                .entry("currency".to_owned())
                .or_default()
                .push(CURRENCY_REQUIRED.to_owned());
        }

        ValidationReport {
            order,
            ..ValidationReport::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn address() -> AddressFields {
        AddressFields {
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            street: "1 Main St".to_owned(),
            city: "Springfield".to_owned(),
            zip: "12345".to_owned(),
            country: "US".to_owned(),
        }
    }

    fn draft() -> OrderDraft {
        OrderDraft {
            user_id: None,
            cart_id: None,
            processor: "stripe".to_owned(),
            payment_status: till_core::PaymentStatus::Pending,
            total: Decimal::new(4999, 2),
            currency: None,
            cart_snapshot: json!({ "items": [] }),
            items: Vec::new(),
            billing_address: address(),
            shipping_address: Some(address()),
            shipping_same_as_billing: false,
        }
    }

    #[test]
    fn test_valid_draft_produces_empty_report() {
        let report = OrderValidator.validate(&draft());
        assert!(report.is_valid());
    }

    #[test]
    fn test_missing_currency_is_allowed_but_blank_is_not() {
        let mut no_currency = draft();
        no_currency.currency = None;
        assert!(OrderValidator.validate(&no_currency).is_valid());

        let mut blank_currency = draft();
        blank_currency.currency = Some("  ".to_owned());
        let report = OrderValidator.validate(&blank_currency);
        assert!(!report.is_valid());
        assert!(report.order.contains_key("currency"));
    }

    #[test]
    fn test_invalid_billing_does_not_suppress_order_errors() {
        let mut invalid = draft();
        invalid.processor = String::new();
        invalid.billing_address.street = String::new();
        invalid.billing_address.zip = String::new();

        let report = OrderValidator.validate(&invalid);
        assert!(!report.is_valid());
        assert!(report.order.contains_key("processor"));
        assert!(report.billing_address.contains_key("street"));
        assert!(report.billing_address.contains_key("zip"));
        assert!(report.shipping_address.is_empty());
    }

    #[test]
    fn test_invalid_billing_with_valid_order_leaves_order_errors_empty() {
        let mut invalid = draft();
        invalid.billing_address.city = String::new();

        let report = OrderValidator.validate(&invalid);
        assert!(!report.is_valid());
        assert!(report.order.is_empty());
        assert_eq!(
            report.billing_address.get("city").unwrap(),
            &vec!["This field cannot be left empty".to_owned()]
        );
    }

    #[test]
    fn test_same_as_billing_skips_shipping_validation() {
        let mut same = draft();
        same.shipping_same_as_billing = true;
        same.shipping_address = None;
        assert!(OrderValidator.validate(&same).is_valid());
    }

    #[test]
    fn test_missing_shipping_address_fails_every_field() {
        let mut missing = draft();
        missing.shipping_address = None;

        let report = OrderValidator.validate(&missing);
        assert!(!report.is_valid());
        assert_eq!(report.shipping_address.len(), 6);
    }

    #[test]
    fn test_negative_total_is_rejected() {
        let mut negative = draft();
        negative.total = Decimal::new(-1, 2);
        let report = OrderValidator.validate(&negative);
        assert!(report.order.contains_key("total"));
    }

    #[test]
    fn test_changes_follow_the_same_field_rules() {
        let ok = OrderChanges {
            total: Some(Decimal::new(100, 2)),
            currency: Some("EUR".to_owned()),
            ..OrderChanges::default()
        };
        assert!(OrderValidator.validate_changes(&ok).is_valid());
        assert!(OrderValidator.validate_changes(&OrderChanges::default()).is_valid());

        let negative = OrderChanges {
            total: Some(Decimal::new(-500, 2)),
            ..OrderChanges::default()
        };
        let report = OrderValidator.validate_changes(&negative);
        assert!(!report.is_valid());
        assert_eq!(
            report.order.get("total").unwrap(),
            &vec![NON_NEGATIVE_TOTAL.to_owned()]
        );

        let blanked = OrderChanges {
            currency: Some("  ".to_owned()),
            ..OrderChanges::default()
        };
        let report = OrderValidator.validate_changes(&blanked);
        assert!(report.order.contains_key("currency"));
    }
}
