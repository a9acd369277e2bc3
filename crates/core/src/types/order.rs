//! Validated order input.
//!
//! [`NewOrder::parse`] is the only way to build a [`NewOrder`], so any value of
//! that type already satisfies the order invariants: at least one line item,
//! every item has an id and a positive quantity, and the total is a finite,
//! non-negative amount with two decimal places.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

/// Maximum number of line items in one order.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum length of a line item id.
pub const MAX_ITEM_ID_LENGTH: usize = 128;

/// Maximum length of the free-text delivery address.
pub const MAX_ADDRESS_LENGTH: usize = 500;

/// Errors that can occur when validating an order.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderValidationError {
    /// The order has no line items.
    #[error("items must contain at least one entry")]
    NoItems,
    /// The order has more line items than allowed.
    #[error("items must contain at most {max} entries")]
    TooManyItems {
        /// Maximum allowed number of items.
        max: usize,
    },
    /// A line item has an empty id.
    #[error("items[{index}].id is required")]
    MissingItemId {
        /// Position of the offending item.
        index: usize,
    },
    /// A line item id is too long.
    #[error("items[{index}].id must be at most {max} characters")]
    ItemIdTooLong {
        /// Position of the offending item.
        index: usize,
        /// Maximum allowed length.
        max: usize,
    },
    /// A line item has a zero quantity.
    #[error("items[{index}].qty must be a positive integer")]
    InvalidQuantity {
        /// Position of the offending item.
        index: usize,
    },
    /// The total is negative or not a finite number.
    #[error("total must be a finite, non-negative number")]
    InvalidTotal,
    /// The total does not fit the stored precision.
    #[error("total must not exceed {max}")]
    TotalTooLarge {
        /// Largest storable total.
        max: Decimal,
    },
    /// The address is too long.
    #[error("address must be at most {max} characters")]
    AddressTooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// One entry of an order: a menu item id and how many of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Menu item identifier (e.g. `"pepperoni"`).
    pub id: String,
    /// Number of units ordered.
    pub qty: u32,
}

/// An order that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    items: Vec<LineItem>,
    total: Decimal,
    address: Option<String>,
}

impl NewOrder {
    /// Largest total representable by `NUMERIC(10, 2)`.
    pub const MAX_TOTAL: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

    /// Validate raw order input.
    ///
    /// Item ids and the address are trimmed; an empty address becomes `None`.
    /// The total is rounded to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns the first [`OrderValidationError`] found, checking items first,
    /// then the total, then the address.
    pub fn parse(
        items: Vec<LineItem>,
        total: f64,
        address: Option<String>,
    ) -> Result<Self, OrderValidationError> {
        if items.is_empty() {
            return Err(OrderValidationError::NoItems);
        }
        if items.len() > MAX_LINE_ITEMS {
            return Err(OrderValidationError::TooManyItems {
                max: MAX_LINE_ITEMS,
            });
        }

        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let id = item.id.trim();
                if id.is_empty() {
                    return Err(OrderValidationError::MissingItemId { index });
                }
                if id.chars().count() > MAX_ITEM_ID_LENGTH {
                    return Err(OrderValidationError::ItemIdTooLong {
                        index,
                        max: MAX_ITEM_ID_LENGTH,
                    });
                }
                if item.qty == 0 {
                    return Err(OrderValidationError::InvalidQuantity { index });
                }
                Ok(LineItem {
                    id: id.to_owned(),
                    qty: item.qty,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let total = parse_total(total)?;

        let address = match address.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(a) if a.chars().count() > MAX_ADDRESS_LENGTH => {
                return Err(OrderValidationError::AddressTooLong {
                    max: MAX_ADDRESS_LENGTH,
                });
            }
            Some(a) => Some(a.to_owned()),
        };

        Ok(Self {
            items,
            total,
            address,
        })
    }

    /// The validated line items, in submission order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// The order total, rounded to two decimal places.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// The trimmed delivery address, if any.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

fn parse_total(total: f64) -> Result<Decimal, OrderValidationError> {
    // NaN fails this comparison too.
    if !(total.is_finite() && total >= 0.0) {
        return Err(OrderValidationError::InvalidTotal);
    }

    let amount = Decimal::from_f64(total)
        .ok_or(OrderValidationError::TotalTooLarge {
            max: NewOrder::MAX_TOTAL,
        })?
        .round_dp(2);

    if amount > NewOrder::MAX_TOTAL {
        return Err(OrderValidationError::TotalTooLarge {
            max: NewOrder::MAX_TOTAL,
        });
    }

    // -0.0 converts to a negative zero decimal.
    Ok(if amount.is_zero() { Decimal::ZERO } else { amount })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: &str, qty: u32) -> LineItem {
        LineItem {
            id: id.to_owned(),
            qty,
        }
    }

    #[test]
    fn test_parse_valid_order() {
        let order = NewOrder::parse(
            vec![item("pepperoni", 1)],
            22.5,
            Some("123 Pizza St".to_owned()),
        )
        .unwrap();

        assert_eq!(order.items(), &[item("pepperoni", 1)]);
        assert_eq!(order.total(), Decimal::new(2250, 2));
        assert_eq!(order.address(), Some("123 Pizza St"));
    }

    #[test]
    fn test_parse_rejects_empty_items() {
        assert_eq!(
            NewOrder::parse(vec![], 10.0, None),
            Err(OrderValidationError::NoItems)
        );
    }

    #[test]
    fn test_parse_rejects_too_many_items() {
        let items = (0..=MAX_LINE_ITEMS).map(|i| item(&format!("p{i}"), 1)).collect();
        assert!(matches!(
            NewOrder::parse(items, 10.0, None),
            Err(OrderValidationError::TooManyItems { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_blank_item_id() {
        let result = NewOrder::parse(vec![item("margherita", 1), item("   ", 2)], 10.0, None);
        assert_eq!(result, Err(OrderValidationError::MissingItemId { index: 1 }));
    }

    #[test]
    fn test_parse_rejects_zero_quantity() {
        let result = NewOrder::parse(vec![item("margherita", 0)], 10.0, None);
        assert_eq!(result, Err(OrderValidationError::InvalidQuantity { index: 0 }));
    }

    #[test]
    fn test_parse_rejects_bad_totals() {
        for total in [-0.01, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(
                NewOrder::parse(vec![item("hawaiian", 1)], total, None),
                Err(OrderValidationError::InvalidTotal),
                "total {total} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_total_beyond_storage_precision() {
        let result = NewOrder::parse(vec![item("hawaiian", 1)], 100_000_000.0, None);
        assert!(matches!(
            result,
            Err(OrderValidationError::TotalTooLarge { .. })
        ));
    }

    #[test]
    fn test_parse_rounds_total_to_cents() {
        let order = NewOrder::parse(vec![item("veggie", 2)], 0.1 + 0.2, None).unwrap();
        assert_eq!(order.total(), Decimal::new(30, 2));

        let free = NewOrder::parse(vec![item("veggie", 1)], -0.0, None).unwrap();
        assert_eq!(free.total(), Decimal::ZERO);
    }

    #[test]
    fn test_parse_normalizes_address() {
        let order = NewOrder::parse(vec![item("veggie", 1)], 5.0, Some("   ".to_owned())).unwrap();
        assert_eq!(order.address(), None);

        let long = "x".repeat(MAX_ADDRESS_LENGTH + 1);
        assert_eq!(
            NewOrder::parse(vec![item("veggie", 1)], 5.0, Some(long)),
            Err(OrderValidationError::AddressTooLong {
                max: MAX_ADDRESS_LENGTH
            })
        );
    }

    #[test]
    fn test_max_total_constant() {
        assert_eq!(NewOrder::MAX_TOTAL, Decimal::new(9_999_999_999, 2));
    }

    #[test]
    fn test_line_item_json_shape() {
        let parsed: LineItem = serde_json::from_str(r#"{"id":"pepperoni","qty":3}"#).unwrap();
        assert_eq!(parsed, item("pepperoni", 3));
        assert!(serde_json::from_str::<LineItem>(r#"{"id":"pepperoni","qty":-1}"#).is_err());
    }
}
