//! # Cart Math
//!
//! Pure validation and total computation for the bill workflow.
//!
//! ## Two-Pass Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Bill Creation, Pure Half                             │
//! │                                                                         │
//! │  Caller submits cart lines: [(product, qty, price-at-sale), ...]       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_cart(lines, resolved products)   ← THIS MODULE               │
//! │  ├── line shape: qty > 0, price >= 0, cart non-empty                   │
//! │  ├── every product id resolves                                         │
//! │  └── every requested qty is available                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cart_total(lines) = Σ qty × price-at-sale                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Storage layer decrements stock and persists the bill (stocksphere-db) │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The caller-supplied price is authoritative: the total ignores the
//! product's live price entirely.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CartLine, Product};

/// Validates the shape of a cart before any product lookups.
///
/// ## Rules
/// - The cart must contain at least one line
/// - Every quantity must be positive
/// - Every captured unit price must be non-negative (zero = free item)
pub fn validate_lines(lines: &[CartLine]) -> CoreResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "products".to_string(),
        }
        .into());
    }

    for line in lines {
        if line.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        if line.unit_price_cents < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "price".to_string(),
            }
            .into());
        }
    }

    Ok(())
}

/// Validates a cart against the resolved products.
///
/// This is the read-only validation pass of the bill workflow: it fails
/// before any write happens.
///
/// ## Failure Modes
/// - [`CoreError::ProductNotFound`] — a line references an id missing from
///   `products`, itemized by product id
/// - [`CoreError::InsufficientStock`] — a line requests more than is on
///   hand, itemized by product name and available quantity
pub fn validate_cart(lines: &[CartLine], products: &HashMap<String, Product>) -> CoreResult<()> {
    validate_lines(lines)?;

    for line in lines {
        let product = products
            .get(&line.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

        if !product.can_fulfil(line.quantity) {
            return Err(CoreError::InsufficientStock {
                name: product.name.clone(),
                available: product.quantity,
                requested: line.quantity,
            });
        }
    }

    Ok(())
}

/// Computes the bill total: Σ quantity × captured unit price.
///
/// Uses checked arithmetic; a total that overflows i64 cents is a caller
/// input problem, not a wrap-around.
pub fn cart_total(lines: &[CartLine]) -> CoreResult<Money> {
    let mut total = Money::zero();

    for line in lines {
        let line_total = Money::from_cents(line.unit_price_cents)
            .checked_mul(line.quantity)
            .ok_or(CoreError::TotalOverflow)?;
        total = total
            .checked_add(line_total)
            .ok_or(CoreError::TotalOverflow)?;
    }

    Ok(total)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, name: &str, quantity: i64, price_cents: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            price_cents,
            quantity,
            category: "Test".to_string(),
            min_stock_level: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(product_id: &str, quantity: i64, price: i64) -> CartLine {
        CartLine {
            product_id: product_id.to_string(),
            quantity,
            unit_price_cents: price,
        }
    }

    fn ledger(products: &[Product]) -> HashMap<String, Product> {
        products.iter().map(|p| (p.id.clone(), p.clone())).collect()
    }

    #[test]
    fn test_empty_cart_rejected() {
        let result = validate_lines(&[]);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        assert!(validate_lines(&[line("a", 0, 100)]).is_err());
        assert!(validate_lines(&[line("a", -2, 100)]).is_err());
        assert!(validate_lines(&[line("a", 1, 100)]).is_ok());
    }

    #[test]
    fn test_negative_price_rejected() {
        assert!(validate_lines(&[line("a", 1, -1)]).is_err());
        // Zero price is a free item, allowed.
        assert!(validate_lines(&[line("a", 1, 0)]).is_ok());
    }

    #[test]
    fn test_unknown_product_itemized_by_id() {
        let products = ledger(&[product("a", "Tea", 10, 100)]);
        let err = validate_cart(&[line("missing", 1, 100)], &products).unwrap_err();
        match err {
            CoreError::ProductNotFound(id) => assert_eq!(id, "missing"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_insufficient_stock_itemized_by_name() {
        let products = ledger(&[product("a", "Rice 5kg", 10, 100)]);
        let err = validate_cart(&[line("a", 20, 100)], &products).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                name,
                available,
                requested,
            } => {
                assert_eq!(name, "Rice 5kg");
                assert_eq!(available, 10);
                assert_eq!(requested, 20);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_exact_stock_is_sufficient() {
        let products = ledger(&[product("a", "Tea", 10, 100)]);
        assert!(validate_cart(&[line("a", 10, 100)], &products).is_ok());
    }

    #[test]
    fn test_total_uses_captured_price_not_live_price() {
        // Live price is 999, captured price is 10: the captured price wins.
        let total = cart_total(&[line("a", 3, 10)]).unwrap();
        assert_eq!(total.cents(), 30);
    }

    #[test]
    fn test_total_across_lines() {
        let total = cart_total(&[line("a", 3, 1000), line("b", 2, 250)]).unwrap();
        assert_eq!(total.cents(), 3500);
    }

    #[test]
    fn test_total_overflow() {
        let result = cart_total(&[line("a", 2, i64::MAX)]);
        assert!(matches!(result, Err(CoreError::TotalOverflow)));
    }
}
