//! # Validation Module
//!
//! Input validation rules for the register engine and cart.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (pure)                                           │
//! │  ├── amounts > 0, closing >= 0, description non-empty                  │
//! │  └── quantity / weight / discount ranges                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Register state (types::Register::ensure_open)                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on amounts                                      │
//! │  ├── partial UNIQUE index: one open register                           │
//! │  └── Foreign keys entries/sales → registers                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::weight::Weight;
use crate::{MAX_DESCRIPTION_LEN, MAX_ITEM_QUANTITY, MAX_ITEM_WEIGHT_GRAMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Register & Ledger Validators
// =============================================================================

/// Opening float must be strictly positive.
///
/// ## Example
/// ```rust
/// use caixa_core::money::Money;
/// use caixa_core::validation::validate_opening_amount;
///
/// assert!(validate_opening_amount(Money::from_cents(10_000)).is_ok());
/// assert!(validate_opening_amount(Money::zero()).is_err());
/// ```
pub fn validate_opening_amount(amount: Money) -> ValidationResult<()> {
    must_be_positive("opening_amount", amount)
}

/// The physically counted closing amount may be zero, never negative.
pub fn validate_closing_amount(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "closing_amount".to_string(),
        });
    }

    Ok(())
}

/// Ledger entries and manual sales carry a strictly positive amount.
pub fn validate_entry_amount(amount: Money) -> ValidationResult<()> {
    must_be_positive("amount", amount)
}

/// Ledger descriptions are required and bounded.
pub fn validate_description(description: &str) -> ValidationResult<()> {
    let description = description.trim();

    if description.is_empty() {
        return Err(ValidationError::Required {
            field: "description".to_string(),
        });
    }

    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(())
}

fn must_be_positive(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Cart Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Add Item                                                         │
/// │                                                                         │
/// │  Attendant enters quantity: 5                                          │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0?  → "quantity must be positive"                     │
/// │       ├── qty > 999? → "quantity must be between 1 and 999"            │
/// │       └── OK → line is created or merged                               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Weighable lines need a positive weight no heavier than the scale limit.
pub fn validate_weight(weight: Weight) -> ValidationResult<()> {
    if !weight.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "weight".to_string(),
        });
    }

    if weight.grams() > MAX_ITEM_WEIGHT_GRAMS {
        return Err(ValidationError::OutOfRange {
            field: "weight".to_string(),
            min: 1,
            max: MAX_ITEM_WEIGHT_GRAMS,
        });
    }

    Ok(())
}

/// Per-item and fixed cart discounts cannot be negative.
pub fn validate_discount_amount(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "discount".to_string(),
        });
    }

    Ok(())
}

/// Percentage discounts are 0%..=100%.
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "discount_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_amounts() {
        assert!(validate_opening_amount(Money::from_cents(1)).is_ok());
        assert!(validate_opening_amount(Money::zero()).is_err());
        assert!(validate_opening_amount(Money::from_cents(-100)).is_err());

        assert!(validate_closing_amount(Money::zero()).is_ok());
        assert!(validate_closing_amount(Money::from_cents(-1)).is_err());

        assert!(validate_entry_amount(Money::from_cents(50)).is_ok());
        assert!(validate_entry_amount(Money::zero()).is_err());
    }

    #[test]
    fn test_validate_description() {
        assert!(validate_description("Troco inicial").is_ok());
        assert!(validate_description("").is_err());
        assert!(validate_description("   ").is_err());
        assert!(validate_description(&"x".repeat(MAX_DESCRIPTION_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_weight() {
        assert!(validate_weight(Weight::from_grams(300)).is_ok());
        assert!(validate_weight(Weight::from_grams(0)).is_err());
        assert!(validate_weight(Weight::from_grams(MAX_ITEM_WEIGHT_GRAMS + 1)).is_err());
    }

    #[test]
    fn test_validate_discounts() {
        assert!(validate_discount_amount(Money::zero()).is_ok());
        assert!(validate_discount_amount(Money::from_cents(-5)).is_err());
        assert!(validate_discount_bps(10_000).is_ok());
        assert!(validate_discount_bps(10_001).is_err());
    }
}
