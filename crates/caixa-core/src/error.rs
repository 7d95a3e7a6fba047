//! # Error Types
//!
//! Domain-specific error types for caixa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caixa-core errors (this file)                                         │
//! │  ├── CoreError        - Register, ledger, cart and scale failures      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  caixa-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Register Error Taxonomy
//! | Situation                                   | Variant                   |
//! |---------------------------------------------|---------------------------|
//! | Non-positive amount, empty description      | `Validation`              |
//! | Second open, lost race on the unique index  | `RegisterConflict`        |
//! | Unknown register / sale id                  | `RegisterNotFound`, `SaleNotFound` |
//! | Mutation on or after a closed register      | `RegisterClosed`          |
//! | Sale committed while no register is open    | `NoOpenRegister`          |
//! | Scale reading past the freshness window     | `StaleReading`            |

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A register is already open.
    ///
    /// ## When This Occurs
    /// - `open` called while another register has `closed_at = NULL`
    /// - Two terminals race to open; the loser hits the unique index
    #[error("A cash register is already open")]
    RegisterConflict,

    /// Register id does not exist.
    #[error("Cash register not found: {0}")]
    RegisterNotFound(String),

    /// The register has been closed and can no longer be mutated.
    ///
    /// ## When This Occurs
    /// - `close` called twice
    /// - Entry added after close
    /// - Sale committed against a register that closed in the meantime
    #[error("Cash register {0} is closed")]
    RegisterClosed(String),

    /// A sale was submitted but no register is open to receive it.
    #[error("No cash register is open")]
    NoOpenRegister,

    /// Sale id does not exist.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Scale reading is older than the freshness window.
    ///
    /// Callers discard the reading; this is never surfaced as fatal.
    #[error("Weight reading is stale: {age_ms}ms old, window is {window_ms}ms")]
    StaleReading { age_ms: i64, window_ms: i64 },

    /// A weighable product was added without a positive weight.
    #[error("Product {0} is sold by weight and needs a weight")]
    WeightRequired(String),

    /// Product is not in the cart.
    #[error("Product {0} not in cart")]
    ItemNotInCart(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// A price computation left the representable centavo range.
    #[error("Amount overflow computing {0}")]
    AmountOverflow(String),
}

impl CoreError {
    /// Returns true for failures that mean "the register is not accepting writes".
    pub fn is_closed_register(&self) -> bool {
        matches!(self, CoreError::RegisterClosed(_) | CoreError::NoOpenRegister)
    }

    /// Returns true for unknown-id failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::RegisterNotFound(_) | CoreError::SaleNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., a malformed config value).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A derived amount disagrees with the amounts it is derived from.
    #[error("{field} is {actual}, expected {expected}")]
    Mismatch {
        field: String,
        expected: i64,
        actual: i64,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
