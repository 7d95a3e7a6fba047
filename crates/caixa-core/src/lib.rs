//! # caixa-core: Pure Business Logic for the Caixa Register Engine
//!
//! This crate holds every rule that decides *what the drawer should contain*.
//! It contains no I/O: storage, clocks and hardware are passed in by callers.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Caixa Data Flow                                 │
//! │                                                                         │
//! │  ┌──────────────┐   checkout    ┌──────────────┐                       │
//! │  │ Cart Pricing │ ────────────► │ SaleSubmission│──┐                    │
//! │  │   (cart)     │               └──────────────┘  │                    │
//! │  └──────────────┘                                  │ caixa-db stamps    │
//! │                                                    ▼ the open register  │
//! │  ┌──────────────┐   entries + sales   ┌──────────────────────┐         │
//! │  │ Entry Ledger │ ──────────────────► │ Summary Calculator   │         │
//! │  └──────────────┘                     │   (summary)          │         │
//! │                                       └──────────┬───────────┘         │
//! │                                                  │ expected_balance    │
//! │                                                  ▼                     │
//! │  ┌──────────────────────┐      ┌──────────────────────────────┐       │
//! │  │ Register lifecycle   │ ───► │ Close Reconciliation         │       │
//! │  │   (types::Register)  │      │   (reconciliation)           │       │
//! │  └──────────────────────┘      └──────────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer-centavo `Money` type
//! - [`types`] - Domain records (Register, Entry, Sale, Product) and enums
//! - [`cart`] - Cart pricing engine (weight vs unit pricing, discounts)
//! - [`summary`] - Deterministic drawer summary
//! - [`reconciliation`] - Close-time difference and classification
//! - [`weight`] - Scale readings and freshness window
//! - [`validation`] - Input validation rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use caixa_core::money::Money;
//! use caixa_core::types::DiscountRate;
//!
//! let subtotal = Money::from_cents(5000); // R$50.00
//! let discount = subtotal.percentage(DiscountRate::from_bps(1000)); // 10%
//! assert_eq!(discount.cents(), 500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod reconciliation;
pub mod summary;
pub mod types;
pub mod validation;
pub mod weight;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartDiscount, CartItem, Checkout};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use reconciliation::{Classification, CloseReport};
pub use summary::Summary;
pub use types::*;
pub use weight::{Weight, WeightReading, WeightSensor};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tenant ID (single store runtime with a tenant-aware schema).
///
/// The open-register uniqueness constraint is scoped by tenant, so with a
/// single tenant it is system-wide.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single count-priced line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum weight of a single weighable line, in grams (50 kg).
pub const MAX_ITEM_WEIGHT_GRAMS: i64 = 50_000;

/// Maximum length of a ledger entry description.
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Default scale reading freshness window, in seconds.
pub const DEFAULT_WEIGHT_FRESHNESS_SECS: u64 = 4;
