//! # Domain Types
//!
//! Core domain types used throughout Caixa.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Register     │   │      Entry      │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  register_id    │   │  register_id?   │──┐    │
//! │  │  opening_amount │   │  entry_type     │   │  channel        │  │    │
//! │  │  closed_at?     │   │  amount_cents   │   │  payment_method │  │    │
//! │  │  difference?    │   │  payment_method │   │  is_cancelled   │  │    │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘  │    │
//! │           ▲                                                        │    │
//! │           └────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   EntryType     │   │    Channel      │   │ PaymentMethod   │       │
//! │  │  Income         │   │  Pos            │   │  Cash  ◄ drawer │       │
//! │  │  Expense        │   │  Delivery       │   │  Pix, Cards,    │       │
//! │  └─────────────────┘   │  Manual         │   │  Voucher        │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Register Lifecycle
//! ```text
//!   (no record) ──open()──► OPEN ──close()──► CLOSED (terminal)
//! ```
//! There is no reopen. A closed register, its entries and its sales are
//! immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Checkout;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation;

// =============================================================================
// Discount Rate
// =============================================================================

/// Percentage represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1000 bps = 10%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

// =============================================================================
// Product (read-only catalog view)
// =============================================================================

/// A product as seen by the pricing engine.
///
/// The catalog is owned elsewhere; this crate only reads the pricing fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this product belongs to.
    pub tenant_id: String,

    /// Display name shown to the attendant and on receipts.
    pub name: String,

    /// Sold by weight (priced per kilogram) instead of per unit.
    pub is_weighable: bool,

    /// Price per unit in centavos (count-priced products).
    pub unit_price_cents: i64,

    /// Price per kilogram in centavos (weighable products).
    pub price_per_kg_cents: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Enumerations
// =============================================================================

/// Direction of a manual ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Money put into the drawer (change top-up, tips, misc income).
    Income,
    /// Money taken out of the drawer (supplier paid in cash, withdrawals).
    Expense,
}

/// Channel a sale originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// In-person sale at the counter.
    Pos,
    /// Delivery order.
    Delivery,
    /// Manually keyed order.
    Manual,
}

/// How money changed hands.
///
/// Only [`PaymentMethod::Cash`] moves physical money in the drawer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Pix,
    CreditCard,
    DebitCard,
    Voucher,
}

impl PaymentMethod {
    /// Returns true when this method moves physical cash.
    #[inline]
    pub const fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

// =============================================================================
// Register
// =============================================================================

/// One open-to-close session of the physical cash drawer.
///
/// ## Invariants
/// - `opening_amount_cents > 0`
/// - `closed_at`, `closing_amount_cents` and `difference_cents` are all `None`
///   while open and all `Some` once closed
/// - At most one register per tenant has `closed_at = None` (enforced by the
///   storage layer's unique index, not by this type)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Register {
    pub id: String,
    pub tenant_id: String,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    pub opening_amount_cents: i64,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub closing_amount_cents: Option<i64>,
    /// `closing_amount − expected_balance`; positive = surplus.
    pub difference_cents: Option<i64>,
}

impl Register {
    /// Builds a new open register.
    ///
    /// ## Errors
    /// `Validation` when `opening_amount <= 0`.
    pub fn open(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        opening_amount: Money,
        opened_at: DateTime<Utc>,
    ) -> CoreResult<Self> {
        validation::validate_opening_amount(opening_amount)?;

        Ok(Register {
            id: id.into(),
            tenant_id: tenant_id.into(),
            opened_at,
            opening_amount_cents: opening_amount.cents(),
            closed_at: None,
            closing_amount_cents: None,
            difference_cents: None,
        })
    }

    /// Returns true while the register accepts entries and sales.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    /// Fails with `RegisterClosed` unless the register is open.
    pub fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::RegisterClosed(self.id.clone()))
        }
    }

    #[inline]
    pub fn opening_amount(&self) -> Money {
        Money::from_cents(self.opening_amount_cents)
    }

    #[inline]
    pub fn closing_amount(&self) -> Option<Money> {
        self.closing_amount_cents.map(Money::from_cents)
    }

    #[inline]
    pub fn difference(&self) -> Option<Money> {
        self.difference_cents.map(Money::from_cents)
    }

    /// The OPEN → CLOSED transition.
    ///
    /// `expected_balance` must come from a summary computed over this
    /// register's full history inside the same logical close operation.
    ///
    /// ## Errors
    /// - `RegisterClosed` if the register is already closed
    /// - `Validation` if `closing_amount < 0`
    pub fn close(
        &self,
        closing_amount: Money,
        expected_balance: Money,
        closed_at: DateTime<Utc>,
    ) -> CoreResult<Register> {
        self.ensure_open()?;
        validation::validate_closing_amount(closing_amount)?;

        let difference = closing_amount - expected_balance;

        Ok(Register {
            closed_at: Some(closed_at),
            closing_amount_cents: Some(closing_amount.cents()),
            difference_cents: Some(difference.cents()),
            ..self.clone()
        })
    }
}

// =============================================================================
// Entry
// =============================================================================

/// Input for a manual ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewEntry {
    pub entry_type: EntryType,
    pub amount: Money,
    pub description: String,
    pub payment_method: PaymentMethod,
}

impl NewEntry {
    /// Validates amount and description.
    pub fn validate(&self) -> CoreResult<()> {
        validation::validate_entry_amount(self.amount)?;
        validation::validate_description(&self.description)?;
        Ok(())
    }
}

/// An immutable manual income/expense record attached to a register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Entry {
    pub id: String,
    pub register_id: String,
    pub entry_type: EntryType,
    pub amount_cents: i64,
    pub description: String,
    pub payment_method: PaymentMethod,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Builds an entry for `register`, which must be open.
    pub fn record(
        id: impl Into<String>,
        register: &Register,
        input: &NewEntry,
        created_at: DateTime<Utc>,
    ) -> CoreResult<Self> {
        input.validate()?;
        register.ensure_open()?;

        Ok(Entry {
            id: id.into(),
            register_id: register.id.clone(),
            entry_type: input.entry_type,
            amount_cents: input.amount.cents(),
            description: input.description.trim().to_string(),
            payment_method: input.payment_method,
            created_at,
        })
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed transaction from any channel.
///
/// `register_id` is stamped in the same atomic commit that inserts the sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub register_id: Option<String>,
    pub channel: Channel,
    pub payment_method: PaymentMethod,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub is_cancelled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Non-cancelled sales count toward every aggregate.
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.is_cancelled
    }
}

/// A line of a committed sale.
///
/// Snapshot pattern: name and pricing are frozen at the time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub weight_grams: Option<i64>,
    pub base_cents: i64,
    pub discount_cents: i64,
    pub subtotal_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// What the sale-completion flow hands over for attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleSubmission {
    pub channel: Channel,
    pub payment_method: PaymentMethod,
    pub checkout: Checkout,
    /// Register the sale was started against. `None` attributes the sale to
    /// whichever register is open at commit time.
    pub register_id: Option<String>,
}

impl SaleSubmission {
    /// A sale priced by the cart engine.
    pub fn from_checkout(channel: Channel, payment_method: PaymentMethod, checkout: Checkout) -> Self {
        SaleSubmission {
            channel,
            payment_method,
            checkout,
            register_id: None,
        }
    }

    /// A manual-channel sale that only carries an amount.
    pub fn manual(total: Money, payment_method: PaymentMethod) -> CoreResult<Self> {
        validation::validate_entry_amount(total)?;
        Ok(SaleSubmission {
            channel: Channel::Manual,
            payment_method,
            checkout: Checkout::amount_only(total),
            register_id: None,
        })
    }

    /// Pins the sale to a specific register.
    pub fn for_register(mut self, register_id: impl Into<String>) -> Self {
        self.register_id = Some(register_id.into());
        self
    }

    /// Builds the sale and line records for an attributed commit.
    pub fn build(
        &self,
        sale_id: &str,
        tenant_id: &str,
        register_id: &str,
        now: DateTime<Utc>,
        mut next_item_id: impl FnMut() -> String,
    ) -> CoreResult<(Sale, Vec<SaleItem>)> {
        let sale = Sale {
            id: sale_id.to_string(),
            tenant_id: tenant_id.to_string(),
            register_id: Some(register_id.to_string()),
            channel: self.channel,
            payment_method: self.payment_method,
            subtotal_cents: self.checkout.subtotal.cents(),
            discount_cents: self.checkout.discount.cents(),
            total_cents: self.checkout.total.cents(),
            is_cancelled: false,
            created_at: now,
            cancelled_at: None,
        };

        let items = self
            .checkout
            .items
            .iter()
            .map(|line| {
                Ok(SaleItem {
                    id: next_item_id(),
                    sale_id: sale_id.to_string(),
                    product_id: line.product_id.clone(),
                    name_snapshot: line.name.clone(),
                    quantity: line.quantity,
                    weight_grams: line.weight.map(|w| w.grams()),
                    base_cents: line.base_price()?.cents(),
                    discount_cents: line.discount.cents(),
                    subtotal_cents: line.subtotal()?.cents(),
                    created_at: now,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok((sale, items))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
