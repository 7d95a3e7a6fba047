//! # Cart Pricing Engine
//!
//! Computes line subtotals and the cart total before a sale is committed.
//!
//! ## Pricing Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Line Pricing                                     │
//! │                                                                         │
//! │  Weighable product (price per kg)                                      │
//! │    base = round(grams × price_per_kg / 1000)                           │
//! │                                                                         │
//! │  Count product (price per unit)                                        │
//! │    base = quantity × unit_price                                        │
//! │                                                                         │
//! │  subtotal = max(0, base − item_discount)                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                        Checkout                                         │
//! │                                                                         │
//! │  Σ = Σ subtotals                                                       │
//! │  Percentage(p) → discount = p × Σ                                      │
//! │  Fixed(f)      → discount = min(f, Σ)                                  │
//! │  total = max(0, Σ − discount)                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - One line per product id: adding the same product merges into the line
//! - Prices are frozen when the line is first created
//! - Cart-level discounts only exist on a [`Checkout`], never on the cart

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{DiscountRate, Product};
use crate::validation;
use crate::weight::Weight;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Item
// =============================================================================

/// A line in the cart.
///
/// Product pricing fields are a frozen copy taken when the line was created,
/// so later catalog edits do not reprice an open cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub is_weighable: bool,
    pub unit_price_cents: i64,
    pub price_per_kg_cents: i64,
    pub quantity: i64,
    /// Accumulated weight; `Some` only for weighable lines.
    pub weight: Option<Weight>,
    /// Per-item discount (absolute amount).
    pub discount: Money,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    fn from_product(product: &Product, quantity: i64, weight: Option<Weight>) -> Self {
        CartItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            is_weighable: product.is_weighable,
            unit_price_cents: product.unit_price_cents,
            price_per_kg_cents: product.price_per_kg_cents,
            quantity,
            weight: if product.is_weighable { weight } else { None },
            discount: Money::zero(),
            added_at: Utc::now(),
        }
    }

    /// Price before the per-item discount.
    ///
    /// ## Errors
    /// `AmountOverflow` when the line price does not fit in centavos.
    pub fn base_price(&self) -> CoreResult<Money> {
        if self.is_weighable {
            let grams = self.weight.map(|w| w.grams()).unwrap_or(0);
            // Half-up rounding to the centavo
            let cents = (grams as i128 * self.price_per_kg_cents as i128 + 500) / 1000;
            i64::try_from(cents)
                .map(Money::from_cents)
                .map_err(|_| self.overflow())
        } else {
            Money::from_cents(self.unit_price_cents)
                .checked_multiply_quantity(self.quantity)
                .ok_or_else(|| self.overflow())
        }
    }

    /// `max(0, base_price − discount)`.
    pub fn subtotal(&self) -> CoreResult<Money> {
        self.base_price()?
            .checked_sub(self.discount)
            .map(Money::non_negative)
            .ok_or_else(|| self.overflow())
    }

    fn overflow(&self) -> CoreError {
        CoreError::AmountOverflow(format!("line {}", self.product_id))
    }
}

// =============================================================================
// Cart Discount
// =============================================================================

/// Cart-level discount, applied only at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CartDiscount {
    Percentage(DiscountRate),
    Fixed(Money),
}

impl CartDiscount {
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            CartDiscount::Percentage(rate) => validation::validate_discount_bps(rate.bps())?,
            CartDiscount::Fixed(amount) => validation::validate_discount_amount(*amount)?,
        }
        Ok(())
    }

    /// Discount amount for a given sum of line subtotals.
    pub fn amount_for(&self, subtotal: Money) -> Money {
        match self {
            CartDiscount::Percentage(rate) => subtotal.percentage(*rate),
            CartDiscount::Fixed(amount) => (*amount).min(subtotal),
        }
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// The priced result handed to the sale-completion flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub items: Vec<CartItem>,
    /// Σ line subtotals.
    pub subtotal: Money,
    /// Cart-level discount actually applied.
    pub discount: Money,
    /// `max(0, subtotal − discount)`.
    pub total: Money,
}

impl Checkout {
    /// A checkout with no lines (manual sales keyed as an amount).
    pub fn amount_only(total: Money) -> Self {
        Checkout {
            items: Vec::new(),
            subtotal: total,
            discount: Money::zero(),
            total,
        }
    }

    /// Checks that the amounts agree with each other and with the lines.
    ///
    /// - `subtotal`, `discount` and `total` are non-negative
    /// - `discount` does not exceed `subtotal`
    /// - `total = subtotal − discount`
    /// - with lines present, `subtotal = Σ line subtotals`
    pub fn validate(&self) -> CoreResult<()> {
        for (field, amount) in [
            ("subtotal", self.subtotal),
            ("discount", self.discount),
            ("total", self.total),
        ] {
            if amount.is_negative() {
                return Err(ValidationError::MustNotBeNegative {
                    field: field.to_string(),
                }
                .into());
            }
        }

        if self.discount > self.subtotal {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: self.subtotal.cents(),
            }
            .into());
        }

        let expected_total = self.subtotal - self.discount;
        if self.total != expected_total {
            return Err(mismatch("total", expected_total, self.total));
        }

        if !self.items.is_empty() {
            let lines = self.items.iter().try_fold(Money::zero(), |sum, item| {
                sum.checked_add(item.subtotal()?)
                    .ok_or_else(|| CoreError::AmountOverflow("checkout lines".to_string()))
            })?;
            if lines != self.subtotal {
                return Err(mismatch("subtotal", lines, self.subtotal));
            }
        }

        Ok(())
    }
}

fn mismatch(field: &str, expected: Money, actual: Money) -> CoreError {
    ValidationError::Mismatch {
        field: field.to_string(),
        expected: expected.cents(),
        actual: actual.cents(),
    }
    .into()
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by `product_id`
/// - Quantity must be > 0 (setting 0 removes the line)
/// - Maximum lines: [`MAX_CART_ITEMS`]
/// - Maximum quantity per line: [`MAX_ITEM_QUANTITY`]
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a product, or merges into its existing line.
    ///
    /// ## Behavior
    /// - Weighable product: `weight` is required and positive; merging adds
    ///   the weight and bumps the quantity
    /// - Count product: `weight` is ignored; merging adds the quantity
    ///
    /// ## Errors
    /// `WeightRequired`, `QuantityTooLarge`, `CartTooLarge`, `Validation`.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: i64,
        weight: Option<Weight>,
    ) -> CoreResult<()> {
        validation::validate_quantity(quantity)?;

        let weight = if product.is_weighable {
            let weight = weight
                .filter(Weight::is_positive)
                .ok_or_else(|| CoreError::WeightRequired(product.id.clone()))?;
            validation::validate_weight(weight)?;
            Some(weight)
        } else {
            None
        };

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_qty = item.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }

            let new_weight = match (item.weight, weight) {
                (Some(current), Some(added)) => {
                    let total = current + added;
                    validation::validate_weight(total)?;
                    Some(total)
                }
                (current, _) => current,
            };

            item.quantity = new_qty;
            item.weight = new_weight;
            return Ok(());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.items
            .push(CartItem::from_product(product, quantity, weight));
        Ok(())
    }

    /// Sets the per-item discount of a line (replaces any previous one).
    pub fn apply_item_discount(&mut self, product_id: &str, discount: Money) -> CoreResult<()> {
        validation::validate_discount_amount(discount)?;
        let item = self.item_mut(product_id)?;
        item.discount = discount;
        Ok(())
    }

    /// Sets the quantity of a line; `0` removes it.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }
        validation::validate_quantity(quantity)?;

        self.item_mut(product_id)?.quantity = quantity;
        Ok(())
    }

    /// Replaces the weight of a weighable line (e.g. after re-weighing).
    pub fn update_weight(&mut self, product_id: &str, weight: Weight) -> CoreResult<()> {
        validation::validate_weight(weight)?;
        let item = self.item_mut(product_id)?;
        if !item.is_weighable {
            return Err(ValidationError::InvalidFormat {
                field: "weight".to_string(),
                reason: format!("product {} is not sold by weight", product_id),
            }
            .into());
        }
        item.weight = Some(weight);
        Ok(())
    }

    /// Removes a line by product ID.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product_id != product_id);

        if self.items.len() == initial_len {
            Err(CoreError::ItemNotInCart(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Clears all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Σ line subtotals (after per-item discounts).
    pub fn subtotal(&self) -> CoreResult<Money> {
        self.items.iter().try_fold(Money::zero(), |sum, item| {
            sum.checked_add(item.subtotal()?)
                .ok_or_else(|| CoreError::AmountOverflow("cart subtotal".to_string()))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Prices the cart with an optional cart-level discount.
    ///
    /// ## Errors
    /// `Validation` for an empty cart or an invalid discount,
    /// `AmountOverflow` when a price leaves the centavo range.
    pub fn checkout(&self, discount: Option<CartDiscount>) -> CoreResult<Checkout> {
        if self.is_empty() {
            return Err(ValidationError::Required {
                field: "cart items".to_string(),
            }
            .into());
        }

        let subtotal = self.subtotal()?;
        let discount_amount = match discount {
            Some(discount) => {
                discount.validate()?;
                discount.amount_for(subtotal)
            }
            None => Money::zero(),
        };

        Ok(Checkout {
            items: self.items.clone(),
            subtotal,
            discount: discount_amount,
            total: (subtotal - discount_amount).non_negative(),
        })
    }

    fn item_mut(&mut self, product_id: &str) -> CoreResult<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::ItemNotInCart(product_id.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
