//! # Summary Calculator
//!
//! One deterministic aggregation over a register's history. The same function
//! feeds the live dashboard and the close-time reconciliation; there is no
//! second "fallback" path that could disagree with it.
//!
//! ## Formulae
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  active sale = sale.register_id == register.id && !sale.is_cancelled    │
//! │                                                                         │
//! │  sales_total        = Σ total   (active, channel = pos)                │
//! │  delivery_total     = Σ total   (active, channel = delivery)           │
//! │  manual_total       = Σ total   (active, channel = manual)             │
//! │  total_all_sales    = sales_total + delivery_total                     │
//! │  other_income_total = Σ amount  (income entries)                       │
//! │  total_expense      = Σ amount  (expense entries)                      │
//! │                                                                         │
//! │  expected_balance   = opening_amount                                   │
//! │                     + Σ cash income entries                            │
//! │                     + Σ cash active sales (any channel)                │
//! │                     − Σ cash expense entries                           │
//! │                                                                         │
//! │  payment_breakdown[m] = Σ amount of entries(m) + Σ active sales(m)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every figure is an integer sum, so the result does not depend on the
//! order in which entries and sales are supplied.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{Channel, Entry, EntryType, PaymentMethod, Register, Sale};

/// Derived drawer summary. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub register_id: String,
    pub opening_amount: Money,

    pub sales_total: Money,
    pub delivery_total: Money,
    pub manual_total: Money,
    pub other_income_total: Money,
    pub total_expense: Money,

    /// Cash the physical drawer should contain.
    pub expected_balance: Money,
    /// Revenue figure for reporting, payment-method agnostic.
    pub total_all_sales: Money,

    pub sales_count: u32,
    pub delivery_count: u32,
    pub manual_count: u32,
    pub income_count: u32,
    pub expense_count: u32,

    /// Cancelled sales are reported here and nowhere else.
    pub cancelled_count: u32,
    pub cancelled_total: Money,

    /// Gross amount moved per payment method, entries and sales alike
    /// (reporting only).
    pub payment_breakdown: BTreeMap<PaymentMethod, Money>,
}

impl Summary {
    /// Summary of a register with nothing attached yet.
    pub fn empty(register: &Register) -> Self {
        let opening_amount = register.opening_amount();

        Summary {
            register_id: register.id.clone(),
            opening_amount,
            sales_total: Money::zero(),
            delivery_total: Money::zero(),
            manual_total: Money::zero(),
            other_income_total: Money::zero(),
            total_expense: Money::zero(),
            expected_balance: opening_amount,
            total_all_sales: Money::zero(),
            sales_count: 0,
            delivery_count: 0,
            manual_count: 0,
            income_count: 0,
            expense_count: 0,
            cancelled_count: 0,
            cancelled_total: Money::zero(),
            payment_breakdown: BTreeMap::new(),
        }
    }

    /// Full recomputation from the register's history.
    ///
    /// Entries and sales attributed to another register are ignored.
    ///
    /// ## Example
    /// ```rust
    /// use caixa_core::{Money, Register, Summary, DEFAULT_TENANT_ID};
    ///
    /// let register = Register::open("r1", DEFAULT_TENANT_ID, Money::from_cents(10_000), chrono::Utc::now()).unwrap();
    /// let summary = Summary::compute(&register, &[], &[]);
    /// assert_eq!(summary.expected_balance, Money::from_cents(10_000));
    /// ```
    pub fn compute(register: &Register, entries: &[Entry], sales: &[Sale]) -> Self {
        let mut summary = Summary::empty(register);
        for entry in entries {
            summary.apply_entry(entry);
        }
        for sale in sales {
            summary.apply_sale(sale);
        }
        summary
    }

    /// Folds one entry into the summary.
    pub fn apply_entry(&mut self, entry: &Entry) {
        if entry.register_id != self.register_id {
            return;
        }

        let amount = entry.amount();
        match entry.entry_type {
            EntryType::Income => {
                self.other_income_total += amount;
                self.income_count += 1;
                if entry.payment_method.is_cash() {
                    self.expected_balance += amount;
                }
                self.credit(entry.payment_method, amount);
            }
            EntryType::Expense => {
                self.total_expense += amount;
                self.expense_count += 1;
                if entry.payment_method.is_cash() {
                    self.expected_balance -= amount;
                }
                self.credit(entry.payment_method, amount);
            }
        }
    }

    /// Folds one sale into the summary.
    pub fn apply_sale(&mut self, sale: &Sale) {
        if sale.register_id.as_deref() != Some(self.register_id.as_str()) {
            return;
        }

        let total = sale.total();

        if !sale.is_active() {
            self.cancelled_count += 1;
            self.cancelled_total += total;
            return;
        }

        match sale.channel {
            Channel::Pos => {
                self.sales_total += total;
                self.sales_count += 1;
                self.total_all_sales += total;
            }
            Channel::Delivery => {
                self.delivery_total += total;
                self.delivery_count += 1;
                self.total_all_sales += total;
            }
            Channel::Manual => {
                self.manual_total += total;
                self.manual_count += 1;
            }
        }

        if sale.payment_method.is_cash() {
            self.expected_balance += total;
        }
        self.credit(sale.payment_method, total);
    }

    /// Gross amount recorded for one payment method.
    pub fn by_method(&self, method: PaymentMethod) -> Money {
        self.payment_breakdown
            .get(&method)
            .copied()
            .unwrap_or_default()
    }

    fn credit(&mut self, method: PaymentMethod, amount: Money) {
        *self.payment_breakdown.entry(method).or_default() += amount;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_TENANT_ID;
    use chrono::Utc;

    fn register(opening: i64) -> Register {
        Register::open("reg-1", DEFAULT_TENANT_ID, Money::from_cents(opening), Utc::now()).unwrap()
    }

    fn entry(id: &str, entry_type: EntryType, cents: i64, method: PaymentMethod) -> Entry {
        Entry {
            id: id.to_string(),
            register_id: "reg-1".to_string(),
            entry_type,
            amount_cents: cents,
            description: "test".to_string(),
            payment_method: method,
            created_at: Utc::now(),
        }
    }

    fn sale(id: &str, channel: Channel, cents: i64, method: PaymentMethod) -> Sale {
        Sale {
            id: id.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            register_id: Some("reg-1".to_string()),
            channel,
            payment_method: method,
            subtotal_cents: cents,
            discount_cents: 0,
            total_cents: cents,
            is_cancelled: false,
            created_at: Utc::now(),
            cancelled_at: None,
        }
    }

    #[test]
    fn test_expected_balance_example() {
        // 100 + 50 (cash income) + 30 (cash sale) − 20 (cash expense) = 160
        let register = register(10_000);
        let entries = vec![
            entry("e1", EntryType::Income, 5_000, PaymentMethod::Cash),
            entry("e2", EntryType::Expense, 2_000, PaymentMethod::Cash),
        ];
        let sales = vec![sale("s1", Channel::Pos, 3_000, PaymentMethod::Cash)];

        let summary = Summary::compute(&register, &entries, &sales);

        assert_eq!(summary.expected_balance.cents(), 16_000);
        assert_eq!(summary.sales_total.cents(), 3_000);
        assert_eq!(summary.other_income_total.cents(), 5_000);
        assert_eq!(summary.total_expense.cents(), 2_000);
        assert_eq!(summary.sales_count, 1);
        assert_eq!(summary.income_count, 1);
        assert_eq!(summary.expense_count, 1);
    }

    #[test]
    fn test_non_cash_does_not_touch_drawer() {
        let register = register(10_000);
        let entries = vec![entry("e1", EntryType::Expense, 700, PaymentMethod::Pix)];
        let sales = vec![
            sale("s1", Channel::Pos, 4_000, PaymentMethod::CreditCard),
            sale("s2", Channel::Delivery, 2_500, PaymentMethod::Pix),
        ];

        let summary = Summary::compute(&register, &entries, &sales);

        assert_eq!(summary.expected_balance.cents(), 10_000);
        assert_eq!(summary.total_all_sales.cents(), 6_500);
        assert_eq!(summary.by_method(PaymentMethod::CreditCard).cents(), 4_000);
        // 2500 Pix sale + 700 Pix expense
        assert_eq!(summary.by_method(PaymentMethod::Pix).cents(), 3_200);
        assert_eq!(summary.by_method(PaymentMethod::Cash), Money::zero());
    }

    #[test]
    fn test_channels_are_grouped() {
        let register = register(5_000);
        let sales = vec![
            sale("s1", Channel::Pos, 1_000, PaymentMethod::Cash),
            sale("s2", Channel::Delivery, 2_000, PaymentMethod::Cash),
            sale("s3", Channel::Delivery, 500, PaymentMethod::DebitCard),
            sale("s4", Channel::Manual, 800, PaymentMethod::Cash),
        ];

        let summary = Summary::compute(&register, &[], &sales);

        assert_eq!(summary.sales_total.cents(), 1_000);
        assert_eq!(summary.delivery_total.cents(), 2_500);
        assert_eq!(summary.delivery_count, 2);
        assert_eq!(summary.manual_total.cents(), 800);
        assert_eq!(summary.manual_count, 1);
        assert_eq!(summary.total_all_sales.cents(), 3_500);
        // Manual cash sales still land in the drawer
        assert_eq!(summary.expected_balance.cents(), 5_000 + 1_000 + 2_000 + 800);
    }

    #[test]
    fn test_cancelled_sales_are_excluded() {
        let register = register(10_000);
        let mut cancelled = sale("s2", Channel::Delivery, 9_000, PaymentMethod::Cash);
        cancelled.is_cancelled = true;
        let sales = vec![sale("s1", Channel::Pos, 1_000, PaymentMethod::Cash), cancelled];

        let summary = Summary::compute(&register, &[], &sales);

        assert_eq!(summary.sales_total.cents(), 1_000);
        assert_eq!(summary.delivery_total, Money::zero());
        assert_eq!(summary.total_all_sales.cents(), 1_000);
        assert_eq!(summary.expected_balance.cents(), 11_000);
        assert_eq!(summary.delivery_count, 0);
        assert_eq!(summary.cancelled_count, 1);
        assert_eq!(summary.cancelled_total.cents(), 9_000);
    }

    #[test]
    fn test_foreign_records_are_ignored() {
        let register = register(10_000);
        let mut other_entry = entry("e1", EntryType::Income, 5_000, PaymentMethod::Cash);
        other_entry.register_id = "reg-2".to_string();
        let mut orphan = sale("s1", Channel::Pos, 3_000, PaymentMethod::Cash);
        orphan.register_id = None;

        let summary = Summary::compute(&register, &[other_entry], &[orphan]);
        assert_eq!(summary, Summary::empty(&register));
    }

    #[test]
    fn test_order_independence() {
        let register = register(10_000);
        let entries = vec![
            entry("e1", EntryType::Income, 5_000, PaymentMethod::Cash),
            entry("e2", EntryType::Expense, 2_000, PaymentMethod::Cash),
            entry("e3", EntryType::Income, 1_234, PaymentMethod::Pix),
        ];
        let sales = vec![
            sale("s1", Channel::Pos, 3_000, PaymentMethod::Cash),
            sale("s2", Channel::Delivery, 4_321, PaymentMethod::Voucher),
            sale("s3", Channel::Manual, 99, PaymentMethod::Cash),
        ];

        let forward = Summary::compute(&register, &entries, &sales);

        let mut rev_entries = entries.clone();
        rev_entries.reverse();
        let mut rotated_sales = sales.clone();
        rotated_sales.rotate_left(1);
        let shuffled = Summary::compute(&register, &rev_entries, &rotated_sales);

        assert_eq!(forward, shuffled);
    }

    #[test]
    fn test_incremental_equals_full_recompute() {
        let register = register(10_000);
        let entries = vec![
            entry("e1", EntryType::Income, 5_000, PaymentMethod::Cash),
            entry("e2", EntryType::Expense, 2_000, PaymentMethod::DebitCard),
        ];
        let sales = vec![
            sale("s1", Channel::Pos, 3_000, PaymentMethod::Cash),
            sale("s2", Channel::Delivery, 1_500, PaymentMethod::Pix),
        ];

        let mut incremental = Summary::empty(&register);
        incremental.apply_sale(&sales[0]);
        incremental.apply_entry(&entries[0]);
        assert_eq!(
            incremental,
            Summary::compute(&register, &entries[..1], &sales[..1])
        );

        incremental.apply_entry(&entries[1]);
        incremental.apply_sale(&sales[1]);
        assert_eq!(incremental, Summary::compute(&register, &entries, &sales));
    }

    #[test]
    fn test_breakdown_sums_entries_and_sales() {
        let register = register(10_000);
        let entries = vec![
            entry("e1", EntryType::Income, 1_000, PaymentMethod::Cash),
            entry("e2", EntryType::Expense, 400, PaymentMethod::Cash),
        ];
        let mut cancelled = sale("s2", Channel::Pos, 9_000, PaymentMethod::Cash);
        cancelled.is_cancelled = true;
        let sales = vec![sale("s1", Channel::Manual, 250, PaymentMethod::Cash), cancelled];

        let summary = Summary::compute(&register, &entries, &sales);

        assert_eq!(summary.by_method(PaymentMethod::Cash).cents(), 1_650);
        assert_eq!(summary.expected_balance.cents(), 10_850);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Event {
            Entry(Entry),
            Sale(Sale),
        }

        fn method() -> impl Strategy<Value = PaymentMethod> {
            prop_oneof![
                Just(PaymentMethod::Cash),
                Just(PaymentMethod::Pix),
                Just(PaymentMethod::CreditCard),
                Just(PaymentMethod::DebitCard),
                Just(PaymentMethod::Voucher),
            ]
        }

        fn channel() -> impl Strategy<Value = Channel> {
            prop_oneof![Just(Channel::Pos), Just(Channel::Delivery), Just(Channel::Manual)]
        }

        fn event() -> impl Strategy<Value = Event> {
            let entries = (any::<bool>(), 1i64..1_000_000, method(), any::<bool>()).prop_map(
                |(income, cents, method, foreign)| {
                    let kind = if income { EntryType::Income } else { EntryType::Expense };
                    let mut e = entry("e", kind, cents, method);
                    if foreign {
                        e.register_id = "reg-2".to_string();
                    }
                    Event::Entry(e)
                },
            );
            let sales = (channel(), 0i64..1_000_000, method(), any::<bool>(), any::<bool>())
                .prop_map(|(channel, cents, method, cancelled, orphan)| {
                    let mut s = sale("s", channel, cents, method);
                    s.is_cancelled = cancelled;
                    if orphan {
                        s.register_id = None;
                    }
                    Event::Sale(s)
                });
            prop_oneof![entries, sales]
        }

        fn split(events: &[Event]) -> (Vec<Entry>, Vec<Sale>) {
            let mut entries = Vec::new();
            let mut sales = Vec::new();
            for event in events {
                match event {
                    Event::Entry(e) => entries.push(e.clone()),
                    Event::Sale(s) => sales.push(s.clone()),
                }
            }
            (entries, sales)
        }

        proptest! {
            #[test]
            fn incremental_fold_equals_compute(
                opening in 1i64..1_000_000,
                events in prop::collection::vec(event(), 0..60),
            ) {
                let register = register(opening);
                let mut incremental = Summary::empty(&register);
                for event in &events {
                    match event {
                        Event::Entry(e) => incremental.apply_entry(e),
                        Event::Sale(s) => incremental.apply_sale(s),
                    }
                }

                let (entries, sales) = split(&events);
                prop_assert_eq!(incremental, Summary::compute(&register, &entries, &sales));
            }

            #[test]
            fn compute_ignores_order(
                (events, shuffled) in prop::collection::vec(event(), 0..60)
                    .prop_flat_map(|events| (Just(events.clone()), Just(events).prop_shuffle())),
            ) {
                let register = register(10_000);
                let (entries, sales) = split(&events);
                let (shuffled_entries, shuffled_sales) = split(&shuffled);

                prop_assert_eq!(
                    Summary::compute(&register, &entries, &sales),
                    Summary::compute(&register, &shuffled_entries, &shuffled_sales)
                );
            }

            #[test]
            fn breakdown_totals_every_counted_amount(
                events in prop::collection::vec(event(), 0..60),
            ) {
                let register = register(10_000);
                let (entries, sales) = split(&events);
                let summary = Summary::compute(&register, &entries, &sales);

                let breakdown: Money = summary.payment_breakdown.values().sum();
                prop_assert_eq!(
                    breakdown,
                    summary.other_income_total
                        + summary.total_expense
                        + summary.total_all_sales
                        + summary.manual_total
                );
            }
        }
    }
}
