//! # Cash Register Service
//!
//! The register lifecycle, entry ledger and sale attribution on top of the
//! SQLite store. This is the surface terminals and the delivery flow call.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CashRegister                                      │
//! │                                                                         │
//! │  MUTATIONS (one atomic commit each, never retried here)                │
//! │  ├── open_register(amount)          INSERT, unique index guards        │
//! │  ├── add_entry(register, entry)     claim_open → INSERT                │
//! │  ├── commit_sale(submission)        claim_open → INSERT sale + items   │
//! │  ├── cancel_sale(sale)              guarded UPDATE → reload            │
//! │  └── close_register(id, counted)    claim_open → load history →        │
//! │                                     Summary::compute → UPDATE          │
//! │                                                                         │
//! │  QUERIES (snapshot reads, bounded retry on transient failures)         │
//! │  ├── get_summary / is_open / current_register / get_register          │
//! │  └── list_entries / list_sales / list_registers / close_report        │
//! │                                                                         │
//! │  Every call is bounded by operation_timeout → DbError::Timeout         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Timeouts and COMMIT
//! A mutation stages its statements under the operation timeout and only
//! then issues COMMIT, which is not raced against the deadline. If the
//! deadline fires while staging, the transaction is dropped and rolled back,
//! so `DbError::Timeout` from a mutation always means nothing was written
//! and the call can be retried.
//!
//! ## Close Race
//! A sale either commits before close claims the register (and is counted
//! in the close summary) or waits on the write lock and then finds the
//! register closed (and is rejected). It is never silently orphaned.
//!
//! ## Events
//! [`CashRegister::subscribe`] yields [`RegisterEvent`]s after each commit.
//! Delivery is best effort; the database stays the source of truth.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use sqlx::{Sqlite, Transaction};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use caixa_core::validation;
use caixa_core::{
    CloseReport, CoreError, Entry, Money, NewEntry, Register, Sale, SaleItem, SaleSubmission,
    Summary, DEFAULT_TENANT_ID,
};

use crate::config::CaixaConfig;
use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::{entry as entry_repo, register as register_repo, sale as sale_repo};
use crate::retry::RetryPolicy;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 256;

/// A transaction whose statements all succeeded, waiting for COMMIT.
type Staged<T> = (Transaction<'static, Sqlite>, T);

// =============================================================================
// Events
// =============================================================================

/// Notification published after a successful commit.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RegisterEvent {
    Opened(Register),
    EntryAdded(Entry),
    SaleCommitted(Sale),
    SaleCancelled(Sale),
    Closed(Box<CloseReport>),
}

// =============================================================================
// Service
// =============================================================================

/// Register lifecycle service.
///
/// There is no cached "current register": every call asks the store, where
/// the open-register index is the only authority.
#[derive(Debug, Clone)]
pub struct CashRegister {
    db: Database,
    operation_timeout: Duration,
    read_retry: RetryPolicy,
    events: broadcast::Sender<RegisterEvent>,
}

impl CashRegister {
    pub fn new(db: Database, operation_timeout: Duration, read_retry: RetryPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        CashRegister {
            db,
            operation_timeout,
            read_retry,
            events,
        }
    }

    /// Builds the service with timeouts and retries from configuration.
    pub fn from_config(db: Database, config: &CaixaConfig) -> Self {
        CashRegister::new(
            db,
            Duration::from_millis(config.database.operation_timeout_ms),
            config.retry_policy(),
        )
    }

    /// Subscribes to best-effort change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<RegisterEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Register Lifecycle
    // =========================================================================

    /// Opens a new register with the given float.
    ///
    /// ## Errors
    /// - `Validation` if `opening_amount <= 0`
    /// - `RegisterConflict` if a register is already open (including a lost race)
    pub async fn open_register(&self, opening_amount: Money) -> DbResult<Register> {
        let register = Register::open(
            Uuid::new_v4().to_string(),
            DEFAULT_TENANT_ID,
            opening_amount,
            Utc::now(),
        )?;

        let result = self
            .commit_staged("open_register", self.stage_open(&register))
            .await;

        if let Err(e) = result {
            if e.is_conflict() {
                warn!("Open rejected: a register is already open");
            }
            return Err(e);
        }

        info!(
            register_id = %register.id,
            opening = %register.opening_amount(),
            "Register opened"
        );
        self.emit(RegisterEvent::Opened(register.clone()));

        Ok(register)
    }

    async fn stage_open(&self, register: &Register) -> DbResult<Staged<()>> {
        let mut tx = self.db.pool().begin().await?;
        register_repo::insert(&mut *tx, register).await?;
        Ok((tx, ()))
    }

    /// Closes a register against the physically counted amount.
    ///
    /// The summary is recomputed inside the closing transaction; nothing
    /// computed earlier is reused.
    ///
    /// ## Errors
    /// - `Validation` if `closing_amount < 0`
    /// - `RegisterNotFound` for an unknown id
    /// - `RegisterClosed` if it was already closed
    pub async fn close_register(
        &self,
        register_id: &str,
        closing_amount: Money,
    ) -> DbResult<CloseReport> {
        validation::validate_closing_amount(closing_amount)?;

        let report = self
            .commit_staged("close_register", self.stage_close(register_id, closing_amount))
            .await?;

        info!(
            register_id = %register_id,
            expected = %report.summary.expected_balance,
            counted = %closing_amount,
            difference = %report.difference,
            classification = ?report.classification,
            "Register closed"
        );
        self.emit(RegisterEvent::Closed(Box::new(report.clone())));

        Ok(report)
    }

    async fn stage_close(
        &self,
        register_id: &str,
        closing_amount: Money,
    ) -> DbResult<Staged<CloseReport>> {
        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let claimed =
            register_repo::claim_open(&mut *tx, DEFAULT_TENANT_ID, Some(register_id), now).await?;
        if claimed.is_none() {
            tx.rollback().await?;
            return Err(self.not_open_error(register_id).await);
        }

        let register = register_repo::fetch(&mut *tx, register_id)
            .await?
            .ok_or_else(|| CoreError::RegisterNotFound(register_id.to_string()))?;
        let entries = entry_repo::list_for_register(&mut *tx, register_id).await?;
        let sales = sale_repo::list_for_register(&mut *tx, register_id).await?;

        let summary = Summary::compute(&register, &entries, &sales);
        let closed = register.close(closing_amount, summary.expected_balance, now)?;

        if !register_repo::mark_closed(&mut *tx, &closed).await? {
            return Err(CoreError::RegisterClosed(register_id.to_string()).into());
        }

        debug!(
            register_id = %register_id,
            entries = entries.len(),
            sales = sales.len(),
            "Close summary computed"
        );

        Ok((tx, CloseReport::new(closed, summary)?))
    }

    // =========================================================================
    // Entry Ledger
    // =========================================================================

    /// Appends a manual income/expense entry to an open register.
    ///
    /// ## Errors
    /// - `Validation` for a non-positive amount or empty description
    /// - `RegisterNotFound` / `RegisterClosed`
    pub async fn add_entry(&self, register_id: &str, input: NewEntry) -> DbResult<Entry> {
        input.validate()?;

        let entry = self
            .commit_staged("add_entry", self.stage_entry(register_id, &input))
            .await?;

        debug!(
            entry_id = %entry.id,
            register_id = %register_id,
            entry_type = ?entry.entry_type,
            amount = %entry.amount(),
            "Entry recorded"
        );
        self.emit(RegisterEvent::EntryAdded(entry.clone()));

        Ok(entry)
    }

    async fn stage_entry(&self, register_id: &str, input: &NewEntry) -> DbResult<Staged<Entry>> {
        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let claimed =
            register_repo::claim_open(&mut *tx, DEFAULT_TENANT_ID, Some(register_id), now).await?;
        if claimed.is_none() {
            tx.rollback().await?;
            return Err(self.not_open_error(register_id).await);
        }

        let register = register_repo::fetch(&mut *tx, register_id)
            .await?
            .ok_or_else(|| CoreError::RegisterNotFound(register_id.to_string()))?;
        let entry = Entry::record(Uuid::new_v4().to_string(), &register, input, now)?;

        entry_repo::insert(&mut *tx, &entry).await?;

        Ok((tx, entry))
    }

    // =========================================================================
    // Sale Aggregator
    // =========================================================================

    /// Commits a sale and stamps it with the open register atomically.
    ///
    /// A submission pinned to a register (`for_register`) is only accepted
    /// while that register is open.
    ///
    /// ## Errors
    /// - `Validation` when the checkout amounts disagree with each other
    /// - `NoOpenRegister` when nothing is open
    /// - `RegisterClosed` / `RegisterNotFound` for a pinned register
    pub async fn commit_sale(&self, submission: SaleSubmission) -> DbResult<Sale> {
        submission.checkout.validate()?;

        let sale = self
            .commit_staged("commit_sale", self.stage_sale(&submission))
            .await?;

        info!(
            sale_id = %sale.id,
            register_id = ?sale.register_id,
            channel = ?sale.channel,
            payment_method = ?sale.payment_method,
            total = %sale.total(),
            "Sale committed"
        );
        self.emit(RegisterEvent::SaleCommitted(sale.clone()));

        Ok(sale)
    }

    async fn stage_sale(&self, submission: &SaleSubmission) -> DbResult<Staged<Sale>> {
        let now = Utc::now();
        let pinned = submission.register_id.as_deref();
        let mut tx = self.db.pool().begin().await?;

        let claimed = register_repo::claim_open(&mut *tx, DEFAULT_TENANT_ID, pinned, now).await?;
        let register_id = match claimed {
            Some(id) => id,
            None => {
                tx.rollback().await?;
                return Err(match pinned {
                    Some(id) => self.not_open_error(id).await,
                    None => CoreError::NoOpenRegister.into(),
                });
            }
        };

        let sale_id = Uuid::new_v4().to_string();
        let (sale, items) = submission.build(&sale_id, DEFAULT_TENANT_ID, &register_id, now, || {
            Uuid::new_v4().to_string()
        })?;

        sale_repo::insert_sale(&mut *tx, &sale).await?;
        for item in &items {
            sale_repo::insert_item(&mut *tx, item).await?;
        }

        Ok((tx, sale))
    }

    /// Cancels a sale while its register is still open.
    ///
    /// Cancelling an already cancelled sale returns it unchanged.
    ///
    /// ## Errors
    /// - `SaleNotFound`
    /// - `RegisterClosed` once the sale's register has closed
    pub async fn cancel_sale(&self, sale_id: &str) -> DbResult<Sale> {
        let (cancelled, sale) = self
            .commit_staged("cancel_sale", self.stage_cancel(sale_id))
            .await?;

        if cancelled {
            info!(sale_id = %sale_id, total = %sale.total(), "Sale cancelled");
            self.emit(RegisterEvent::SaleCancelled(sale.clone()));
        }

        Ok(sale)
    }

    async fn stage_cancel(&self, sale_id: &str) -> DbResult<Staged<(bool, Sale)>> {
        let mut tx = self.db.pool().begin().await?;

        let cancelled = sale_repo::cancel_if_open(&mut *tx, sale_id, Utc::now()).await?;
        let sale = sale_repo::fetch(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        if cancelled || sale.is_cancelled {
            return Ok((tx, (cancelled, sale)));
        }

        let err = match sale.register_id {
            Some(register_id) => CoreError::RegisterClosed(register_id),
            None => CoreError::NoOpenRegister,
        };
        Err(err.into())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Live summary of a register (open or closed).
    ///
    /// Reads one consistent snapshot; may lag a commit in flight.
    pub async fn get_summary(&self, register_id: &str) -> DbResult<Summary> {
        self.read("get_summary", || self.load_summary(register_id))
            .await
    }

    async fn load_summary(&self, register_id: &str) -> DbResult<Summary> {
        let (register, entries, sales) = self.load_history(register_id).await?;
        Ok(Summary::compute(&register, &entries, &sales))
    }

    /// Recomputes the immutable snapshot of a closed register.
    pub async fn close_report(&self, register_id: &str) -> DbResult<CloseReport> {
        self.read("close_report", || self.load_close_report(register_id))
            .await
    }

    async fn load_close_report(&self, register_id: &str) -> DbResult<CloseReport> {
        let (register, entries, sales) = self.load_history(register_id).await?;
        if register.is_open() {
            return Err(DbError::not_found("Close report", register_id));
        }

        let summary = Summary::compute(&register, &entries, &sales);
        Ok(CloseReport::new(register, summary)?)
    }

    async fn load_history(&self, register_id: &str) -> DbResult<(Register, Vec<Entry>, Vec<Sale>)> {
        let mut tx = self.db.pool().begin().await?;

        let register = register_repo::fetch(&mut *tx, register_id)
            .await?
            .ok_or_else(|| CoreError::RegisterNotFound(register_id.to_string()))?;
        let entries = entry_repo::list_for_register(&mut *tx, register_id).await?;
        let sales = sale_repo::list_for_register(&mut *tx, register_id).await?;

        tx.commit().await?;
        Ok((register, entries, sales))
    }

    /// True while a register is open.
    pub async fn is_open(&self) -> DbResult<bool> {
        Ok(self.current_register().await?.is_some())
    }

    /// The open register, if any.
    pub async fn current_register(&self) -> DbResult<Option<Register>> {
        self.read("current_register", || {
            register_repo::fetch_open(self.db.pool(), DEFAULT_TENANT_ID)
        })
        .await
    }

    pub async fn get_register(&self, register_id: &str) -> DbResult<Register> {
        self.read("get_register", || self.fetch_register(register_id))
            .await
    }

    async fn fetch_register(&self, register_id: &str) -> DbResult<Register> {
        register_repo::fetch(self.db.pool(), register_id)
            .await?
            .ok_or_else(|| CoreError::RegisterNotFound(register_id.to_string()).into())
    }

    pub async fn list_entries(&self, register_id: &str) -> DbResult<Vec<Entry>> {
        self.read("list_entries", || {
            entry_repo::list_for_register(self.db.pool(), register_id)
        })
        .await
    }

    pub async fn list_sales(&self, register_id: &str) -> DbResult<Vec<Sale>> {
        self.read("list_sales", || {
            sale_repo::list_for_register(self.db.pool(), register_id)
        })
        .await
    }

    pub async fn list_sale_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        self.read("list_sale_items", || {
            sale_repo::list_items(self.db.pool(), sale_id)
        })
        .await
    }

    /// Most recently opened registers first.
    pub async fn list_registers(&self, limit: u32) -> DbResult<Vec<Register>> {
        self.read("list_registers", || {
            register_repo::list_recent(self.db.pool(), DEFAULT_TENANT_ID, limit)
        })
        .await
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// Explains why a claim on `register_id` found nothing open.
    async fn not_open_error(&self, register_id: &str) -> DbError {
        match register_repo::fetch(self.db.pool(), register_id).await {
            Ok(Some(register)) if register.tenant_id == DEFAULT_TENANT_ID => {
                CoreError::RegisterClosed(register.id).into()
            }
            Ok(_) => CoreError::RegisterNotFound(register_id.to_string()).into(),
            Err(e) => e,
        }
    }

    /// Bounds a store call by the operation timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = DbResult<T>>,
    ) -> DbResult<T> {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                let ms = u64::try_from(self.operation_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(operation, timeout_ms = ms, "Store call timed out");
                Err(DbError::Timeout(ms))
            }
        }
    }

    /// Stages a mutation under the operation timeout, then commits it.
    ///
    /// The deadline never races COMMIT: a `Timeout` here comes from the
    /// staging future, whose transaction is rolled back on drop.
    async fn commit_staged<T>(
        &self,
        operation: &'static str,
        stage: impl Future<Output = DbResult<Staged<T>>>,
    ) -> DbResult<T> {
        let (tx, value) = self.bounded(operation, stage).await?;
        tx.commit().await?;
        Ok(value)
    }

    /// Bounded, retried read.
    async fn read<T, F, Fut>(&self, operation: &'static str, mut op: F) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        self.read_retry
            .run(operation, || self.bounded(operation, op()))
            .await
    }

    fn emit(&self, event: RegisterEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::new_product;
    use crate::DbConfig;
    use caixa_core::{
        Cart, CartDiscount, Channel, Classification, DiscountRate, EntryType, PaymentMethod,
        ValidationError, Weight,
    };

    async fn setup() -> CashRegister {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.cash_register()
    }

    fn cash_entry(entry_type: EntryType, cents: i64, description: &str) -> NewEntry {
        NewEntry {
            entry_type,
            amount: Money::from_cents(cents),
            description: description.to_string(),
            payment_method: PaymentMethod::Cash,
        }
    }

    fn cash_sale(cents: i64) -> SaleSubmission {
        SaleSubmission::manual(Money::from_cents(cents), PaymentMethod::Cash)
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_requires_positive_amount() {
        let service = setup().await;

        let err = service.open_register(Money::zero()).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert!(!service.is_open().await.unwrap());
    }

    #[tokio::test]
    async fn test_second_open_conflicts() {
        let service = setup().await;

        let register = service.open_register(Money::from_cents(10_000)).await.unwrap();
        assert!(service.is_open().await.unwrap());

        let err = service.open_register(Money::from_cents(5_000)).await.unwrap_err();
        assert!(err.is_conflict());

        let current = service.current_register().await.unwrap().unwrap();
        assert_eq!(current.id, register.id);
    }

    #[tokio::test]
    async fn test_full_session_reconciles() {
        // 100 + 50 cash income + 30 cash sale − 20 cash expense = 160
        let service = setup().await;
        let register = service.open_register(Money::from_cents(10_000)).await.unwrap();

        service
            .add_entry(&register.id, cash_entry(EntryType::Income, 5_000, "Troco extra"))
            .await
            .unwrap();
        service.commit_sale(cash_sale(3_000)).await.unwrap();
        service
            .add_entry(&register.id, cash_entry(EntryType::Expense, 2_000, "Gelo"))
            .await
            .unwrap();

        let summary = service.get_summary(&register.id).await.unwrap();
        assert_eq!(summary.expected_balance.cents(), 16_000);
        assert_eq!(summary.manual_total.cents(), 3_000);

        let report = service
            .close_register(&register.id, Money::from_cents(15_000))
            .await
            .unwrap();

        assert_eq!(report.difference.cents(), -1_000);
        assert_eq!(report.classification, Classification::Shortage);
        assert_eq!(report.summary.expected_balance.cents(), 16_000);
        assert!(!report.register.is_open());
        assert_eq!(report.register.difference_cents, Some(-1_000));

        assert!(!service.is_open().await.unwrap());
        let stored = service.get_register(&register.id).await.unwrap();
        assert_eq!(stored.closing_amount_cents, Some(15_000));
    }

    #[tokio::test]
    async fn test_exact_close() {
        let service = setup().await;
        let register = service.open_register(Money::from_cents(10_000)).await.unwrap();
        service.commit_sale(cash_sale(2_500)).await.unwrap();

        let report = service
            .close_register(&register.id, Money::from_cents(12_500))
            .await
            .unwrap();

        assert!(report.difference.is_zero());
        assert_eq!(report.classification, Classification::Exact);
    }

    #[tokio::test]
    async fn test_close_errors() {
        let service = setup().await;

        let err = service
            .close_register("missing", Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::RegisterNotFound(_))));

        let register = service.open_register(Money::from_cents(10_000)).await.unwrap();

        let err = service
            .close_register(&register.id, Money::from_cents(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert!(service.is_open().await.unwrap());

        service
            .close_register(&register.id, Money::zero())
            .await
            .unwrap();
        let err = service
            .close_register(&register.id, Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::RegisterClosed(_))));
    }

    #[tokio::test]
    async fn test_reopen_after_close_creates_new_register() {
        let service = setup().await;
        let first = service.open_register(Money::from_cents(10_000)).await.unwrap();
        service.close_register(&first.id, Money::from_cents(10_000)).await.unwrap();

        let second = service.open_register(Money::from_cents(8_000)).await.unwrap();
        assert_ne!(first.id, second.id);

        let registers = service.list_registers(10).await.unwrap();
        assert_eq!(registers.len(), 2);
        assert!(registers.iter().filter(|r| r.is_open()).count() == 1);
    }

    #[tokio::test]
    async fn test_entry_rules() {
        let service = setup().await;
        let register = service.open_register(Money::from_cents(10_000)).await.unwrap();

        let err = service
            .add_entry(&register.id, cash_entry(EntryType::Income, 0, "Nada"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let err = service
            .add_entry(&register.id, cash_entry(EntryType::Income, 100, "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let err = service
            .add_entry("missing", cash_entry(EntryType::Income, 100, "Troco"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::RegisterNotFound(_))));

        service.close_register(&register.id, Money::zero()).await.unwrap();

        let err = service
            .add_entry(&register.id, cash_entry(EntryType::Income, 100, "Troco"))
            .await
            .unwrap_err();
        assert!(err.is_closed_register());
        assert!(service.list_entries(&register.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sale_after_close_is_rejected() {
        let service = setup().await;
        let register = service.open_register(Money::from_cents(10_000)).await.unwrap();
        let pinned = cash_sale(1_000).for_register(register.id.clone());

        service.commit_sale(cash_sale(500)).await.unwrap();
        service
            .close_register(&register.id, Money::from_cents(10_500))
            .await
            .unwrap();

        let err = service.commit_sale(pinned).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::RegisterClosed(_))));

        let err = service.commit_sale(cash_sale(700)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NoOpenRegister)));

        let sales = service.list_sales(&register.id).await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].total_cents, 500);
    }

    #[tokio::test]
    async fn test_cart_sale_is_persisted_with_items() {
        let service = setup().await;
        let register = service.open_register(Money::from_cents(10_000)).await.unwrap();

        let cheese = new_product(DEFAULT_TENANT_ID, "Queijo", true, 5_000);
        let bread = new_product(DEFAULT_TENANT_ID, "Pao", false, 2_000);

        let mut cart = Cart::new();
        cart.add_item(&cheese, 1, Some(Weight::from_grams(300))).unwrap();
        cart.add_item(&bread, 1, None).unwrap();
        cart.apply_item_discount(&bread.id, Money::from_cents(500)).unwrap();

        // (1500 + 1500) − 10% = 2700
        let checkout = cart
            .checkout(Some(CartDiscount::Percentage(DiscountRate::from_bps(1_000))))
            .unwrap();
        let submission =
            SaleSubmission::from_checkout(Channel::Delivery, PaymentMethod::Pix, checkout);

        let sale = service.commit_sale(submission).await.unwrap();
        assert_eq!(sale.register_id.as_deref(), Some(register.id.as_str()));
        assert_eq!(sale.subtotal_cents, 3_000);
        assert_eq!(sale.discount_cents, 300);
        assert_eq!(sale.total_cents, 2_700);

        let items = service.list_sale_items(&sale.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].weight_grams, Some(300));
        assert_eq!(items[0].subtotal_cents, 1_500);
        assert_eq!(items[1].discount_cents, 500);

        let summary = service.get_summary(&register.id).await.unwrap();
        assert_eq!(summary.delivery_total.cents(), 2_700);
        assert_eq!(summary.by_method(PaymentMethod::Pix).cents(), 2_700);
        // Pix never reaches the drawer
        assert_eq!(summary.expected_balance.cents(), 10_000);
    }

    #[tokio::test]
    async fn test_cancelled_sale_leaves_aggregates() {
        let service = setup().await;
        let register = service.open_register(Money::from_cents(10_000)).await.unwrap();

        let kept = service.commit_sale(cash_sale(1_000)).await.unwrap();
        let voided = service.commit_sale(cash_sale(4_000)).await.unwrap();

        let cancelled = service.cancel_sale(&voided.id).await.unwrap();
        assert!(cancelled.is_cancelled);
        assert!(cancelled.cancelled_at.is_some());
        // Idempotent
        assert!(service.cancel_sale(&voided.id).await.unwrap().is_cancelled);

        let summary = service.get_summary(&register.id).await.unwrap();
        assert_eq!(summary.manual_total, kept.total());
        assert_eq!(summary.expected_balance.cents(), 11_000);
        assert_eq!(summary.cancelled_count, 1);

        let err = service.cancel_sale("missing").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SaleNotFound(_))));

        service.close_register(&register.id, Money::from_cents(11_000)).await.unwrap();
        let err = service.cancel_sale(&kept.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::RegisterClosed(_))));
    }

    #[tokio::test]
    async fn test_close_report_matches_close() {
        let service = setup().await;
        let register = service.open_register(Money::from_cents(5_000)).await.unwrap();
        service.commit_sale(cash_sale(1_234)).await.unwrap();

        assert!(service.close_report(&register.id).await.is_err());

        let closed = service
            .close_register(&register.id, Money::from_cents(6_300))
            .await
            .unwrap();
        let report = service.close_report(&register.id).await.unwrap();

        assert_eq!(report.summary, closed.summary);
        assert_eq!(report.difference, closed.difference);
        assert_eq!(report.difference.cents(), 66);
        assert_eq!(report.classification, Classification::Surplus);
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let service = setup().await;
        let mut events = service.subscribe();

        let register = service.open_register(Money::from_cents(1_000)).await.unwrap();
        service.commit_sale(cash_sale(200)).await.unwrap();
        service.close_register(&register.id, Money::from_cents(1_200)).await.unwrap();

        assert!(matches!(events.recv().await.unwrap(), RegisterEvent::Opened(r) if r.id == register.id));
        assert!(matches!(events.recv().await.unwrap(), RegisterEvent::SaleCommitted(_)));
        match events.recv().await.unwrap() {
            RegisterEvent::Closed(report) => assert_eq!(report.classification, Classification::Exact),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_event_json_shape() {
        let service = setup().await;
        let register = service.open_register(Money::from_cents(1_000)).await.unwrap();

        let json = serde_json::to_value(RegisterEvent::Opened(register.clone())).unwrap();
        assert_eq!(json["type"], "opened");
        assert_eq!(json["data"]["id"], register.id.as_str());
        assert_eq!(json["data"]["opening_amount_cents"], 1_000);
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let service = setup().await;
        let service = CashRegister::new(
            service.db.clone(),
            Duration::from_millis(5),
            RetryPolicy::none(),
        );

        let result: DbResult<()> = service
            .bounded("sleep", async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, DbError::Timeout(5)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_mutation_timing_out_before_commit_writes_nothing() {
        let service = setup().await;
        let register = service.open_register(Money::from_cents(10_000)).await.unwrap();
        let slow = CashRegister::new(
            service.db.clone(),
            Duration::from_millis(20),
            RetryPolicy::none(),
        );
        let input = cash_entry(EntryType::Income, 500, "Troco");

        let result = slow
            .commit_staged("add_entry", async {
                let staged = slow.stage_entry(&register.id, &input).await?;
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok::<_, DbError>(staged)
            })
            .await;

        assert!(matches!(result, Err(DbError::Timeout(20))));
        assert!(service.list_entries(&register.id).await.unwrap().is_empty());

        // Retrying after the timeout records the entry exactly once
        service.add_entry(&register.id, input).await.unwrap();
        assert_eq!(service.list_entries(&register.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tight_deadlines_never_report_failure_for_stored_entries() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("deadline.db"))
            .max_connections(4)
            .busy_timeout(Duration::from_secs(5));
        let db = Database::new(config).await.unwrap();
        let service = db.cash_register();
        let register = service.open_register(Money::from_cents(10_000)).await.unwrap();

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        for i in 0..400u64 {
            let tight = CashRegister::new(
                db.clone(),
                Duration::from_micros(50 + (i % 40) * 25),
                RetryPolicy::none(),
            );
            match tight
                .add_entry(&register.id, cash_entry(EntryType::Income, 100, "Troco"))
                .await
            {
                Ok(_) => succeeded += 1,
                Err(e) => {
                    assert!(e.is_transient(), "unexpected error: {e}");
                    failed += 1;
                }
            }
        }

        assert_eq!(succeeded + failed, 400);
        let stored = service.list_entries(&register.id).await.unwrap();
        assert_eq!(stored.len(), succeeded);
    }

    #[tokio::test]
    async fn test_inconsistent_checkout_is_rejected() {
        let service = setup().await;
        let register = service.open_register(Money::from_cents(10_000)).await.unwrap();

        let mut cart = Cart::new();
        let water = new_product(DEFAULT_TENANT_ID, "Agua", false, 350);
        cart.add_item(&water, 2, None).unwrap();
        let mut checkout = cart.checkout(None).unwrap();
        checkout.total = Money::from_cents(1);

        let err = service
            .commit_sale(SaleSubmission::from_checkout(
                Channel::Pos,
                PaymentMethod::Cash,
                checkout,
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Mismatch { .. }))
        ));
        assert!(service.list_sales(&register.id).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_open_race_has_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("race.db"))
            .max_connections(4)
            .busy_timeout(Duration::from_secs(5));
        let db = Database::new(config).await.unwrap();
        let service = db.cash_register();

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.open_register(Money::from_cents(1_000 + i)).await
            }));
        }

        let mut opened = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => opened += 1,
                Err(e) if e.is_conflict() => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(opened, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(
            service
                .list_registers(10)
                .await
                .unwrap()
                .iter()
                .filter(|r| r.is_open())
                .count(),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sales_racing_close_are_counted_or_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("close.db"))
            .max_connections(4)
            .busy_timeout(Duration::from_secs(5));
        let db = Database::new(config).await.unwrap();
        let service = db.cash_register();
        let register = service.open_register(Money::from_cents(10_000)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..6 {
            let service = service.clone();
            handles.push(tokio::spawn(async move { service.commit_sale(cash_sale(100)).await }));
        }
        let report = service
            .close_register(&register.id, Money::from_cents(10_000))
            .await
            .unwrap();

        let mut committed = 0i64;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(sale) => {
                    assert_eq!(sale.register_id.as_deref(), Some(register.id.as_str()));
                    committed += 1;
                }
                Err(e) => assert!(e.is_closed_register(), "unexpected error: {e}"),
            }
        }

        let stored = service.list_sales(&register.id).await.unwrap();
        assert_eq!(stored.len() as i64, committed);
        // Every attributed sale made it into the close-time summary
        assert_eq!(report.summary.manual_count as i64, committed);
        assert_eq!(report.summary.expected_balance.cents(), 10_000 + 100 * committed);
    }
}
