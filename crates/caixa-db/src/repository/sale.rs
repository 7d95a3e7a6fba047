//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. COMMIT (one transaction, see CashRegister::commit_sale)            │
//! │     └── claim open register                                            │
//! │     └── insert_sale()  → Sale { register_id: Some(open) }              │
//! │     └── insert_item()  → SaleItem (per cart line)                      │
//! │                                                                         │
//! │  2. (OPTIONAL) CANCEL while the register is still open                 │
//! │     └── cancel_if_open() → Sale { is_cancelled: true }                 │
//! │                                                                         │
//! │  Once the register closes, its sales are frozen.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;
use tracing::debug;

use caixa_core::{Sale, SaleItem};

use crate::error::DbResult;

pub(crate) async fn insert_sale<'e>(executor: impl SqliteExecutor<'e>, sale: &Sale) -> DbResult<()> {
    debug!(
        id = %sale.id,
        register_id = ?sale.register_id,
        channel = ?sale.channel,
        total = sale.total_cents,
        "Inserting sale"
    );

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, tenant_id, register_id, channel, payment_method,
            subtotal_cents, discount_cents, total_cents,
            is_cancelled, created_at, cancelled_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.tenant_id)
    .bind(&sale.register_id)
    .bind(sale.channel)
    .bind(sale.payment_method)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.total_cents)
    .bind(sale.is_cancelled)
    .bind(sale.created_at)
    .bind(sale.cancelled_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Snapshot pattern: name and pricing are copied so later catalog edits
/// never rewrite sale history.
pub(crate) async fn insert_item<'e>(
    executor: impl SqliteExecutor<'e>,
    item: &SaleItem,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, name_snapshot, quantity, weight_grams,
            base_cents, discount_cents, subtotal_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.name_snapshot)
    .bind(item.quantity)
    .bind(item.weight_grams)
    .bind(item.base_cents)
    .bind(item.discount_cents)
    .bind(item.subtotal_cents)
    .bind(item.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn fetch<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(
        r#"
        SELECT id, tenant_id, register_id, channel, payment_method,
               subtotal_cents, discount_cents, total_cents,
               is_cancelled, created_at, cancelled_at
        FROM sales
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(sale)
}

pub(crate) async fn list_for_register<'e>(
    executor: impl SqliteExecutor<'e>,
    register_id: &str,
) -> DbResult<Vec<Sale>> {
    let sales = sqlx::query_as::<_, Sale>(
        r#"
        SELECT id, tenant_id, register_id, channel, payment_method,
               subtotal_cents, discount_cents, total_cents,
               is_cancelled, created_at, cancelled_at
        FROM sales
        WHERE register_id = ?1
        ORDER BY created_at, rowid
        "#,
    )
    .bind(register_id)
    .fetch_all(executor)
    .await?;

    Ok(sales)
}

/// Lines of a sale in insertion order.
pub(crate) async fn list_items<'e>(
    executor: impl SqliteExecutor<'e>,
    sale_id: &str,
) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(
        r#"
        SELECT id, sale_id, product_id, name_snapshot, quantity, weight_grams,
               base_cents, discount_cents, subtotal_cents, created_at
        FROM sale_items
        WHERE sale_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(sale_id)
    .fetch_all(executor)
    .await?;

    Ok(items)
}

/// Flags a sale cancelled if it is active and its register is still open.
///
/// One statement, so the open check and the write are atomic.
pub(crate) async fn cancel_if_open<'e>(
    executor: impl SqliteExecutor<'e>,
    id: &str,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sales SET
            is_cancelled = 1,
            cancelled_at = ?2
        WHERE id = ?1
          AND is_cancelled = 0
          AND register_id IN (SELECT id FROM registers WHERE closed_at IS NULL)
        "#,
    )
    .bind(id)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}
