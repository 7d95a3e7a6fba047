//! # Register Repository
//!
//! Database operations for register sessions.
//!
//! ## Open-Register Claim
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every mutation that depends on "the register is open" starts with     │
//! │  claim_open(), an UPDATE ... WHERE closed_at IS NULL RETURNING id.     │
//! │                                                                         │
//! │   tx A (close)                    tx B (sale commit)                   │
//! │   ────────────                    ──────────────────                   │
//! │   claim_open(r1) → r1  ◄ lock     claim_open(None) … waits on lock     │
//! │   load entries/sales                                                   │
//! │   mark_closed(r1)                                                      │
//! │   COMMIT ──────────────► unlock   claim_open(None) → None              │
//! │                                   → NoOpenRegister / RegisterClosed    │
//! │                                                                         │
//! │  Being the first statement of the transaction, the claim takes the     │
//! │  write lock before any read, so no transaction decides on a stale      │
//! │  snapshot.                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;
use tracing::debug;

use caixa_core::Register;

use crate::error::DbResult;

// =============================================================================
// Executor-generic queries (usable on the pool or inside a transaction)
// =============================================================================

/// Inserts a new open register.
///
/// A second open register for the tenant violates `idx_registers_one_open`,
/// which surfaces as `CoreError::RegisterConflict`.
pub(crate) async fn insert<'e>(
    executor: impl SqliteExecutor<'e>,
    register: &Register,
) -> DbResult<()> {
    debug!(id = %register.id, opening = register.opening_amount_cents, "Inserting register");

    sqlx::query(
        r#"
        INSERT INTO registers (
            id, tenant_id, opened_at, opening_amount_cents,
            closed_at, closing_amount_cents, difference_cents, updated_at
        ) VALUES (?1, ?2, ?3, ?4, NULL, NULL, NULL, ?3)
        "#,
    )
    .bind(&register.id)
    .bind(&register.tenant_id)
    .bind(register.opened_at)
    .bind(register.opening_amount_cents)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn fetch<'e>(
    executor: impl SqliteExecutor<'e>,
    id: &str,
) -> DbResult<Option<Register>> {
    let register = sqlx::query_as::<_, Register>(
        r#"
        SELECT id, tenant_id, opened_at, opening_amount_cents,
               closed_at, closing_amount_cents, difference_cents
        FROM registers
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(register)
}

pub(crate) async fn fetch_open<'e>(
    executor: impl SqliteExecutor<'e>,
    tenant_id: &str,
) -> DbResult<Option<Register>> {
    let register = sqlx::query_as::<_, Register>(
        r#"
        SELECT id, tenant_id, opened_at, opening_amount_cents,
               closed_at, closing_amount_cents, difference_cents
        FROM registers
        WHERE tenant_id = ?1 AND closed_at IS NULL
        "#,
    )
    .bind(tenant_id)
    .fetch_optional(executor)
    .await?;

    Ok(register)
}

pub(crate) async fn list_recent<'e>(
    executor: impl SqliteExecutor<'e>,
    tenant_id: &str,
    limit: u32,
) -> DbResult<Vec<Register>> {
    let registers = sqlx::query_as::<_, Register>(
        r#"
        SELECT id, tenant_id, opened_at, opening_amount_cents,
               closed_at, closing_amount_cents, difference_cents
        FROM registers
        WHERE tenant_id = ?1
        ORDER BY opened_at DESC, rowid DESC
        LIMIT ?2
        "#,
    )
    .bind(tenant_id)
    .bind(i64::from(limit))
    .fetch_all(executor)
    .await?;

    Ok(registers)
}

/// Locks the open register for the rest of the transaction.
///
/// With `register_id = None` any open register of the tenant is claimed.
/// Returns the claimed id, or `None` if no matching register is open.
pub(crate) async fn claim_open<'e>(
    executor: impl SqliteExecutor<'e>,
    tenant_id: &str,
    register_id: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<Option<String>> {
    let claimed: Option<String> = sqlx::query_scalar(
        r#"
        UPDATE registers
        SET updated_at = ?1
        WHERE tenant_id = ?2
          AND closed_at IS NULL
          AND (?3 IS NULL OR id = ?3)
        RETURNING id
        "#,
    )
    .bind(now)
    .bind(tenant_id)
    .bind(register_id)
    .fetch_optional(executor)
    .await?;

    Ok(claimed)
}

/// Persists the OPEN → CLOSED transition.
///
/// Returns false if the register was no longer open.
pub(crate) async fn mark_closed<'e>(
    executor: impl SqliteExecutor<'e>,
    closed: &Register,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE registers SET
            closed_at = ?2,
            closing_amount_cents = ?3,
            difference_cents = ?4,
            updated_at = ?2
        WHERE id = ?1 AND closed_at IS NULL
        "#,
    )
    .bind(&closed.id)
    .bind(closed.closed_at)
    .bind(closed.closing_amount_cents)
    .bind(closed.difference_cents)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}
