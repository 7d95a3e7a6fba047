//! # Entry Repository
//!
//! Append-only storage for manual ledger entries. There is deliberately no
//! update or delete: the ledger is the drawer's audit trail.

use sqlx::SqliteExecutor;
use tracing::debug;

use caixa_core::Entry;

use crate::error::DbResult;

pub(crate) async fn insert<'e>(executor: impl SqliteExecutor<'e>, entry: &Entry) -> DbResult<()> {
    debug!(
        id = %entry.id,
        register_id = %entry.register_id,
        entry_type = ?entry.entry_type,
        amount = entry.amount_cents,
        "Inserting register entry"
    );

    sqlx::query(
        r#"
        INSERT INTO register_entries (
            id, register_id, entry_type, amount_cents,
            description, payment_method, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.register_id)
    .bind(entry.entry_type)
    .bind(entry.amount_cents)
    .bind(&entry.description)
    .bind(entry.payment_method)
    .bind(entry.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn list_for_register<'e>(
    executor: impl SqliteExecutor<'e>,
    register_id: &str,
) -> DbResult<Vec<Entry>> {
    let entries = sqlx::query_as::<_, Entry>(
        r#"
        SELECT id, register_id, entry_type, amount_cents,
               description, payment_method, created_at
        FROM register_entries
        WHERE register_id = ?1
        ORDER BY created_at, rowid
        "#,
    )
    .bind(register_id)
    .fetch_all(executor)
    .await?;

    Ok(entries)
}
