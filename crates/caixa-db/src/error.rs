//! # Database Error Types
//!
//! Error types for database operations and the register service.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          Domain rule (caixa_core::CoreError)│
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  DbError (this module) ◄──── DbError::Domain(CoreError)                 │
//! │       │                                                                 │
//! │       │  UNIQUE(registers.tenant_id) ──► Domain(RegisterConflict)       │
//! │       │  SQLITE_BUSY / locked        ──► Busy      (transient)          │
//! │       │  tokio timeout               ──► Timeout   (transient)          │
//! │       │  pool acquire timeout        ──► PoolExhausted (transient)      │
//! │       ▼                                                                 │
//! │  Caller decides whether to retry a mutation                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use caixa_core::{CoreError, ValidationError};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// A register, ledger, cart or validation rule was violated.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation not covered by a domain rule.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Entry or sale referencing a register id that does not exist
    /// - Sale item referencing a non-existent sale
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// SQLite kept the write lock past `busy_timeout`.
    #[error("Database is busy: {0}")]
    Busy(String),

    /// A store call did not finish within the operation timeout.
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration: {0}")]
    ConfigLoadFailed(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns true if retrying the same call later may succeed.
    ///
    /// The register service only retries read-only queries on its own;
    /// mutations surface these to the caller. A mutation failing with one of
    /// these was rolled back, so the caller may retry it.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::Timeout(_) | DbError::Busy(_) | DbError::PoolExhausted
        )
    }

    /// The domain error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(err) => Some(err),
            _ => None,
        }
    }

    /// True for a second open attempt or a lost open race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Domain(CoreError::RegisterConflict))
    }

    /// True for writes rejected because the register is closed or missing.
    pub fn is_closed_register(&self) -> bool {
        self.as_domain().is_some_and(CoreError::is_closed_register)
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Index whose violation means "a register is already open".
const OPEN_REGISTER_INDEX_COLUMN: &str = "registers.tenant_id";

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze code/message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                // SQLITE_BUSY (5) and SQLITE_BUSY_SNAPSHOT (517)
                if matches!(code.as_deref(), Some("5") | Some("517"))
                    || msg.contains("database is locked")
                {
                    return DbError::Busy(msg.to_string());
                }

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if let Some(field) = msg.split("UNIQUE constraint failed: ").nth(1) {
                    if field == OPEN_REGISTER_INDEX_COLUMN {
                        DbError::Domain(CoreError::RegisterConflict)
                    } else {
                        DbError::UniqueViolation {
                            field: field.to_string(),
                            value: "unknown".to_string(),
                        }
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for DbError {
    fn from(err: toml::de::Error) -> Self {
        DbError::ConfigLoadFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DbError::Timeout(500).is_transient());
        assert!(DbError::Busy("database is locked".into()).is_transient());
        assert!(DbError::PoolExhausted.is_transient());

        assert!(!DbError::Domain(CoreError::RegisterConflict).is_transient());
        assert!(!DbError::not_found("Register", "x").is_transient());
        assert!(!DbError::QueryFailed("syntax".into()).is_transient());
    }

    #[test]
    fn test_domain_helpers() {
        assert!(DbError::Domain(CoreError::RegisterConflict).is_conflict());
        assert!(DbError::Domain(CoreError::NoOpenRegister).is_closed_register());
        assert!(DbError::Domain(CoreError::RegisterClosed("r".into())).is_closed_register());
        assert!(!DbError::PoolExhausted.is_closed_register());

        let err: DbError = ValidationError::Required {
            field: "description".into(),
        }
        .into();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_domain_error_display_is_transparent() {
        let err = DbError::Domain(CoreError::RegisterConflict);
        assert_eq!(err.to_string(), "A cash register is already open");
    }
}
