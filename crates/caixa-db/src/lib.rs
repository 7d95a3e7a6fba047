//! # caixa-db: Storage and Register Service for Caixa
//!
//! This crate persists registers, ledger entries and sales in SQLite and
//! exposes [`CashRegister`], the service every terminal and the delivery
//! flow talks to.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Caixa Data Flow                                │
//! │                                                                         │
//! │  Terminal checkout / delivery flow / manual entry                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     caixa-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ CashRegister  │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (service)     │───►│ register      │    │  (embedded)  │  │   │
//! │  │   │               │    │ entry         │    │              │  │   │
//! │  │   │ timeouts      │    │ sale          │    │ 001_init.sql │  │   │
//! │  │   │ read retries  │    │ ProductRepo   │    │              │  │   │
//! │  │   │ events        │    └───────┬───────┘    └──────────────┘  │   │
//! │  │   └───────────────┘            │                                │   │
//! │  │                       ┌────────▼───────┐                        │   │
//! │  │                       │ Database (pool)│                        │   │
//! │  │                       └────────────────┘                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  │   one open register per tenant enforced by a partial index      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`cash_register`] - Register lifecycle, ledger and sale attribution
//! - [`config`] - `caixa.toml` + environment configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`retry`] - Bounded backoff for read-only queries
//! - [`scale`] - Freshness-filtered scale readings
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caixa_db::{CaixaConfig, Database};
//!
//! let config = CaixaConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let register = db.cash_register();
//!
//! let open = register.open_register(Money::from_cents(10_000)).await?;
//! let report = register.close_register(&open.id, Money::from_cents(10_000)).await?;
//! ```

use tracing_subscriber::EnvFilter;

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cash_register;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod retry;
pub mod scale;

// =============================================================================
// Re-exports
// =============================================================================

pub use cash_register::{CashRegister, RegisterEvent};
pub use config::CaixaConfig;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use retry::RetryPolicy;
pub use scale::ScaleReader;

pub use repository::product::ProductRepository;

/// Initializes the tracing subscriber for binaries embedding the register.
///
/// `RUST_LOG` overrides the default filter. Calling it twice is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,caixa=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
