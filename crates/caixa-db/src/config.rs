//! # Caixa Configuration
//!
//! Runtime settings for the database, the register service and the scale.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CAIXA_DB_PATH=/var/lib/caixa/caixa.db                              │
//! │     CAIXA_OPERATION_TIMEOUT_MS=5000                                    │
//! │     CAIXA_READ_RETRIES=3                                               │
//! │     CAIXA_WEIGHT_FRESHNESS_SECS=4                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pos/caixa.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.caixa.pos/caixa.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "caixa.db"
//! max_connections = 5
//! busy_timeout_ms = 2000
//! operation_timeout_ms = 5000
//!
//! [register]
//! read_retries = 3
//! initial_backoff_ms = 50
//! max_backoff_ms = 1000
//!
//! [scale]
//! freshness_secs = 4
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use caixa_core::DEFAULT_WEIGHT_FRESHNESS_SECS;

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;
use crate::retry::RetryPolicy;

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// How long SQLite waits on a locked database before returning BUSY.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,

    /// Upper bound on every store call made by the register service.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("caixa.db")
}
fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_busy_timeout() -> u64 {
    2_000
}
fn default_operation_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            busy_timeout_ms: default_busy_timeout(),
            operation_timeout_ms: default_operation_timeout(),
        }
    }
}

// =============================================================================
// Register Settings
// =============================================================================

/// `[register]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterSettings {
    /// Extra attempts for read-only queries that fail transiently.
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_read_retries() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    50
}
fn default_max_backoff() -> u64 {
    1_000
}

impl Default for RegisterSettings {
    fn default() -> Self {
        RegisterSettings {
            read_retries: default_read_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

// =============================================================================
// Scale Settings
// =============================================================================

/// `[scale]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleSettings {
    /// Readings older than this are discarded.
    #[serde(default = "default_freshness")]
    pub freshness_secs: u64,
}

fn default_freshness() -> u64 {
    DEFAULT_WEIGHT_FRESHNESS_SECS
}

impl Default for ScaleSettings {
    fn default() -> Self {
        ScaleSettings {
            freshness_secs: default_freshness(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Caixa configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaixaConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub register: RegisterSettings,

    #[serde(default)]
    pub scale: ScaleSettings,
}

impl CaixaConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (caixa.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading caixa config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::InvalidConfig("database.path must be set".into()));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(DbError::InvalidConfig(
                "database.min_connections cannot exceed max_connections".into(),
            ));
        }

        if self.database.operation_timeout_ms == 0 {
            return Err(DbError::InvalidConfig(
                "database.operation_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.scale.freshness_secs == 0 {
            return Err(DbError::InvalidConfig(
                "scale.freshness_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("CAIXA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(value) = std::env::var("CAIXA_OPERATION_TIMEOUT_MS") {
            match value.parse::<u64>() {
                Ok(ms) => self.database.operation_timeout_ms = ms,
                Err(_) => warn!(value = %value, "Ignoring invalid CAIXA_OPERATION_TIMEOUT_MS"),
            }
        }

        if let Ok(value) = std::env::var("CAIXA_READ_RETRIES") {
            match value.parse::<u32>() {
                Ok(n) => self.register.read_retries = n,
                Err(_) => warn!(value = %value, "Ignoring invalid CAIXA_READ_RETRIES"),
            }
        }

        if let Ok(value) = std::env::var("CAIXA_WEIGHT_FRESHNESS_SECS") {
            match value.parse::<u64>() {
                Ok(secs) => self.scale.freshness_secs = secs,
                Err(_) => warn!(value = %value, "Ignoring invalid CAIXA_WEIGHT_FRESHNESS_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "caixa", "pos")
            .map(|dirs| dirs.config_dir().join("caixa.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Pool settings for [`Database::new`](crate::Database::new).
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
            .operation_timeout(Duration::from_millis(self.database.operation_timeout_ms))
    }

    /// Retry policy for read-only queries.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.register.read_retries,
            initial_backoff: Duration::from_millis(self.register.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.register.max_backoff_ms),
        }
    }

    /// Scale reading freshness window.
    pub fn weight_freshness(&self) -> Duration {
        Duration::from_secs(self.scale.freshness_secs)
    }
}
