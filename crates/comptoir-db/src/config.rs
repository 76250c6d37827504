//! # Ledger Configuration
//!
//! Configuration for the database pool and ledger defaults.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     COMPTOIR_DB_PATH=/var/lib/comptoir/ledger.db                       │
//! │     COMPTOIR_LOCK_TIMEOUT_MS=2000                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/comptoir/comptoir.toml (Linux)                           │
//! │     ~/Library/Application Support/com.comptoir.ledger/ (macOS)         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "comptoir.db"
//! max_connections = 5
//! min_connections = 1
//! connect_timeout_secs = 30
//! lock_timeout_ms = 5000
//! run_migrations = true
//!
//! [ledger]
//! history_limit = 50
//! low_stock_threshold = 10
//! ```

use comptoir_core::{DEFAULT_HISTORY_LIMIT, DEFAULT_LOW_STOCK_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long a unit of work waits for the writer lock before failing
    /// with `LockTimeout`.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("comptoir.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_lock_timeout() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            lock_timeout_ms: default_lock_timeout(),
            run_migrations: true,
        }
    }
}

/// `[ledger]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Movements returned by history queries when no limit is given.
    #[serde(default = "default_history_limit")]
    pub history_limit: i64,

    /// Stock health reports LOW at or below this quantity.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_history_limit() -> i64 {
    DEFAULT_HISTORY_LIMIT
}

fn default_low_stock_threshold() -> i64 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            history_limit: DEFAULT_HISTORY_LIMIT,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

// =============================================================================
// Ledger Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,
}

impl LedgerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (comptoir.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| DbError::Config(format!("{}: {e}", path.display())))?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Replaces the database path when a command line gave one.
    ///
    /// `None` keeps whatever the file and environment chose.
    pub fn with_database_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            debug!(?path, "Overriding database path from command line");
            self.database.path = path;
        }
        self
    }

    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml(contents: &str) -> DbResult<Self> {
        toml::from_str(contents).map_err(|e| DbError::Config(e.to_string()))
    }

    pub fn validate(&self) -> DbResult<()> {
        let db = &self.database;

        if db.path.as_os_str().is_empty() {
            return Err(DbError::Config("database.path must not be empty".into()));
        }

        if db.max_connections == 0 {
            return Err(DbError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if db.min_connections > db.max_connections {
            return Err(DbError::Config(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                db.min_connections, db.max_connections
            )));
        }

        if self.ledger.history_limit <= 0 {
            return Err(DbError::Config(
                "ledger.history_limit must be greater than 0".into(),
            ));
        }

        if self.ledger.low_stock_threshold < 0 {
            return Err(DbError::Config(
                "ledger.low_stock_threshold must not be negative".into(),
            ));
        }

        Ok(())
    }

    /// Pool configuration for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        let db = &self.database;
        DbConfig::new(db.path.clone())
            .max_connections(db.max_connections)
            .min_connections(db.min_connections)
            .connect_timeout(Duration::from_secs(db.connect_timeout_secs))
            .lock_timeout(Duration::from_millis(db.lock_timeout_ms))
            .run_migrations(db.run_migrations)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("COMPTOIR_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("COMPTOIR_MAX_CONNECTIONS") {
            match value.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %value, "Ignoring invalid COMPTOIR_MAX_CONNECTIONS"),
            }
        }

        if let Some(value) = lookup("COMPTOIR_LOCK_TIMEOUT_MS") {
            match value.parse::<u64>() {
                Ok(ms) => self.database.lock_timeout_ms = ms,
                Err(_) => warn!(value = %value, "Ignoring invalid COMPTOIR_LOCK_TIMEOUT_MS"),
            }
        }

        if let Some(value) = lookup("COMPTOIR_HISTORY_LIMIT") {
            match value.parse::<i64>() {
                Ok(n) => self.ledger.history_limit = n,
                Err(_) => warn!(value = %value, "Ignoring invalid COMPTOIR_HISTORY_LIMIT"),
            }
        }

        if let Some(value) = lookup("COMPTOIR_LOW_STOCK_THRESHOLD") {
            match value.parse::<i64>() {
                Ok(n) => self.ledger.low_stock_threshold = n,
                Err(_) => warn!(value = %value, "Ignoring invalid COMPTOIR_LOW_STOCK_THRESHOLD"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "comptoir", "ledger")
            .map(|dirs| dirs.config_dir().join("comptoir.toml"))
    }
}
