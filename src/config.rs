//! Configuration handling for sqlrepo.
//!
//! [`ConnectSettings`] is what the library needs to open a connection: the SQL
//! log level for the driver and the pool tuning. [`Config`] is the demo binary's
//! CLI, backed by environment variables.

use crate::error::{DbError, DbResult};
use crate::models::Dialect;
use clap::Parser;
use std::fmt;
use std::time::Duration;

/// Environment variable holding the driver's SQL log level.
pub const SQL_LOG_LEVEL_ENV: &str = "SQL_LOG_LEVEL";

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MAX_CONNECTIONS_SQLITE: u32 = 1;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Statements slower than this are reported at WARN when SQL logging is on.
pub const SLOW_STATEMENT_THRESHOLD: Duration = Duration::from_millis(200);

/// Verbosity of the driver's statement logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlLogLevel {
    /// Every statement, plus slow statements as warnings
    Info,
    /// Failing statements only
    Error,
    #[default]
    Silent,
}

impl SqlLogLevel {
    /// Interpret a setting value. Only `info` and `error` are recognized; any
    /// other value selects silent logging.
    pub fn from_setting(value: &str) -> Self {
        match value {
            "info" => Self::Info,
            "error" => Self::Error,
            _ => Self::Silent,
        }
    }

    /// Read the level from `SQL_LOG_LEVEL`; unset means silent.
    pub fn from_env() -> Self {
        std::env::var(SQL_LOG_LEVEL_ENV)
            .map(|v| Self::from_setting(&v))
            .unwrap_or_default()
    }

    /// Level the driver logs executed statements at.
    pub fn statement_filter(&self) -> log::LevelFilter {
        match self {
            Self::Info => log::LevelFilter::Info,
            Self::Error | Self::Silent => log::LevelFilter::Off,
        }
    }

    /// Level the driver logs slow statements at.
    pub fn slow_statement_filter(&self) -> log::LevelFilter {
        match self {
            Self::Info => log::LevelFilter::Warn,
            Self::Error | Self::Silent => log::LevelFilter::Off,
        }
    }

    /// Whether failing statements are reported.
    pub fn reports_errors(&self) -> bool {
        !matches!(self, Self::Silent)
    }
}

impl fmt::Display for SqlLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Error => write!(f, "error"),
            Self::Silent => write!(f, "silent"),
        }
    }
}

/// Connection pool configuration options.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PoolOptions {
    /// Maximum connections in pool (default: 10 for MySQL/PostgreSQL, 1 for SQLite)
    pub max_connections: Option<u32>,
    /// Minimum connections in pool (default: 1)
    pub min_connections: Option<u32>,
    /// Idle timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
    /// Whether to test connections before use (default: true)
    pub test_before_acquire: Option<bool>,
}

impl PoolOptions {
    /// Get max_connections with default value based on database type.
    pub fn max_connections_or_default(&self, is_sqlite: bool) -> u32 {
        self.max_connections.unwrap_or(if is_sqlite {
            DEFAULT_MAX_CONNECTIONS_SQLITE
        } else {
            DEFAULT_MAX_CONNECTIONS
        })
    }

    /// Get min_connections with default value.
    pub fn min_connections_or_default(&self) -> u32 {
        self.min_connections.unwrap_or(DEFAULT_MIN_CONNECTIONS)
    }

    /// Get idle_timeout with default value.
    pub fn idle_timeout_or_default(&self) -> u64 {
        self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS)
    }

    /// Get acquire_timeout with default value.
    pub fn acquire_timeout_or_default(&self) -> u64 {
        self.acquire_timeout_secs
            .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS)
    }

    /// Get test_before_acquire with default value.
    pub fn test_before_acquire_or_default(&self) -> bool {
        self.test_before_acquire.unwrap_or(true)
    }

    /// Validate pool options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_connections {
            if max == 0 {
                return Err("max_connections must be greater than 0".to_string());
            }
        }
        if let Some(min) = self.min_connections {
            if min == 0 {
                return Err("min_connections must be greater than 0".to_string());
            }
            if let Some(max) = self.max_connections {
                if min > max {
                    return Err(format!(
                        "min_connections ({}) cannot exceed max_connections ({})",
                        min, max
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Everything the connection factory needs besides the descriptor and dialect.
#[derive(Debug, Clone, Default)]
pub struct ConnectSettings {
    pub sql_log_level: SqlLogLevel,
    pub pool: PoolOptions,
}

impl ConnectSettings {
    /// Settings with default pool options and the SQL log level from the
    /// environment.
    pub fn from_env() -> Self {
        Self {
            sql_log_level: SqlLogLevel::from_env(),
            pool: PoolOptions::default(),
        }
    }

    pub fn with_sql_log_level(mut self, level: SqlLogLevel) -> Self {
        self.sql_log_level = level;
        self
    }

    pub fn with_pool(mut self, pool: PoolOptions) -> Self {
        self.pool = pool;
        self
    }
}

/// Command line configuration for the demo binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sqlrepo-demo",
    about = "Connect to a database and run create/read/update/delete through the generic repository",
    version,
    author
)]
pub struct Config {
    /// Connection string: key=value pairs for postgres, a file path or
    /// file::memory:?cache=shared for sqlite3, a mysql:// URL for mysql
    #[arg(long, value_name = "DSN", env = "DATABASE_DSN")]
    pub dsn: String,

    /// SQL dialect (postgres, sqlite3, mysql)
    #[arg(long, default_value = "postgres", env = "DATABASE_DIALECT")]
    pub dialect: Dialect,

    /// Create or extend the demo table before running
    #[arg(long)]
    pub migrate: bool,

    /// Driver statement logging (info, error; anything else is silent)
    #[arg(long, env = SQL_LOG_LEVEL_ENV)]
    pub sql_log_level: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "LOG_JSON")]
    pub json_logs: bool,

    /// Maximum pooled connections
    #[arg(long)]
    pub max_connections: Option<u32>,

    /// Minimum pooled connections
    #[arg(long)]
    pub min_connections: Option<u32>,

    /// Seconds to wait for a pooled connection
    #[arg(long)]
    pub acquire_timeout: Option<u64>,

    /// Seconds before an idle connection is closed
    #[arg(long)]
    pub idle_timeout: Option<u64>,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// SQL log level from the flag, or silent when absent.
    pub fn sql_log_level(&self) -> SqlLogLevel {
        self.sql_log_level
            .as_deref()
            .map(SqlLogLevel::from_setting)
            .unwrap_or_default()
    }

    /// Pool options from the pool flags.
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            idle_timeout_secs: self.idle_timeout,
            acquire_timeout_secs: self.acquire_timeout,
            test_before_acquire: None,
        }
    }

    /// Build validated connection settings.
    pub fn connect_settings(&self) -> DbResult<ConnectSettings> {
        let pool = self.pool_options();
        pool.validate().map_err(DbError::invalid_input)?;
        Ok(ConnectSettings {
            sql_log_level: self.sql_log_level(),
            pool,
        })
    }
}
