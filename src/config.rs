//! TOML configuration, tracing setup, and SQLite pool construction.

use alloy::primitives::Bytes;
use clap::Parser;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::Level;
use url::Url;

use crate::chain::{Blockchain, NetworkEnvironment};
use crate::standard::TokenStandard;

#[derive(Parser, Debug)]
pub struct Env {
    /// Path to TOML configuration file
    #[clap(long)]
    pub config_file: PathBuf,
}

/// Raw shape of the config TOML. Resolved into [`Config`] with defaults
/// applied.
#[derive(Deserialize)]
struct FileConfig {
    database_url: String,
    log_level: Option<LogLevel>,
    evm: EvmConfig,
    rate_limit: Option<RateLimitConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvmConfig {
    pub rpc_url: Url,
    pub blockchain: Blockchain,
    pub environment: NetworkEnvironment,
    /// Directory of hex-encoded creation bytecode, one `<standard>.hex` file
    /// per master artifact. Only needed for networks without a factory.
    pub bytecode_dir: Option<PathBuf>,
}

/// Per-user deployment throttle over a sliding window.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitConfig {
    pub max_deployments: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub log_level: LogLevel,
    pub evm: EvmConfig,
    pub rate_limit: Option<RateLimitConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML")]
    Toml(#[from] toml::de::Error),
    #[error("malformed bytecode file {path}")]
    MalformedBytecode {
        path: PathBuf,
        source: alloy::hex::FromHexError,
    },
}

impl Config {
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::load(&contents)
    }

    pub fn load(config_toml: &str) -> Result<Self, ConfigError> {
        let raw: FileConfig = toml::from_str(config_toml)?;

        Ok(Self {
            database_url: raw.database_url,
            log_level: raw.log_level.unwrap_or(LogLevel::Info),
            evm: raw.evm,
            rate_limit: raw.rate_limit,
        })
    }

    pub async fn get_sqlite_pool(&self) -> Result<SqlitePool, sqlx::Error> {
        configure_sqlite_pool(&self.database_url).await
    }

    /// Read the creation bytecode for every standard that has a
    /// `<standard>.hex` file in the configured directory. Empty when no
    /// directory is configured; deployments then require a factory.
    pub fn load_bytecode(&self) -> Result<HashMap<TokenStandard, Bytes>, ConfigError> {
        let Some(dir) = &self.evm.bytecode_dir else {
            return Ok(HashMap::new());
        };

        let mut bytecode = HashMap::new();
        for standard in TokenStandard::ALL {
            let path = dir.join(format!("{}.hex", standard.as_str()));
            if !path.exists() {
                continue;
            }
            let hex = std::fs::read_to_string(&path)?;
            let bytes = hex
                .trim()
                .parse::<Bytes>()
                .map_err(|source| ConfigError::MalformedBytecode {
                    path: path.clone(),
                    source,
                })?;
            bytecode.insert(standard, bytes);
        }
        Ok(bytecode)
    }
}

pub(crate) async fn configure_sqlite_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePool::connect(database_url).await?;

    // WAL allows concurrent readers while a deployment transaction writes.
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    // Wait up to 10 seconds on a locked database before failing. Nonce
    // leases and event inserts are short transactions, so contention
    // resolves well inside this window.
    sqlx::query("PRAGMA busy_timeout = 10000")
        .execute(&pool)
        .await?;

    Ok(pool)
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl From<&LogLevel> for Level {
    fn from(log_level: &LogLevel) -> Self {
        (*log_level).into()
    }
}

pub fn setup_tracing(log_level: &LogLevel) {
    let level: Level = log_level.into();
    let default_filter = format!("token_foundry={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
