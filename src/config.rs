// Smartmarks configuration
// Read once at startup from the environment (and an optional `.env` file).

use std::env;
use std::path::PathBuf;

use crate::platform;
use crate::types::errors::ConfigError;

pub const ENV_DATA_DIR: &str = "SMARTMARKS_DATA_DIR";
pub const ENV_DB_FILE: &str = "SMARTMARKS_DB_FILE";
pub const ENV_LOG: &str = "SMARTMARKS_LOG";
pub const ENV_RPC_RATE_LIMIT: &str = "SMARTMARKS_RPC_RATE_LIMIT";

const DEFAULT_DB_FILE: &str = "smartmarks.db";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_RPC_RATE_LIMIT: u32 = 200;

/// Runtime configuration for the binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_file: String,
    /// `env_logger` filter directives, e.g. `info` or `smartmarks=debug`.
    pub log_filter: String,
    /// Maximum RPC requests accepted per second.
    pub rpc_rate_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: platform::get_data_dir(),
            db_file: DEFAULT_DB_FILE.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            rpc_rate_limit: DEFAULT_RPC_RATE_LIMIT,
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let rpc_rate_limit = match get(ENV_RPC_RATE_LIMIT) {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: ENV_RPC_RATE_LIMIT.to_string(),
                    value: raw,
                })?,
            None => defaults.rpc_rate_limit,
        };

        Ok(Self {
            data_dir: get(ENV_DATA_DIR).map(PathBuf::from).unwrap_or(defaults.data_dir),
            db_file: get(ENV_DB_FILE).unwrap_or(defaults.db_file),
            log_filter: get(ENV_LOG).unwrap_or(defaults.log_filter),
            rpc_rate_limit,
        })
    }

    /// Full path of the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }
}

/// Installs `env_logger` with the configured filter. Logs go to stderr, so the
/// RPC protocol on stdout stays clean. Safe to call more than once.
pub fn init_logging(config: &Config) {
    let _ = env_logger::Builder::new()
        .parse_filters(&config.log_filter)
        .target(env_logger::Target::Stderr)
        .try_init();
}
