//! Node configuration.
//!
//! Configuration comes from a YAML file with per-field defaults, so an
//! empty file (or none at all) yields a runnable local node. A few
//! operational knobs can also be overridden through `PURSE_*`
//! environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use purse_rates::{CurrencyPair, RateClientConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    FileRead(String, #[source] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Main node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Directory holding the ledger database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Optional JSON file of records to seed the ledger with at startup
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
    /// Origin allowed to call the API from a browser
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Exchange rate lookup settings
    #[serde(default)]
    pub rates: RateSettings,
    /// Settlement policy settings
    #[serde(default)]
    pub settlement: SettlementSettings,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_cors_origin() -> String {
    "http://localhost:8080".to_string()
}

/// Exchange rate lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSettings {
    /// Ticker endpoint URL
    #[serde(default = "default_ticker_endpoint")]
    pub endpoint: String,
    /// Pair to convert balances with, as BASE/QUOTE
    #[serde(default = "default_pair")]
    pub pair: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How long a fetched rate stays fresh, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Extra attempts after a transient quote failure
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Pause between attempts, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_ticker_endpoint() -> String {
    "http://api-cryptopia.adca.sh/v1/prices/ticker".to_string()
}

fn default_pair() -> String {
    "BTC/EUR".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            endpoint: default_ticker_endpoint(),
            pair: default_pair(),
            timeout_secs: default_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl RateSettings {
    /// Convert into the client configuration used by the rate source
    pub fn client_config(&self) -> RateClientConfig {
        RateClientConfig {
            endpoint: self.endpoint.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            retry_attempts: self.retry_attempts,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

/// Settlement policy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSettings {
    /// Smallest withdrawal the node will settle
    #[serde(default = "default_dust_threshold")]
    pub dust_threshold: Decimal,
    /// Conflicting spend attempts before a withdrawal is abandoned
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_dust_threshold() -> Decimal {
    // 0.00001 BTC
    Decimal::new(1, 5)
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for SettlementSettings {
    fn default() -> Self {
        Self {
            dust_threshold: default_dust_threshold(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            data_dir: default_data_dir(),
            seed_file: None,
            cors_origin: default_cors_origin(),
            rates: RateSettings::default(),
            settlement: SettlementSettings::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration.
    ///
    /// An explicit path wins; otherwise `PURSE_CONFIG_FILE` is consulted.
    /// With neither, the built-in defaults apply. Environment overrides
    /// are applied last in every case.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match env::var("PURSE_CONFIG_FILE") {
                Ok(path) => Self::from_file(Path::new(&path))?,
                Err(_) => Self::default(),
            },
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.display().to_string(), e))?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = env::var("PURSE_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Ok(dir) = env::var("PURSE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(path) = env::var("PURSE_SEED_FILE") {
            self.seed_file = Some(PathBuf::from(path));
        }
        if let Ok(endpoint) = env::var("PURSE_TICKER_ENDPOINT") {
            self.rates.endpoint = endpoint;
        }
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settlement.dust_threshold <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                field: "settlement.dust_threshold".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.settlement.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "settlement.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.rates.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "rates.timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.rates.pair.parse::<CurrencyPair>().is_err() {
            return Err(ConfigError::Invalid {
                field: "rates.pair".to_string(),
                reason: format!("{:?} is not of the form BASE/QUOTE", self.rates.pair),
            });
        }
        Ok(())
    }
}
