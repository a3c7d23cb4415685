//! Configuration file management.

use std::path::PathBuf;

use fanout_engine::EngineConfig;
use fanout_ledger::stub::DEFAULT_FEE_UNITS;
use serde::{Deserialize, Serialize};

/// Complete CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Allocation, batching and submission tuning.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Ledger and snapshot sources.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
    /// Initial balances for the stub ledger. Empty = $data_dir/genesis.toml.
    #[serde(default)]
    pub genesis_file: String,
    /// Holder snapshot file. Empty = $data_dir/holders.toml.
    #[serde(default)]
    pub snapshot_file: String,
    /// Fee the stub ledger charges per transfer set, in units.
    #[serde(default = "default_fee_units")]
    pub fee_units: u64,
    /// Units credited to an unfunded signer on first use (dev only).
    #[serde(default)]
    pub airdrop_units: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_fee_units() -> u64 {
    DEFAULT_FEE_UNITS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            genesis_file: String::new(),
            snapshot_file: String::new(),
            fee_units: default_fee_units(),
            airdrop_units: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl FanoutConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: FanoutConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.ledger.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.ledger.data_dir)
        }
    }

    pub fn genesis_path(&self) -> PathBuf {
        self.resolve(&self.ledger.genesis_file, "genesis.toml")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.resolve(&self.ledger.snapshot_file, "holders.toml")
    }

    fn resolve(&self, configured: &str, default_name: &str) -> PathBuf {
        if configured.is_empty() {
            self.data_dir().join(default_name)
        } else {
            PathBuf::from(configured)
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// `$FANOUT_DATA_DIR`, else `~/.fanout`.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("FANOUT_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".fanout"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/fanout"))
    }
}
