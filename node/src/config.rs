//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use evote_types::LedgerParams;

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a vote ledger node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Leading zero hex digits required of every sealed block hash.
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,

    /// Pool size at which a block is sealed.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seal any non-empty pool at this interval so votes never wait for a
    /// full batch. `0` disables the periodic flush.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// How long a submission waits for its voter's lock before failing with `Busy`.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_difficulty() -> u32 {
    LedgerParams::reference().difficulty
}

fn default_batch_size() -> usize {
    LedgerParams::reference().batch_size
}

fn default_flush_interval_secs() -> u64 {
    30
}

fn default_lock_timeout_ms() -> u64 {
    2_000
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject settings the sealer cannot work with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.batch_size == 0 {
            return Err(NodeError::Config("batch_size must be at least 1".into()));
        }
        if self.difficulty > LedgerParams::MAX_DIFFICULTY {
            return Err(NodeError::Config(format!(
                "difficulty {} exceeds maximum {}",
                self.difficulty,
                LedgerParams::MAX_DIFFICULTY
            )));
        }
        self.log_format()?;
        Ok(())
    }

    /// Sealing parameters injected into the ledger.
    pub fn params(&self) -> LedgerParams {
        LedgerParams {
            difficulty: self.difficulty,
            batch_size: self.batch_size,
        }
    }

    /// Periodic flush interval, or `None` when disabled.
    pub fn flush_interval(&self) -> Option<Duration> {
        (self.flush_interval_secs > 0).then(|| Duration::from_secs(self.flush_interval_secs))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        match self.log_format.as_str() {
            "human" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(NodeError::Config(format!(
                "unknown log format {other:?}, expected \"human\" or \"json\""
            ))),
        }
    }

    /// Cheap settings for tests: difficulty 1, no periodic flush.
    pub fn dev() -> Self {
        Self {
            difficulty: LedgerParams::dev().difficulty,
            flush_interval_secs: 0,
            ..Self::default()
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            batch_size: default_batch_size(),
            flush_interval_secs: default_flush_interval_secs(),
            lock_timeout_ms: default_lock_timeout_ms(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}
