use crate::{group_registry::Frequency, transaction_log::DEFAULT_HISTORY_LIMIT, types::Amount};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// SQLite path, or ":memory:".
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// How long a writer waits for another connection's write lock.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Records returned by history queries when the caller gives no limit.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Parameters for one seeded rotation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub members: u32,
    pub amount_per_person: Amount,
    pub opening_balance: Amount,
    pub frequency: Frequency,
    /// Chance per member per cycle of buying airtime before contributing.
    pub airtime_probability: f64,
    pub max_airtime: Amount,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            members: 5,
            amount_per_person: 1_000,
            opening_balance: 5_000,
            frequency: Frequency::Weekly,
            airtime_probability: 0.25,
            max_airtime: 1_500,
        }
    }
}

fn default_database_path() -> String {
    "esusu.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_history_limit() -> u32 {
    DEFAULT_HISTORY_LIMIT
}

impl LedgerConfig {
    /// Load config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {path}: {e}"))?;
        let config: LedgerConfig = serde_json::from_str(&content)?;
        if config.history_limit == 0 {
            anyhow::bail!("history_limit must be at least 1");
        }
        Ok(config)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// In-memory database with default parameters.
    pub fn default_test() -> Self {
        Self {
            database_path: ":memory:".into(),
            busy_timeout_ms: default_busy_timeout_ms(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            simulation: SimulationConfig::default(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            simulation: SimulationConfig::default(),
        }
    }
}
