use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::emission::HalvingSchedule;

/// Largest extranonce1 size a stratum server may be configured with.
pub const MAX_EXTRANONCE1_SIZE: usize = 16;

/// Main configuration for the loyalty engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub loyalty: LoyaltyConfig,

    /// Base emission schedule the subsidy split is applied to
    #[serde(default)]
    pub emission: HalvingSchedule,
}

/// Loyalty tracking parameters.
///
/// Raw values are kept as written in the config file. Out-of-range values are
/// clamped by the accessors rather than rejected, so a bad config can never
/// stop the node from connecting blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyConfig {
    /// First height whose coinbase tags are tracked
    #[serde(default = "default_start_height")]
    pub start_height: i64,

    /// First height at which the loyalty-limited subsidy is enforced
    #[serde(default = "default_enforce_height")]
    pub enforce_height: i64,

    /// Blocks per accrual period (a "loyalty month"); <= 0 means one period
    #[serde(default = "default_period_blocks")]
    pub period_blocks: i64,

    /// Extranonce1 size advertised to stratum servers (informational)
    #[serde(default = "default_extranonce1_size")]
    pub extranonce1_size: i64,
}

fn default_start_height() -> i64 {
    1
}

fn default_enforce_height() -> i64 {
    1
}

fn default_period_blocks() -> i64 {
    4320
}

fn default_extranonce1_size() -> i64 {
    4
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            start_height: default_start_height(),
            enforce_height: default_enforce_height(),
            period_blocks: default_period_blocks(),
            extranonce1_size: default_extranonce1_size(),
        }
    }
}

impl LoyaltyConfig {
    /// Start height, negative values read as 0.
    pub fn start_height(&self) -> u64 {
        u64::try_from(self.start_height).unwrap_or(0)
    }

    pub fn enforce_height(&self) -> u64 {
        u64::try_from(self.enforce_height).unwrap_or(0)
    }

    /// Period length, or `None` when every height falls into period 0.
    pub fn period_blocks(&self) -> Option<u64> {
        u64::try_from(self.period_blocks).ok().filter(|n| *n > 0)
    }

    /// Accrual period index of `height`.
    pub fn period_index(&self, height: u64) -> u64 {
        match self.period_blocks() {
            Some(blocks) => height / blocks,
            None => 0,
        }
    }

    /// Extranonce1 size clamped to `0..=MAX_EXTRANONCE1_SIZE`.
    pub fn extranonce1_size(&self) -> usize {
        self.extranonce1_size.clamp(0, MAX_EXTRANONCE1_SIZE as i64) as usize
    }
}

impl Config {
    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load config from a file, falling back to defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if Self::exists(path) {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Check if config file exists
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }
}

/// Get the default data directory path
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pol")
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

/// Get the default chain file path
pub fn default_chain_path() -> PathBuf {
    default_data_dir().join("chain.json")
}
