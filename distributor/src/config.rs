// Copyright (c) 2024 Botho Foundation

//! Distribution configuration file.
//!
//! One TOML file holds the period-wide constants, the output locations and
//! the pool whitelist with its per-pool overrides:
//!
//! ```toml
//! [distribution]
//! chain_name = "arbitrum"
//! total_tokens_per_epoch = 100000.0
//! fixed_incentive_tokens_per_epoch = 4000.0
//!
//! [[pools]]
//! pool_id = "0x90e6...055c"
//! meta = { symbol = "rsETH-wETH" }
//! fixed_emissions = 4000.0
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pools::PoolEntry;

/// Main configuration for a distribution run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub distribution: DistributionConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Whitelisted pools and their overrides
    #[serde(default)]
    pub pools: Vec<PoolEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Chain whose gauges are eligible
    #[serde(default = "default_chain_name")]
    pub chain_name: String,

    /// Prefix for every output file name
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Total incentive tokens available per epoch
    pub total_tokens_per_epoch: f64,

    /// Tokens taken away from vote following and paid as fixed incentives
    #[serde(default)]
    pub fixed_incentive_tokens_per_epoch: f64,

    /// Upper bound on the fee-derived dynamic boost
    #[serde(default = "default_dynamic_boost_cap")]
    pub dynamic_boost_cap: f64,

    /// Emission shares worth less than this many USD get no dynamic boost
    #[serde(default = "default_min_usd_for_boost")]
    pub min_usd_for_boost: f64,

    /// Cap (percent of total) for pools without a cap override.
    /// Raised automatically when too low to place the whole budget.
    #[serde(default = "default_vote_cap")]
    pub desired_default_vote_cap: f64,

    /// Share of each distribution routed to Aura when a pool doesn't say (0..=1)
    #[serde(default)]
    pub default_pct_to_aura: f64,

    /// Length of one epoch in days
    #[serde(default = "default_epoch_days")]
    pub epoch_days: u32,

    /// Periods each epoch's amount is streamed over
    #[serde(default = "default_num_periods")]
    pub num_periods: u32,
}

impl DistributionConfig {
    /// Tokens that follow the boosted vote weights
    pub fn tokens_to_follow_voting(&self) -> f64 {
        self.total_tokens_per_epoch - self.fixed_incentive_tokens_per_epoch
    }
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            chain_name: default_chain_name(),
            file_prefix: default_file_prefix(),
            total_tokens_per_epoch: 100_000.0,
            fixed_incentive_tokens_per_epoch: 0.0,
            dynamic_boost_cap: default_dynamic_boost_cap(),
            min_usd_for_boost: default_min_usd_for_boost(),
            desired_default_vote_cap: default_vote_cap(),
            default_pct_to_aura: 0.0,
            epoch_days: default_epoch_days(),
            num_periods: default_num_periods(),
        }
    }
}

fn default_chain_name() -> String {
    "arbitrum".to_string()
}

fn default_file_prefix() -> String {
    "gauge_incentives".to_string()
}

fn default_dynamic_boost_cap() -> f64 {
    3.0
}

fn default_min_usd_for_boost() -> f64 {
    200.0
}

fn default_vote_cap() -> f64 {
    20.0
}

fn default_epoch_days() -> u32 {
    14
}

fn default_num_periods() -> u32 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for CSV and payload files, relative to the config file
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Injector transaction template (built-in template if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bal_injector_template: Option<PathBuf>,

    /// Aura direct-stream template (built-in template if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aura_direct_template: Option<PathBuf>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            bal_injector_template: None,
            aura_direct_template: None,
        }
    }
}

impl Config {
    /// Create a config with default constants and an empty whitelist
    pub fn new() -> Self {
        Self {
            distribution: DistributionConfig::default(),
            output: OutputConfig::default(),
            pools: Vec::new(),
        }
    }

    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Check if config file exists
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a path from the config file against the config file's directory
pub fn resolve_relative(config_path: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(path)
}

/// Get the default data directory path
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gauge-distributor")
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}
