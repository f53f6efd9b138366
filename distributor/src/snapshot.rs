// Copyright (c) 2024 Botho Foundation

//! Period snapshot: the live data a run consumes.
//!
//! Pool listings, gauge weights, fee snapshots, prices and Aura pool ids are
//! gathered by external collaborators and written to one JSON file, so a run
//! is a pure function of the files on disk.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::fees::FeeSnapshot;

/// Scale of gauge-controller relative weights (1e18 == 100%)
pub const RELATIVE_WEIGHT_SCALE: f64 = 1e18;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodSnapshot {
    /// Incentive token price in USD
    pub token_price_usd: f64,

    /// Governance-token emissions directed by the gauge vote this period
    pub emissions_per_period: f64,

    #[serde(default)]
    pub pools: Vec<PoolInfo>,

    #[serde(default)]
    pub fee_snapshots: Vec<FeeSnapshot>,

    /// Aura pool id by gauge recipient address
    #[serde(default)]
    pub aura_pids: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolInfo {
    /// Pool id (matched against the whitelist)
    pub id: String,
    pub address: String,
    #[serde(default)]
    pub symbol: String,
    pub chain: String,
    /// Pools without a gauge can't receive incentives
    #[serde(default)]
    pub gauge: Option<GaugeInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaugeInfo {
    pub address: String,
    #[serde(default)]
    pub is_killed: bool,
    /// Gauge-controller relative weight, 1e18-scaled
    #[serde(default)]
    pub relative_weight: u64,
    /// Payout recipient; the gauge address when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

impl GaugeInfo {
    /// Vote weight in percentage points
    pub fn raw_weight_pct(&self) -> f64 {
        self.relative_weight as f64 / RELATIVE_WEIGHT_SCALE * 100.0
    }
}

impl PeriodSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot from {}", path.display()))?;

        Self::from_json(&contents)
            .with_context(|| format!("Failed to parse snapshot from {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Aura pool id for a gauge recipient, matched case-insensitively
    pub fn aura_pid(&self, recipient: &str) -> Option<&str> {
        self.aura_pids
            .iter()
            .find(|(address, _)| address.eq_ignore_ascii_case(recipient))
            .map(|(_, pid)| pid.as_str())
    }
}
