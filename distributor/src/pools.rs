// Copyright (c) 2024 Botho Foundation

//! Pool whitelist and per-pool overrides.
//!
//! Config entries are validated once, at load time, into an immutable
//! [`PoolOverrides`] that the run reads from. Every configuration error that
//! would make the distribution wrong is caught here, before any allocation:
//! duplicate pools, fixed emissions that don't add up to the fixed-incentive
//! budget, and caps too small to pay a pool's fixed emissions.

use std::collections::{BTreeMap, BTreeSet};

use gauge_allocation::GaugeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DistributionConfig;

/// Free-form notes attached to a pool entry.
///
/// Either a plain note (`meta = "sfrax 3-pool"`) or a string table
/// (`meta = { symbol = "eth-trip", boostReason = "100% LST" }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Meta {
    Note(String),
    Structured(BTreeMap<String, String>),
}

impl Meta {
    /// The pool symbol, if the metadata carries one
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Meta::Note(_) => None,
            Meta::Structured(fields) => fields.get("symbol").map(String::as_str),
        }
    }

    fn validate(&self, pool: &GaugeId) -> Result<(), PoolConfigError> {
        if let Meta::Structured(fields) = self {
            if fields.keys().any(|k| k.trim().is_empty()) {
                return Err(PoolConfigError::InvalidMeta(pool.clone()));
            }
        }
        Ok(())
    }
}

/// One `[[pools]]` entry as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolEntry {
    #[serde(default)]
    pub pool_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    /// Static boost (1.0 if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_boost: Option<f64>,

    /// Cap in percent of total tokens (default cap if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_override: Option<f64>,

    /// Tokens guaranteed to this pool each epoch (0 if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_emissions: Option<f64>,

    /// Share of this pool's distribution routed to Aura (0..=1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_to_aura: Option<f64>,
}

impl PoolEntry {
    pub fn new(pool_id: impl Into<String>) -> Self {
        Self {
            pool_id: pool_id.into(),
            meta: None,
            fixed_boost: None,
            cap_override: None,
            fixed_emissions: None,
            percent_to_aura: None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PoolConfigError {
    #[error("Pool {0} is configured more than once")]
    DuplicatePool(GaugeId),

    #[error(
        "Sum of fixed emissions configured: {configured} does not equal \
         fixed incentive tokens per epoch: {expected}"
    )]
    FixedEmissionsMismatch { configured: f64, expected: f64 },

    #[error("Pool {pool} has a cap of {cap_tokens} tokens, below its fixed emissions of {fixed}")]
    CapBelowFixedAllocation {
        pool: GaugeId,
        cap_tokens: f64,
        fixed: f64,
    },

    #[error("Pool {pool} has cap {cap}%, expected a value in (0, 100]")]
    InvalidCap { pool: GaugeId, cap: f64 },

    #[error("Pool {pool} has invalid fixed boost {boost}")]
    InvalidBoost { pool: GaugeId, boost: f64 },

    #[error("Pool {pool} has invalid fixed emissions {fixed}")]
    InvalidFixedEmissions { pool: GaugeId, fixed: f64 },

    #[error("Pool {pool} routes {share} to Aura, expected a value in [0, 1]")]
    InvalidAuraShare { pool: GaugeId, share: f64 },

    #[error("Pool {0} has metadata with an empty key")]
    InvalidMeta(GaugeId),

    #[error("Total tokens per epoch must be positive, got {0}")]
    InvalidTotalTokens(f64),

    #[error("No pools are whitelisted")]
    EmptyWhitelist,
}

/// Validated overrides for one whitelisted pool
#[derive(Debug, Clone, PartialEq)]
pub struct PoolOverride {
    pub pool_id: GaugeId,
    pub meta: Option<Meta>,
    pub static_boost: f64,
    pub cap_percent: f64,
    pub fixed_emissions: f64,
    pub pct_to_aura: f64,
}

/// The validated whitelist, keyed by pool id
#[derive(Debug, Clone)]
pub struct PoolOverrides {
    pools: BTreeMap<GaugeId, PoolOverride>,
    default_cap: f64,
}

impl PoolOverrides {
    /// Validate config entries against the distribution constants.
    pub fn from_config(
        config: &DistributionConfig,
        entries: &[PoolEntry],
    ) -> Result<Self, PoolConfigError> {
        let total = config.total_tokens_per_epoch;
        if !(total.is_finite() && total > 0.0) {
            return Err(PoolConfigError::InvalidTotalTokens(total));
        }

        let mut kept = Vec::with_capacity(entries.len());
        let mut seen = BTreeSet::new();
        for entry in entries {
            let pool_id = GaugeId::new(&entry.pool_id);
            if pool_id.is_empty() {
                warn!(?entry, "Skipping pool entry without a pool_id");
                continue;
            }
            if !seen.insert(pool_id.clone()) {
                return Err(PoolConfigError::DuplicatePool(pool_id));
            }
            kept.push((pool_id, entry));
        }

        if kept.is_empty() {
            return Err(PoolConfigError::EmptyWhitelist);
        }

        let default_cap = effective_default_cap(config.desired_default_vote_cap, kept.len());

        let mut pools = BTreeMap::new();
        for (pool_id, entry) in kept {
            let pool = validate_entry(config, pool_id, entry, default_cap)?;
            pools.insert(pool.pool_id.clone(), pool);
        }

        let configured: f64 = pools.values().map(|p| p.fixed_emissions).sum();
        if configured != config.fixed_incentive_tokens_per_epoch {
            return Err(PoolConfigError::FixedEmissionsMismatch {
                configured,
                expected: config.fixed_incentive_tokens_per_epoch,
            });
        }

        info!(
            pools = pools.len(),
            default_cap,
            fixed_emissions = configured,
            "Loaded pool whitelist"
        );

        Ok(Self { pools, default_cap })
    }

    pub fn get(&self, pool_id: &GaugeId) -> Option<&PoolOverride> {
        self.pools.get(pool_id)
    }

    /// Whether a pool is on the whitelist
    pub fn contains(&self, pool_id: &GaugeId) -> bool {
        self.pools.contains_key(pool_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoolOverride> + '_ {
        self.pools.values()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Cap applied to pools without an override, after any raise
    pub fn default_cap(&self) -> f64 {
        self.default_cap
    }

    pub fn total_fixed_emissions(&self) -> f64 {
        self.pools.values().map(|p| p.fixed_emissions).sum()
    }
}

/// Raise the default cap so that `pool_count` pools can hold 100% between them.
///
/// Pools with a lower cap override can still leave the budget short; that
/// surfaces as unspent capacity at allocation time.
pub fn effective_default_cap(desired: f64, pool_count: usize) -> f64 {
    if pool_count == 0 {
        return desired;
    }
    let minimum = 100.0 / pool_count as f64;
    if desired < minimum {
        warn!(
            desired,
            raised_to = minimum,
            "Default vote cap overridden to ensure all tokens are distributed"
        );
        minimum
    } else {
        info!(
            default_cap = desired,
            "Default vote cap should be sufficient to distribute all tokens"
        );
        desired
    }
}

fn validate_entry(
    config: &DistributionConfig,
    pool_id: GaugeId,
    entry: &PoolEntry,
    default_cap: f64,
) -> Result<PoolOverride, PoolConfigError> {
    if let Some(meta) = &entry.meta {
        meta.validate(&pool_id)?;
    }

    let static_boost = entry.fixed_boost.unwrap_or(1.0);
    if !(static_boost.is_finite() && static_boost >= 0.0) {
        return Err(PoolConfigError::InvalidBoost {
            pool: pool_id,
            boost: static_boost,
        });
    }

    let cap_percent = entry.cap_override.unwrap_or(default_cap);
    if !(cap_percent > 0.0 && cap_percent <= 100.0) {
        return Err(PoolConfigError::InvalidCap {
            pool: pool_id,
            cap: cap_percent,
        });
    }

    let fixed_emissions = entry.fixed_emissions.unwrap_or(0.0);
    if !(fixed_emissions.is_finite() && fixed_emissions >= 0.0) {
        return Err(PoolConfigError::InvalidFixedEmissions {
            pool: pool_id,
            fixed: fixed_emissions,
        });
    }

    let cap_tokens = cap_percent / 100.0 * config.total_tokens_per_epoch;
    if cap_tokens < fixed_emissions {
        return Err(PoolConfigError::CapBelowFixedAllocation {
            pool: pool_id,
            cap_tokens,
            fixed: fixed_emissions,
        });
    }

    let pct_to_aura = entry.percent_to_aura.unwrap_or(config.default_pct_to_aura);
    if !(0.0..=1.0).contains(&pct_to_aura) {
        return Err(PoolConfigError::InvalidAuraShare {
            pool: pool_id,
            share: pct_to_aura,
        });
    }

    Ok(PoolOverride {
        pool_id,
        meta: entry.meta.clone(),
        static_boost,
        cap_percent,
        fixed_emissions,
        pct_to_aura,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn config(fixed_total: f64) -> DistributionConfig {
        DistributionConfig {
            total_tokens_per_epoch: 100_000.0,
            fixed_incentive_tokens_per_epoch: fixed_total,
            desired_default_vote_cap: 20.0,
            ..Default::default()
        }
    }

    fn entry(pool_id: &str, fixed: Option<f64>) -> PoolEntry {
        PoolEntry {
            fixed_emissions: fixed,
            ..PoolEntry::new(pool_id)
        }
    }

    fn five_pools() -> Vec<PoolEntry> {
        vec![
            entry("0xA1", Some(3_000.0)),
            entry("0xA2", Some(1_000.0)),
            entry("0xA3", None),
            entry("0xA4", None),
            entry("0xA5", None),
        ]
    }

    #[test]
    fn test_defaults_applied() {
        let overrides = PoolOverrides::from_config(&config(4_000.0), &five_pools()).unwrap();

        assert_eq!(overrides.len(), 5);
        let pool = overrides.get(&GaugeId::new("0xa3")).unwrap();
        assert_eq!(pool.static_boost, 1.0);
        assert_eq!(pool.cap_percent, 20.0);
        assert_eq!(pool.fixed_emissions, 0.0);
        assert_eq!(pool.pct_to_aura, 0.0);
        assert_eq!(overrides.total_fixed_emissions(), 4_000.0);
    }

    #[test]
    fn test_pool_ids_are_case_insensitive() {
        let overrides = PoolOverrides::from_config(&config(4_000.0), &five_pools()).unwrap();
        assert!(overrides.contains(&GaugeId::new("0XA1")));
        assert!(!overrides.contains(&GaugeId::new("0xb1")));
    }

    #[test]
    fn test_duplicate_pool_is_fatal() {
        let mut pools = five_pools();
        pools.push(entry("0xa1", None));

        assert_eq!(
            PoolOverrides::from_config(&config(4_000.0), &pools).unwrap_err(),
            PoolConfigError::DuplicatePool(GaugeId::new("0xa1"))
        );
    }

    #[test]
    fn test_fixed_emissions_must_match_budget() {
        assert_matches!(
            PoolOverrides::from_config(&config(5_000.0), &five_pools()),
            Err(PoolConfigError::FixedEmissionsMismatch { configured, expected })
                if configured == 4_000.0 && expected == 5_000.0
        );
    }

    #[test]
    fn test_cap_below_fixed_emissions_is_fatal() {
        let mut pools = five_pools();
        pools[0].cap_override = Some(2.0); // 2k tokens < 3k fixed

        assert_matches!(
            PoolOverrides::from_config(&config(4_000.0), &pools),
            Err(PoolConfigError::CapBelowFixedAllocation { cap_tokens, .. }) if cap_tokens == 2_000.0
        );
    }

    #[test]
    fn test_default_cap_raised_for_few_pools() {
        // Three pools at 20% could only place 60% of the budget.
        let pools = vec![entry("0x1", None), entry("0x2", None), entry("0x3", None)];
        let overrides = PoolOverrides::from_config(&config(0.0), &pools).unwrap();

        assert!((overrides.default_cap() - 100.0 / 3.0).abs() < 1e-12);
        assert_eq!(
            overrides.get(&GaugeId::new("0x1")).unwrap().cap_percent,
            overrides.default_cap()
        );
    }

    #[test]
    fn test_cap_override_survives_default_raise() {
        let mut pools = vec![entry("0x1", None), entry("0x2", None)];
        pools[0].cap_override = Some(10.0);
        let overrides = PoolOverrides::from_config(&config(0.0), &pools).unwrap();

        assert_eq!(overrides.default_cap(), 50.0);
        assert_eq!(overrides.get(&GaugeId::new("0x1")).unwrap().cap_percent, 10.0);
    }

    #[test]
    fn test_empty_pool_ids_are_skipped() {
        let mut pools = five_pools();
        pools.push(entry("", None));
        pools.push(entry("   ", None));

        let overrides = PoolOverrides::from_config(&config(4_000.0), &pools).unwrap();
        assert_eq!(overrides.len(), 5);
    }

    #[test]
    fn test_empty_whitelist_is_fatal() {
        assert_eq!(
            PoolOverrides::from_config(&config(0.0), &[entry("", None)]).unwrap_err(),
            PoolConfigError::EmptyWhitelist
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut pools = five_pools();
        pools[2].cap_override = Some(0.0);
        assert_matches!(
            PoolOverrides::from_config(&config(4_000.0), &pools),
            Err(PoolConfigError::InvalidCap { .. })
        );

        let mut pools = five_pools();
        pools[2].fixed_boost = Some(-1.0);
        assert_matches!(
            PoolOverrides::from_config(&config(4_000.0), &pools),
            Err(PoolConfigError::InvalidBoost { .. })
        );

        let mut pools = five_pools();
        pools[2].percent_to_aura = Some(1.5);
        assert_matches!(
            PoolOverrides::from_config(&config(4_000.0), &pools),
            Err(PoolConfigError::InvalidAuraShare { .. })
        );

        let mut pools = five_pools();
        pools[2].meta = Some(Meta::Structured(BTreeMap::from([(
            " ".to_string(),
            "x".to_string(),
        )])));
        assert_matches!(
            PoolOverrides::from_config(&config(4_000.0), &pools),
            Err(PoolConfigError::InvalidMeta(_))
        );
    }

    #[test]
    fn test_meta_parsing() {
        #[derive(Deserialize)]
        struct Wrapper {
            meta: Meta,
        }

        let note: Wrapper = toml::from_str(r#"meta = "sfrax 3-pool""#).unwrap();
        assert_eq!(note.meta, Meta::Note("sfrax 3-pool".to_string()));
        assert_eq!(note.meta.symbol(), None);

        let structured: Wrapper =
            toml::from_str(r#"meta = { symbol = "eth-trip", boostReason = "100% LST" }"#).unwrap();
        assert_eq!(structured.meta.symbol(), Some("eth-trip"));

        assert!(toml::from_str::<Wrapper>("meta = 5").is_err());
        assert!(toml::from_str::<Wrapper>("meta = { nested = { a = \"b\" } }").is_err());
    }
}
