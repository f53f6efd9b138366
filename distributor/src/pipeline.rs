// Copyright (c) 2024 Botho Foundation

//! One distribution run over a period snapshot.
//!
//! Picks the eligible gauges out of the snapshot, joins them with their
//! configured overrides and collected fees, runs the period allocation and
//! splits each gauge's distribution between the Balancer injector and Aura.

use std::collections::BTreeMap;

use gauge_allocation::{
    distribute_period, AllocationError, AllocationStatus, GaugeDistribution, GaugeId, GaugeInput,
    PeriodParams,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DistributionConfig;
use crate::fees::{protocol_fees_between, FeeError};
use crate::period::Period;
use crate::pools::{PoolOverride, PoolOverrides};
use crate::snapshot::{GaugeInfo, PeriodSnapshot, PoolInfo};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Fees(#[from] FeeError),

    #[error("Gauge {0} is listed for more than one eligible pool")]
    DuplicateGauge(GaugeId),

    #[error("No whitelisted gauge is eligible on {chain}")]
    NoEligibleGauges { chain: String },
}

/// One line of the distribution report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRow {
    pub gauge_address: String,
    /// Address the incentives are paid to
    pub recipient: String,
    pub pool_address: String,
    pub pool_id: String,
    pub symbol: String,
    pub distribution: f64,
    pub pct_distribution: f64,
    pub distro_to_balancer: f64,
    pub distro_to_aura: f64,
    pub vote_weight_no_boost: f64,
    pub static_boost: f64,
    pub dynamic_boost: f64,
    pub boost: f64,
    pub vote_weight: f64,
    pub cap_percent: f64,
    pub fixed_incentive: f64,
    pub capped: bool,
}

/// Result of a run: nonzero rows, largest share first
#[derive(Debug, Clone, Serialize)]
pub struct DistributionReport {
    pub period: Period,
    pub rows: Vec<DistributionRow>,
    pub total_budget: f64,
    pub distributed: f64,
    pub unspent: f64,
    pub passes: usize,
    pub status: AllocationStatus,
    /// Gauges whose fixed emissions exceeded their cap
    pub over_committed: Vec<GaugeId>,
    pub eligible_gauges: usize,
    pub total_protocol_fees: f64,
}

impl DistributionReport {
    pub fn total_to_balancer(&self) -> f64 {
        self.rows.iter().map(|r| r.distro_to_balancer).sum()
    }

    pub fn total_to_aura(&self) -> f64 {
        self.rows.iter().map(|r| r.distro_to_aura).sum()
    }

    pub fn capped_gauges(&self) -> usize {
        self.rows.iter().filter(|r| r.capped).count()
    }

    /// Whether any row routes part of its distribution to Aura
    pub fn has_aura_share(&self) -> bool {
        self.rows.iter().any(|r| r.distro_to_aura > 0.0)
    }
}

/// A gauge that passed eligibility, with everything needed to build its row
struct EligibleGauge<'a> {
    pool: &'a PoolInfo,
    gauge: &'a GaugeInfo,
    pool_override: &'a PoolOverride,
    recipient: String,
}

/// Run the distribution for one period.
pub fn run_period(
    config: &DistributionConfig,
    overrides: &PoolOverrides,
    snapshot: &PeriodSnapshot,
    period: Period,
) -> Result<DistributionReport, PipelineError> {
    let fees = protocol_fees_between(&snapshot.fee_snapshots)?;
    let eligible = eligible_gauges(config, overrides, snapshot)?;
    if eligible.is_empty() {
        return Err(PipelineError::NoEligibleGauges {
            chain: config.chain_name.clone(),
        });
    }

    let mut inputs = BTreeMap::new();
    let mut total_protocol_fees = 0.0;
    for (gauge_id, entry) in &eligible {
        let fee = fees
            .get(&entry.pool.address.to_lowercase())
            .copied()
            .unwrap_or(0.0);
        total_protocol_fees += fee;

        inputs.insert(
            gauge_id.clone(),
            GaugeInput::new(entry.gauge.raw_weight_pct())
                .with_fees(fee)
                .with_static_boost(entry.pool_override.static_boost)
                .with_fixed_allocation(entry.pool_override.fixed_emissions)
                .with_cap_percent(entry.pool_override.cap_percent),
        );
    }

    let params = PeriodParams {
        emissions_per_period: snapshot.emissions_per_period,
        token_price_usd: snapshot.token_price_usd,
        total_budget: config.total_tokens_per_epoch,
        fixed_incentive_budget: config.fixed_incentive_tokens_per_epoch,
        dynamic_boost_cap: config.dynamic_boost_cap,
        min_usd_for_boost: config.min_usd_for_boost,
    };

    let distribution = distribute_period(&inputs, &params)?;

    let mut rows: Vec<DistributionRow> = distribution
        .nonzero()
        .filter_map(|d| eligible.get(d.gauge_id()).map(|entry| build_row(d, entry)))
        .collect();
    rows.sort_by(|a, b| {
        b.pct_distribution
            .total_cmp(&a.pct_distribution)
            .then_with(|| a.gauge_address.cmp(&b.gauge_address))
    });

    info!(
        period = %period,
        eligible = eligible.len(),
        receiving = rows.len(),
        distributed = distribution.distributed,
        unspent = distribution.unspent,
        passes = distribution.passes,
        "Distribution computed"
    );

    Ok(DistributionReport {
        period,
        rows,
        total_budget: distribution.total_budget,
        distributed: distribution.distributed,
        unspent: distribution.unspent,
        passes: distribution.passes,
        status: distribution.status,
        over_committed: distribution.over_committed,
        eligible_gauges: eligible.len(),
        total_protocol_fees,
    })
}

/// Gauges on the configured chain, alive, and whose pool is whitelisted
fn eligible_gauges<'a>(
    config: &DistributionConfig,
    overrides: &'a PoolOverrides,
    snapshot: &'a PeriodSnapshot,
) -> Result<BTreeMap<GaugeId, EligibleGauge<'a>>, PipelineError> {
    let mut eligible = BTreeMap::new();

    for pool in &snapshot.pools {
        if !pool.chain.eq_ignore_ascii_case(&config.chain_name) {
            continue;
        }
        let Some(pool_override) = overrides.get(&GaugeId::new(&pool.id)) else {
            continue;
        };
        let Some(gauge) = pool.gauge.as_ref() else {
            debug!(pool = %pool.id, "Whitelisted pool has no gauge");
            continue;
        };
        if gauge.is_killed {
            debug!(pool = %pool.id, gauge = %gauge.address, "Skipping killed gauge");
            continue;
        }

        let recipient = match &gauge.recipient {
            Some(recipient) => recipient.clone(),
            None => {
                warn!(
                    gauge = %gauge.address,
                    "No recipient for gauge, paying the gauge address"
                );
                gauge.address.clone()
            }
        };

        let gauge_id = GaugeId::new(&gauge.address);
        let entry = EligibleGauge {
            pool,
            gauge,
            pool_override,
            recipient,
        };
        if eligible.insert(gauge_id.clone(), entry).is_some() {
            return Err(PipelineError::DuplicateGauge(gauge_id));
        }
    }

    for pool_override in overrides.iter() {
        let listed = eligible
            .values()
            .any(|e| GaugeId::new(&e.pool.id) == pool_override.pool_id);
        if !listed {
            warn!(
                pool = %pool_override.pool_id,
                fixed_emissions = pool_override.fixed_emissions,
                "Whitelisted pool has no eligible gauge this period"
            );
        }
    }

    Ok(eligible)
}

fn build_row(distribution: &GaugeDistribution, entry: &EligibleGauge<'_>) -> DistributionRow {
    let pool_override = entry.pool_override;
    let distro_to_aura = distribution.distribution * pool_override.pct_to_aura;
    let symbol = if entry.pool.symbol.is_empty() {
        pool_override
            .meta
            .as_ref()
            .and_then(|m| m.symbol())
            .unwrap_or_default()
            .to_string()
    } else {
        entry.pool.symbol.clone()
    };

    DistributionRow {
        gauge_address: entry.gauge.address.clone(),
        recipient: entry.recipient.clone(),
        pool_address: entry.pool.address.clone(),
        pool_id: entry.pool.id.clone(),
        symbol,
        distribution: distribution.distribution,
        pct_distribution: distribution.pct_of_budget,
        distro_to_balancer: distribution.distribution - distro_to_aura,
        distro_to_aura,
        vote_weight_no_boost: distribution.vote.raw_weight,
        static_boost: distribution.gauge.static_boost,
        dynamic_boost: distribution.gauge.dynamic_boost,
        boost: distribution.vote.boost.effective,
        vote_weight: distribution.vote.adjusted_weight,
        cap_percent: distribution.gauge.cap_percent,
        fixed_incentive: distribution.gauge.fixed_allocation,
        capped: distribution.capped,
    }
}
