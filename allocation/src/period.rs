//! One distribution period, end to end.
//!
//! Joins boost composition, vote weighting and capped allocation over a
//! snapshot of per-gauge inputs. The snapshot is a `BTreeMap` so the result
//! is independent of the order in which inputs were collected.

use std::collections::BTreeMap;

use tracing::info;

use crate::{
    allocator::{allocate, AllocationInput, AllocationStatus},
    boost::{dollar_value_of_emission_share, BoostComposer},
    error::AllocationError,
    gauge::{Gauge, GaugeId},
    vote::WeightedVote,
};

/// Live and configured data for one gauge.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaugeInput {
    /// Unboosted vote weight in percentage points.
    pub raw_weight: f64,

    /// Protocol fees collected by the pool over the period, in USD.
    pub protocol_fee_collected: f64,

    pub static_boost: f64,

    pub fixed_allocation: f64,

    pub cap_percent: f64,
}

impl GaugeInput {
    /// Input with no fees, no boost, no fixed allocation and no cap.
    pub fn new(raw_weight: f64) -> Self {
        Self {
            raw_weight,
            protocol_fee_collected: 0.0,
            static_boost: 1.0,
            fixed_allocation: 0.0,
            cap_percent: 100.0,
        }
    }

    pub fn with_fees(mut self, protocol_fee_collected: f64) -> Self {
        self.protocol_fee_collected = protocol_fee_collected;
        self
    }

    pub fn with_static_boost(mut self, static_boost: f64) -> Self {
        self.static_boost = static_boost;
        self
    }

    pub fn with_fixed_allocation(mut self, fixed_allocation: f64) -> Self {
        self.fixed_allocation = fixed_allocation;
        self
    }

    pub fn with_cap_percent(mut self, cap_percent: f64) -> Self {
        self.cap_percent = cap_percent;
        self
    }
}

/// Period-wide scalars.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeriodParams {
    /// Governance-token emissions the vote weights direct, per period.
    pub emissions_per_period: f64,

    pub token_price_usd: f64,

    /// Incentive tokens to distribute this period.
    pub total_budget: f64,

    /// Part of `total_budget` reserved for fixed allocations.
    pub fixed_incentive_budget: f64,

    pub dynamic_boost_cap: f64,

    pub min_usd_for_boost: f64,
}

impl PeriodParams {
    /// Tokens that follow vote weight.
    pub fn proportional_budget(&self) -> f64 {
        self.total_budget - self.fixed_incentive_budget
    }

    pub fn boost_composer(&self) -> BoostComposer {
        BoostComposer::new(self.min_usd_for_boost, self.dynamic_boost_cap)
    }
}

/// Allocation outcome for one gauge, with everything needed to audit it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaugeDistribution {
    pub gauge: Gauge,
    pub vote: WeightedVote,
    pub absolute_cap: f64,
    pub distribution: f64,
    pub pct_of_budget: f64,
    pub capped: bool,
}

impl GaugeDistribution {
    pub fn gauge_id(&self) -> &GaugeId {
        &self.gauge.id
    }
}

/// Allocation outcome for a whole period.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeriodDistribution {
    /// One entry per input gauge, ordered by gauge id.
    pub gauges: Vec<GaugeDistribution>,
    pub total_budget: f64,
    pub distributed: f64,
    pub unspent: f64,
    pub passes: usize,
    pub over_committed: Vec<GaugeId>,
    pub status: AllocationStatus,
}

impl PeriodDistribution {
    pub fn get(&self, id: &GaugeId) -> Option<&GaugeDistribution> {
        self.gauges.iter().find(|g| g.gauge_id() == id)
    }

    /// Gauges that receive a nonzero distribution.
    pub fn nonzero(&self) -> impl Iterator<Item = &GaugeDistribution> + '_ {
        self.gauges.iter().filter(|g| g.distribution > 0.0)
    }

    /// Sum of unboosted weights across all gauges.
    pub fn total_raw_weight(&self) -> f64 {
        self.gauges.iter().map(|g| g.vote.raw_weight).sum()
    }

    /// Sum of boost-adjusted weights across all gauges.
    pub fn total_adjusted_weight(&self) -> f64 {
        self.gauges.iter().map(|g| g.vote.adjusted_weight).sum()
    }
}

/// Compose boosts, weight votes and allocate the period's budget.
pub fn distribute_period(
    inputs: &BTreeMap<GaugeId, GaugeInput>,
    params: &PeriodParams,
) -> Result<PeriodDistribution, AllocationError> {
    let composer = params.boost_composer();

    let mut gauges = Vec::with_capacity(inputs.len());
    let mut votes = Vec::with_capacity(inputs.len());
    for (id, input) in inputs {
        check_input(id, input)?;

        let dollar_value = dollar_value_of_emission_share(
            input.raw_weight,
            params.emissions_per_period,
            params.token_price_usd,
        );
        let boost = composer.compose(input.static_boost, input.protocol_fee_collected, dollar_value);
        votes.push(WeightedVote::new(input.raw_weight, boost));
        gauges.push(Gauge {
            id: id.clone(),
            raw_weight: input.raw_weight,
            static_boost: boost.static_boost,
            dynamic_boost: boost.dynamic_boost,
            fixed_allocation: input.fixed_allocation,
            cap_percent: input.cap_percent,
        });
    }

    info!(
        gauges = gauges.len(),
        raw_weight = votes.iter().map(|v| v.raw_weight).sum::<f64>(),
        boosted_weight = votes.iter().map(|v| v.adjusted_weight).sum::<f64>(),
        "Composed boosted vote weights"
    );

    let allocation_inputs: Vec<AllocationInput> = gauges
        .iter()
        .zip(&votes)
        .map(|(gauge, vote)| AllocationInput {
            id: gauge.id.clone(),
            adjusted_weight: vote.adjusted_weight,
            fixed_allocation: gauge.fixed_allocation,
            absolute_cap: gauge.absolute_cap(params.total_budget),
        })
        .collect();

    let allocation = allocate(
        &allocation_inputs,
        params.total_budget,
        params.proportional_budget(),
    )?;

    let distributions = gauges
        .into_iter()
        .zip(votes)
        .zip(allocation_inputs.iter().zip(&allocation.shares))
        .map(|((gauge, vote), (input, share))| GaugeDistribution {
            gauge,
            vote,
            absolute_cap: input.absolute_cap,
            distribution: share.distribution,
            pct_of_budget: share.pct_of_budget,
            capped: share.capped,
        })
        .collect();

    Ok(PeriodDistribution {
        gauges: distributions,
        total_budget: allocation.total_budget,
        distributed: allocation.distributed,
        unspent: allocation.unspent,
        passes: allocation.passes,
        over_committed: allocation.over_committed,
        status: allocation.status,
    })
}

fn check_input(id: &GaugeId, input: &GaugeInput) -> Result<(), AllocationError> {
    let invalid = |field, value| AllocationError::InvalidInput {
        gauge: id.clone(),
        field,
        value,
    };

    if !(input.raw_weight.is_finite() && input.raw_weight >= 0.0) {
        return Err(invalid("raw weight", input.raw_weight));
    }
    if !(input.static_boost.is_finite() && input.static_boost >= 0.0) {
        return Err(invalid("static boost", input.static_boost));
    }
    if !(input.cap_percent > 0.0 && input.cap_percent <= 100.0) {
        return Err(invalid("cap percent", input.cap_percent));
    }
    Ok(())
}
