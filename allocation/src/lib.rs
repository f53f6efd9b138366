//! Per-period gauge incentive allocation.
//!
//! A fixed token budget is split across a set of gauges (incentivized
//! liquidity pools) in three steps:
//!
//! 1. **Boost composition**: a configured static boost and a fee-derived
//!    dynamic boost combine into one effective multiplier per gauge.
//! 2. **Weighted vote**: the effective boost scales the gauge's raw vote
//!    weight into the adjusted weight used for allocation.
//! 3. **Capped proportional allocation**: fixed carve-outs plus a
//!    weight-proportional share of the remaining budget, clamped to per-gauge
//!    caps, with any unspent remainder redistributed to uncapped gauges.
//!
//! ## Formulas
//!
//! ```text
//! dollar_value   = raw_weight / 100 × emissions_per_period × token_price
//! dynamic_boost  = max(1, min(fees / dollar_value, dynamic_cap))
//! effective      = dynamic_boost + static_boost − 1
//! adjusted       = raw_weight × effective
//! tentative_i    = fixed_i + proportional_budget × adjusted_i / Σ adjusted
//! distribution_i = min(tentative_i, cap_i)   then waterfall redistribution
//! ```
//!
//! The dynamic boost collapses to 1 when the dollar value of the gauge's
//! emission share is below the configured minimum or not above one dollar.
//!
//! ## Determinism
//!
//! Every function in this crate is a pure function of its arguments. Inputs
//! keyed by [`GaugeId`] are held in `BTreeMap`s so iteration order, and thus
//! floating-point summation order, is stable between runs.

mod allocator;
mod boost;
mod error;
mod gauge;
mod period;
mod vote;

pub use allocator::{
    allocate, Allocation, AllocationInput, AllocationStatus, GaugeShare, ALLOCATION_EPSILON,
};
pub use boost::{dollar_value_of_emission_share, Boost, BoostComposer};
pub use error::AllocationError;
pub use gauge::{Gauge, GaugeId};
pub use period::{distribute_period, GaugeDistribution, GaugeInput, PeriodDistribution, PeriodParams};
pub use vote::{adjusted_weight, WeightedVote};
