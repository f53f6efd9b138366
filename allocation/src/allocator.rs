//! Capped proportional allocation with waterfall redistribution.
//!
//! ## Algorithm
//!
//! ```text
//! 1. d_i = min(fixed_i + w_i / Σw × P, cap_i)
//! 2. unspent = B − Σ d_i;  stop if unspent ≤ ε
//! 3. U = { i : d_i < cap_i };  W_U = Σ_{i∈U} w_i;  stop if W_U = 0
//! 4. d_i = min(d_i + w_i / W_U × unspent, cap_i)  for i ∈ U
//! 5. goto 2
//! ```
//!
//! where `B` is the total budget and `P` the weight-following part of it.
//! Weight shares are taken before scaling by an amount so that very large
//! weights can't overflow the product.
//!
//! ## Termination
//!
//! A gauge that reaches its cap never leaves it, since distributions only
//! grow. Each pass either places all of `unspent` (no clamp fires) or caps
//! at least one more gauge, so at most `N` passes run for `N` gauges. The
//! loop is bounded at `N + 1` passes; hitting the bound is an invariant
//! violation and aborts with the full state.
//!
//! When every gauge with weight is capped and budget remains, the remainder
//! is reported as [`AllocationStatus::CapacityExhausted`]. That is an
//! expected outcome of tight caps, not an error.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::{error::AllocationError, gauge::GaugeId};

/// Relative tolerance for budget and cap comparisons.
///
/// Scaled by `max(1, total_budget)` at allocation time.
pub const ALLOCATION_EPSILON: f64 = 1e-9;

/// One gauge as seen by the allocator.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocationInput {
    pub id: GaugeId,

    /// Boost-adjusted vote weight.
    pub adjusted_weight: f64,

    /// Carve-out paid before the weight-following share.
    pub fixed_allocation: f64,

    /// Maximum tokens this gauge may receive.
    pub absolute_cap: f64,
}

/// Final allocation for one gauge.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaugeShare {
    pub id: GaugeId,
    pub distribution: f64,
    pub pct_of_budget: f64,
    pub capped: bool,
}

/// How an allocation ended.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AllocationStatus {
    /// The whole budget was placed.
    Complete,

    /// Every gauge with weight hit its cap before the budget ran out.
    CapacityExhausted { unspent: f64 },
}

/// Result of [`allocate`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Allocation {
    /// One share per input gauge, in input order.
    pub shares: Vec<GaugeShare>,

    pub total_budget: f64,

    /// Sum of all distributions.
    pub distributed: f64,

    /// `total_budget - distributed`.
    pub unspent: f64,

    /// Number of redistribution passes after the initial pass.
    pub passes: usize,

    /// Count of capped gauges after the initial pass and after each
    /// redistribution pass. Non-decreasing.
    pub capped_after_pass: Vec<usize>,

    /// Gauges whose fixed allocation alone exceeded their cap.
    pub over_committed: Vec<GaugeId>,

    pub status: AllocationStatus,
}

impl Allocation {
    /// Look up the share for a gauge.
    pub fn get(&self, id: &GaugeId) -> Option<&GaugeShare> {
        self.shares.iter().find(|share| &share.id == id)
    }

    pub fn is_complete(&self) -> bool {
        self.status == AllocationStatus::Complete
    }
}

/// Split `total_budget` across `gauges`.
///
/// `proportional_budget` is the part of the budget that follows weight in the
/// initial pass; fixed allocations make up the rest. Redistribution always
/// aims at `total_budget`.
pub fn allocate(
    gauges: &[AllocationInput],
    total_budget: f64,
    proportional_budget: f64,
) -> Result<Allocation, AllocationError> {
    validate(gauges, total_budget, proportional_budget)?;

    let tolerance = ALLOCATION_EPSILON * total_budget.max(1.0);
    let is_capped = |distribution: f64, gauge: &AllocationInput| {
        distribution >= gauge.absolute_cap - tolerance
    };

    let total_weight: f64 = gauges.iter().map(|g| g.adjusted_weight).sum();
    let mut over_committed = Vec::new();
    let mut distributions = Vec::with_capacity(gauges.len());

    for gauge in gauges {
        if gauge.fixed_allocation > gauge.absolute_cap + tolerance {
            warn!(
                gauge = %gauge.id,
                fixed = gauge.fixed_allocation,
                cap = gauge.absolute_cap,
                "Fixed allocation exceeds cap; clamping to cap"
            );
            over_committed.push(gauge.id.clone());
        }

        let proportional = if total_weight > 0.0 {
            gauge.adjusted_weight / total_weight * proportional_budget
        } else {
            0.0
        };
        distributions.push((gauge.fixed_allocation + proportional).min(gauge.absolute_cap));
    }

    let count_capped = |distributions: &[f64]| {
        gauges
            .iter()
            .zip(distributions)
            .filter(|&(gauge, &d)| is_capped(d, gauge))
            .count()
    };

    let bound = gauges.len() + 1;
    let mut passes = 0;
    let mut capped_after_pass = vec![count_capped(&distributions)];

    let status = loop {
        let unspent = total_budget - distributions.iter().sum::<f64>();
        if unspent <= tolerance {
            if unspent < -tolerance {
                warn!(
                    overspent = -unspent,
                    "Initial pass exceeds total budget; fixed allocations and \
                     proportional budget do not add up"
                );
            }
            break AllocationStatus::Complete;
        }

        if passes >= bound {
            return Err(AllocationError::IterationBoundExceeded {
                iterations: passes,
                bound,
                unspent,
                distributions: gauges
                    .iter()
                    .map(|g| g.id.clone())
                    .zip(distributions.iter().copied())
                    .collect(),
            });
        }

        let uncapped: Vec<usize> = (0..gauges.len())
            .filter(|&i| !is_capped(distributions[i], &gauges[i]))
            .collect();
        let uncapped_weight: f64 = uncapped.iter().map(|&i| gauges[i].adjusted_weight).sum();

        if uncapped_weight <= 0.0 {
            warn!(
                unspent,
                "Not enough cap capacity to distribute the full budget; \
                 double check that final distributions are sensible"
            );
            break AllocationStatus::CapacityExhausted { unspent };
        }

        for &i in &uncapped {
            let gauge = &gauges[i];
            let topped_up = distributions[i] + gauge.adjusted_weight / uncapped_weight * unspent;
            distributions[i] = topped_up.min(gauge.absolute_cap);
        }

        passes += 1;
        let capped = count_capped(&distributions);
        capped_after_pass.push(capped);
        debug!(
            pass = passes,
            unspent,
            uncapped_weight,
            capped,
            "Redistributed unspent budget"
        );
    };

    let distributed: f64 = distributions.iter().sum();
    let shares = gauges
        .iter()
        .zip(&distributions)
        .map(|(gauge, &distribution)| GaugeShare {
            id: gauge.id.clone(),
            distribution,
            pct_of_budget: pct_of(distribution, total_budget),
            capped: is_capped(distribution, gauge),
        })
        .collect();

    Ok(Allocation {
        shares,
        total_budget,
        distributed,
        unspent: total_budget - distributed,
        passes,
        capped_after_pass,
        over_committed,
        status,
    })
}

fn pct_of(amount: f64, total: f64) -> f64 {
    if total > 0.0 {
        amount / total * 100.0
    } else {
        0.0
    }
}

fn validate(
    gauges: &[AllocationInput],
    total_budget: f64,
    proportional_budget: f64,
) -> Result<(), AllocationError> {
    let non_negative = |value: f64| value.is_finite() && value >= 0.0;

    if !non_negative(total_budget) {
        return Err(AllocationError::InvalidBudget {
            field: "total budget",
            value: total_budget,
        });
    }
    if !non_negative(proportional_budget) {
        return Err(AllocationError::InvalidBudget {
            field: "proportional budget",
            value: proportional_budget,
        });
    }

    let mut seen = BTreeSet::new();
    for gauge in gauges {
        if !seen.insert(&gauge.id) {
            return Err(AllocationError::DuplicateGauge(gauge.id.clone()));
        }
        for (field, value) in [
            ("adjusted weight", gauge.adjusted_weight),
            ("fixed allocation", gauge.fixed_allocation),
            ("cap", gauge.absolute_cap),
        ] {
            if !non_negative(value) {
                return Err(AllocationError::InvalidInput {
                    gauge: gauge.id.clone(),
                    field,
                    value,
                });
            }
        }
    }

    let total_weight: f64 = gauges.iter().map(|g| g.adjusted_weight).sum();
    if !total_weight.is_finite() {
        return Err(AllocationError::InvalidBudget {
            field: "total adjusted weight",
            value: total_weight,
        });
    }

    Ok(())
}
