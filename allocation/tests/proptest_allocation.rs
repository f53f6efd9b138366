//! Property-based tests for the capped proportional allocator.
//!
//! These check the allocator's guarantees over arbitrary gauge sets rather
//! than hand-picked scenarios: caps always hold, fixed allocations are never
//! eaten into, the full budget is placed whenever caps leave room for it, and
//! redistribution converges within its bound.

use gauge_allocation::{allocate, AllocationInput, AllocationStatus, GaugeId};
use proptest::prelude::*;

const TOTAL_BUDGET: f64 = 100_000.0;
const EPS: f64 = 1e-4;

/// (weight, fixed allocation, cap percent) per gauge.
fn gauge_params() -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec(
        (
            prop_oneof![Just(0.0), 0.0f64..100.0],
            prop_oneof![3 => Just(0.0), 1 => 0.0f64..2_000.0],
            1.0f64..100.0,
        ),
        1..40,
    )
}

fn build(params: &[(f64, f64, f64)]) -> (Vec<AllocationInput>, f64) {
    let gauges: Vec<_> = params
        .iter()
        .enumerate()
        .map(|(i, &(weight, fixed, cap_pct))| AllocationInput {
            id: GaugeId::new(format!("0xgauge{i:02}")),
            adjusted_weight: weight,
            fixed_allocation: fixed,
            absolute_cap: cap_pct / 100.0 * TOTAL_BUDGET,
        })
        .collect();
    let fixed_total: f64 = gauges.iter().map(|g| g.fixed_allocation).sum();
    (gauges, (TOTAL_BUDGET - fixed_total).max(0.0))
}

proptest! {
    /// Property: no gauge ever receives more than its cap.
    #[test]
    fn prop_caps_respected(params in gauge_params()) {
        let (gauges, proportional) = build(&params);
        let allocation = allocate(&gauges, TOTAL_BUDGET, proportional).unwrap();

        for (share, gauge) in allocation.shares.iter().zip(&gauges) {
            prop_assert!(
                share.distribution <= gauge.absolute_cap + EPS,
                "gauge {} got {} above cap {}",
                gauge.id, share.distribution, gauge.absolute_cap
            );
        }
    }

    /// Property: a gauge whose cap covers its fixed allocation gets at least
    /// that fixed allocation.
    #[test]
    fn prop_fixed_allocation_floor(params in gauge_params()) {
        let (gauges, proportional) = build(&params);
        let allocation = allocate(&gauges, TOTAL_BUDGET, proportional).unwrap();

        for (share, gauge) in allocation.shares.iter().zip(&gauges) {
            if gauge.absolute_cap >= gauge.fixed_allocation {
                prop_assert!(share.distribution >= gauge.fixed_allocation - EPS);
            }
        }
    }

    /// Property: when total capacity of weighted gauges covers the budget,
    /// the budget is spent in full.
    #[test]
    fn prop_budget_conserved_when_capacity_allows(params in gauge_params()) {
        let (gauges, proportional) = build(&params);
        let fixed_total: f64 = gauges.iter().map(|g| g.fixed_allocation).sum();
        prop_assume!(fixed_total <= TOTAL_BUDGET);

        // Capacity that redistribution can reach: weighted gauges up to their
        // cap, zero-weight gauges only up to their fixed amount.
        let reachable: f64 = gauges
            .iter()
            .map(|g| {
                if g.adjusted_weight > 0.0 {
                    g.absolute_cap
                } else {
                    g.fixed_allocation.min(g.absolute_cap)
                }
            })
            .sum();
        prop_assume!(reachable >= TOTAL_BUDGET);

        let allocation = allocate(&gauges, TOTAL_BUDGET, proportional).unwrap();
        prop_assert_eq!(allocation.status, AllocationStatus::Complete);
        prop_assert!((allocation.distributed - TOTAL_BUDGET).abs() < EPS);
    }

    /// Property: redistribution never uncaps a gauge and finishes within
    /// N + 1 passes.
    #[test]
    fn prop_monotonic_convergence(params in gauge_params()) {
        let (gauges, proportional) = build(&params);
        let allocation = allocate(&gauges, TOTAL_BUDGET, proportional).unwrap();

        prop_assert!(allocation.passes <= gauges.len() + 1);
        prop_assert_eq!(allocation.capped_after_pass.len(), allocation.passes + 1);
        for pair in allocation.capped_after_pass.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
    }

    /// Property: zero weight and zero fixed allocation always means zero.
    #[test]
    fn prop_zero_weight_gets_nothing(params in gauge_params()) {
        let (gauges, proportional) = build(&params);
        let allocation = allocate(&gauges, TOTAL_BUDGET, proportional).unwrap();

        for (share, gauge) in allocation.shares.iter().zip(&gauges) {
            if gauge.adjusted_weight == 0.0 && gauge.fixed_allocation == 0.0 {
                prop_assert_eq!(share.distribution, 0.0);
            }
        }
    }

    /// Property: identical inputs give bit-identical outputs.
    #[test]
    fn prop_deterministic(params in gauge_params()) {
        let (gauges, proportional) = build(&params);
        let first = allocate(&gauges, TOTAL_BUDGET, proportional).unwrap();
        let second = allocate(&gauges, TOTAL_BUDGET, proportional).unwrap();

        prop_assert_eq!(first, second);
    }
}
