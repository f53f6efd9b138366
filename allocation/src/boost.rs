//! Boost composition.
//!
//! Each gauge carries two multipliers:
//!
//! - **Static boost**: configured per pool (e.g. 1.5 for a favoured pool).
//! - **Dynamic boost**: protocol fees the pool earned during the period divided
//!   by the dollar value of the emissions its vote weight already attracts.
//!   Pools that pay for their emissions in fees get boosted, up to a cap.
//!
//! The two are additive around a baseline of 1: each contributes its excess
//! over 1, so a gauge with no boosts at all has an effective multiplier of
//! exactly 1.
//!
//! ```text
//! effective = dynamic + static − 1
//! ```

use tracing::debug;

/// Dollar value of the emissions a gauge's vote weight attracts.
///
/// `raw_weight_pct` is the unboosted weight in percentage points.
pub fn dollar_value_of_emission_share(
    raw_weight_pct: f64,
    emissions_per_period: f64,
    token_price_usd: f64,
) -> f64 {
    raw_weight_pct / 100.0 * emissions_per_period * token_price_usd
}

/// Composed boost for one gauge, kept whole for audit output.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Boost {
    pub static_boost: f64,
    pub dynamic_boost: f64,
    pub effective: f64,
}

impl Boost {
    /// The baseline: no static and no dynamic boost.
    pub const NONE: Boost = Boost {
        static_boost: 1.0,
        dynamic_boost: 1.0,
        effective: 1.0,
    };
}

impl Default for Boost {
    fn default() -> Self {
        Self::NONE
    }
}

/// Dynamic boost policy shared by every gauge in a period.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoostComposer {
    /// Emission shares worth less than this (USD) get no dynamic boost.
    pub min_usd_threshold: f64,

    /// Upper bound on the dynamic boost.
    pub dynamic_cap: f64,
}

impl BoostComposer {
    pub fn new(min_usd_threshold: f64, dynamic_cap: f64) -> Self {
        Self {
            min_usd_threshold,
            dynamic_cap,
        }
    }

    /// Dynamic boost from fees collected and the dollar value of emissions.
    ///
    /// Returns exactly 1.0 when the emission share is below the threshold or
    /// not above one dollar; otherwise the fee ratio clamped to
    /// `[1.0, dynamic_cap]`.
    pub fn dynamic_boost(&self, protocol_fee_collected: f64, dollar_value: f64) -> f64 {
        if dollar_value < self.min_usd_threshold || dollar_value <= 1.0 {
            return 1.0;
        }

        let raw = (protocol_fee_collected / dollar_value).min(self.dynamic_cap);
        debug!(
            fees = protocol_fee_collected,
            dollar_value,
            raw_dynamic_boost = raw,
            "dynamic boost from fee ratio"
        );

        // NaN (e.g. NaN fees) falls through to the floor as well.
        if raw >= 1.0 {
            raw
        } else {
            1.0
        }
    }

    /// Compose the static boost with the fee-derived dynamic boost.
    pub fn compose(&self, static_boost: f64, protocol_fee_collected: f64, dollar_value: f64) -> Boost {
        let dynamic_boost = self.dynamic_boost(protocol_fee_collected, dollar_value);
        Boost {
            static_boost,
            dynamic_boost,
            effective: dynamic_boost + static_boost - 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer() -> BoostComposer {
        BoostComposer::new(200.0, 3.0)
    }

    #[test]
    fn test_no_boosts_is_baseline() {
        let boost = composer().compose(1.0, 0.0, 10_000.0);
        assert_eq!(boost, Boost::NONE);
        assert_eq!(boost.effective, 1.0);
    }

    #[test]
    fn test_below_min_usd_threshold_has_no_dynamic_boost() {
        // Fee ratio would be 10x but the share is only worth $150.
        assert_eq!(composer().dynamic_boost(1_500.0, 150.0), 1.0);
    }

    #[test]
    fn test_dollar_value_at_or_below_one_has_no_dynamic_boost() {
        let permissive = BoostComposer::new(0.0, 3.0);
        assert_eq!(permissive.dynamic_boost(100.0, 1.0), 1.0);
        assert_eq!(permissive.dynamic_boost(100.0, 0.5), 1.0);
        assert_eq!(permissive.dynamic_boost(100.0, 0.0), 1.0);
    }

    #[test]
    fn test_dynamic_boost_is_fee_ratio() {
        let dynamic = composer().dynamic_boost(2_000.0, 1_000.0);
        assert!((dynamic - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_dynamic_boost_is_capped() {
        assert_eq!(composer().dynamic_boost(50_000.0, 1_000.0), 3.0);
    }

    #[test]
    fn test_dynamic_boost_never_penalizes() {
        // Fees cover only half of emissions.
        assert_eq!(composer().dynamic_boost(500.0, 1_000.0), 1.0);
        // Missing fee data.
        assert_eq!(composer().dynamic_boost(0.0, 1_000.0), 1.0);
    }

    #[test]
    fn test_boosts_are_additive_around_one() {
        // static 1.5 and dynamic 2.0 give 2.5, not 3.0
        let boost = composer().compose(1.5, 2_000.0, 1_000.0);
        assert!((boost.dynamic_boost - 2.0).abs() < 1e-12);
        assert!((boost.effective - 2.5).abs() < 1e-12);
        assert_eq!(boost.static_boost, 1.5);
    }

    #[test]
    fn test_static_boost_alone() {
        let boost = composer().compose(1.75, 0.0, 5_000.0);
        assert_eq!(boost.dynamic_boost, 1.0);
        assert_eq!(boost.effective, 1.75);
    }

    #[test]
    fn test_dollar_value_of_emission_share() {
        // 10% of 60k tokens at $2
        let value = dollar_value_of_emission_share(10.0, 60_000.0, 2.0);
        assert!((value - 12_000.0).abs() < 1e-9);
    }
}
