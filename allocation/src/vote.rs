//! Boost-adjusted vote weights.

use crate::boost::Boost;

/// Apply an effective boost to a raw vote weight.
pub fn adjusted_weight(raw_weight: f64, effective_boost: f64) -> f64 {
    raw_weight * effective_boost
}

/// A gauge's vote weight before and after boosting.
///
/// The allocator only sees `adjusted_weight`; the unboosted weight is kept
/// alongside it so reports can show both.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightedVote {
    pub raw_weight: f64,
    pub boost: Boost,
    pub adjusted_weight: f64,
}

impl WeightedVote {
    pub fn new(raw_weight: f64, boost: Boost) -> Self {
        Self {
            raw_weight,
            boost,
            adjusted_weight: adjusted_weight(raw_weight, boost.effective),
        }
    }
}
