//! Gauge identity and per-run gauge records.

use std::fmt;

/// Case-insensitive gauge identifier.
///
/// Pool ids and gauge addresses arrive in mixed case (checksummed addresses,
/// hand-edited config). The id is normalised to lowercase on construction so
/// equality, ordering and hashing all ignore case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub struct GaugeId(String);

impl GaugeId {
    /// Create a gauge id, normalising case and surrounding whitespace.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    /// The normalised id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for GaugeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for GaugeId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<GaugeId> for String {
    fn from(id: GaugeId) -> Self {
        id.0
    }
}

impl AsRef<str> for GaugeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GaugeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An allocatable recipient for one distribution period.
///
/// Built fresh each run from static configuration (boost, cap, fixed
/// allocation) and live data (raw weight, composed dynamic boost). Never
/// mutated by the allocator, which produces separate output records.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gauge {
    pub id: GaugeId,

    /// Unboosted vote weight share in percentage points.
    pub raw_weight: f64,

    /// Configured multiplier, 1.0 when not overridden.
    pub static_boost: f64,

    /// Performance-derived multiplier, never below 1.0.
    pub dynamic_boost: f64,

    /// Tokens guaranteed to this gauge regardless of weight.
    pub fixed_allocation: f64,

    /// Maximum share of the total budget, in percent.
    pub cap_percent: f64,
}

impl Gauge {
    /// Absolute token cap for this gauge given the period's total budget.
    pub fn absolute_cap(&self, total_budget: f64) -> f64 {
        self.cap_percent / 100.0 * total_budget
    }
}
