use thiserror::Error;

use crate::gauge::GaugeId;

#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    #[error("Invalid {field} for gauge {gauge}: {value}")]
    InvalidInput {
        gauge: GaugeId,
        field: &'static str,
        value: f64,
    },

    #[error("Invalid {field}: {value}")]
    InvalidBudget { field: &'static str, value: f64 },

    #[error("Duplicate gauge {0} in allocation input")]
    DuplicateGauge(GaugeId),

    /// The redistribution loop did not settle within its bound. Caps or
    /// weights were computed inconsistently upstream.
    #[error(
        "Redistribution did not converge after {iterations} passes (bound {bound}), \
         {unspent} unspent across {} gauges",
        .distributions.len()
    )]
    IterationBoundExceeded {
        iterations: usize,
        bound: usize,
        unspent: f64,
        distributions: Vec<(GaugeId, f64)>,
    },
}
