// Copyright (c) 2024 Botho Foundation

//! Protocol fees collected over a period.
//!
//! Fee snapshots record the cumulative protocol fee of a pool at a point in
//! time. The fees collected over the period are the newest cumulative value
//! minus the oldest one for the same pool.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum FeeError {
    #[error("Pool {pool} has a negative protocol fee delta {delta}")]
    NegativeFeeDelta { pool: String, delta: f64 },

    #[error("Pool {pool} has an unreadable protocol fee value {value:?}")]
    InvalidFeeValue { pool: String, value: String },
}

/// Fee value as reported by the indexer: a number or a numeric string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeeValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSnapshot {
    pub pool_address: String,
    pub timestamp: i64,
    /// Cumulative protocol fee in USD, null when the indexer had none
    #[serde(default)]
    pub protocol_fee: Option<FeeValue>,
}

impl FeeSnapshot {
    /// Cumulative fee in USD; missing values count as zero
    pub fn fee_usd(&self) -> Result<f64, FeeError> {
        let invalid = |value: String| FeeError::InvalidFeeValue {
            pool: self.pool_address.clone(),
            value,
        };

        let fee = match &self.protocol_fee {
            None => 0.0,
            Some(FeeValue::Number(n)) => *n,
            Some(FeeValue::Text(s)) => s.trim().parse::<f64>().map_err(|_| invalid(s.clone()))?,
        };

        if !fee.is_finite() {
            return Err(invalid(fee.to_string()));
        }
        Ok(fee)
    }
}

/// Protocol fees collected per pool address (lowercased) over the snapshots.
///
/// Pools with a single snapshot have no delta and are left out.
pub fn protocol_fees_between(snapshots: &[FeeSnapshot]) -> Result<BTreeMap<String, f64>, FeeError> {
    let mut by_pool: BTreeMap<String, Vec<&FeeSnapshot>> = BTreeMap::new();
    for snapshot in snapshots {
        by_pool
            .entry(snapshot.pool_address.to_lowercase())
            .or_default()
            .push(snapshot);
    }

    let mut fees = BTreeMap::new();
    for (pool, mut group) in by_pool {
        if group.len() < 2 {
            continue;
        }
        // Newest first
        group.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let newest = group[0].fee_usd()?;
        let oldest = group[group.len() - 1].fee_usd()?;
        let delta = newest - oldest;
        if delta < 0.0 {
            return Err(FeeError::NegativeFeeDelta { pool, delta });
        }

        debug!(pool = %pool, snapshots = group.len(), fees = delta, "Protocol fees collected");
        fees.insert(pool, delta);
    }

    Ok(fees)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(pool: &str, timestamp: i64, fee: Option<FeeValue>) -> FeeSnapshot {
        FeeSnapshot {
            pool_address: pool.to_string(),
            timestamp,
            protocol_fee: fee,
        }
    }

    fn num(v: f64) -> Option<FeeValue> {
        Some(FeeValue::Number(v))
    }

    #[test]
    fn test_delta_is_newest_minus_oldest() {
        // Out of order on purpose
        let snapshots = vec![
            snap("0xA", 200, num(150.0)),
            snap("0xA", 100, num(100.0)),
            snap("0xA", 300, num(400.0)),
        ];

        let fees = protocol_fees_between(&snapshots).unwrap();
        assert_eq!(fees.get("0xa"), Some(&300.0));
    }

    #[test]
    fn test_groups_by_address_ignoring_case() {
        let snapshots = vec![
            snap("0xAbC", 100, num(10.0)),
            snap("0xabc", 200, Some(FeeValue::Text("25.5".to_string()))),
            snap("0xDEF", 100, num(1.0)),
            snap("0xdef", 200, num(1.0)),
        ];

        let fees = protocol_fees_between(&snapshots).unwrap();
        assert_eq!(fees.len(), 2);
        assert_eq!(fees["0xabc"], 15.5);
        assert_eq!(fees["0xdef"], 0.0);
    }

    #[test]
    fn test_single_snapshot_is_skipped() {
        let fees = protocol_fees_between(&[snap("0xA", 100, num(10.0))]).unwrap();
        assert!(fees.is_empty());
    }

    #[test]
    fn test_null_fee_counts_as_zero() {
        let snapshots = vec![snap("0xA", 100, None), snap("0xA", 200, num(7.0))];
        assert_eq!(protocol_fees_between(&snapshots).unwrap()["0xa"], 7.0);
    }

    #[test]
    fn test_negative_delta_is_an_error() {
        let snapshots = vec![snap("0xA", 100, num(50.0)), snap("0xA", 200, num(20.0))];

        assert_eq!(
            protocol_fees_between(&snapshots).unwrap_err(),
            FeeError::NegativeFeeDelta {
                pool: "0xa".to_string(),
                delta: -30.0
            }
        );
    }

    #[test]
    fn test_unparseable_fee_is_an_error() {
        let snapshots = vec![
            snap("0xA", 100, num(1.0)),
            snap("0xA", 200, Some(FeeValue::Text("lots".to_string()))),
        ];

        assert!(matches!(
            protocol_fees_between(&snapshots),
            Err(FeeError::InvalidFeeValue { .. })
        ));
    }
}
