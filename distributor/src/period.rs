// Copyright (c) 2024 Botho Foundation

//! Distribution period boundaries.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed time window `[start, end]` in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    /// The epoch of `epoch_days` days ending at unix timestamp `end_ts`
    pub fn ending_at(end_ts: i64, epoch_days: u32) -> Result<Self> {
        let end = DateTime::<Utc>::from_timestamp(end_ts, 0)
            .ok_or_else(|| anyhow!("Timestamp {} is out of range", end_ts))?;
        let start = end
            .checked_sub_signed(Duration::days(i64::from(epoch_days)))
            .ok_or_else(|| anyhow!("Period start before timestamp {} is out of range", end_ts))?;

        Ok(Self { start, end })
    }

    /// The epoch ending now
    pub fn ending_now(epoch_days: u32) -> Result<Self> {
        Self::ending_at(Utc::now().timestamp(), epoch_days)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }

    pub fn start_ts(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn end_ts(&self) -> i64 {
        self.end.timestamp()
    }

    /// `{prefix}_{start}_{end}` with ISO dates, the stem of every output file
    pub fn file_stem(&self, prefix: &str) -> String {
        format!("{}_{}_{}", prefix, self.start_date(), self.end_date())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start_date(), self.end_date())
    }
}
