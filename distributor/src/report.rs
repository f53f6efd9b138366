// Copyright (c) 2024 Botho Foundation

//! Distribution reporter.
//!
//! Renders a [`DistributionReport`] as the CSV audit file and as the
//! plain-text summary shown after a run.

use anyhow::{Context, Result};
use gauge_allocation::AllocationStatus;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::pipeline::{DistributionReport, DistributionRow};

const CSV_HEADER: [&str; 14] = [
    "recipientGaugeAddr",
    "poolAddress",
    "symbol",
    "distribution",
    "pctDistribution",
    "distroToBalancer",
    "distroToAura",
    "voteWeightNoBoost",
    "staticBoost",
    "dynamicBoost",
    "boost",
    "voteWeight",
    "cap",
    "fixedIncentive",
];

/// CSV text for the report rows, in report order
pub fn csv_string(report: &DistributionReport) -> String {
    let mut out = String::new();
    push_record(&mut out, CSV_HEADER.iter().map(|h| h.to_string()));
    for row in &report.rows {
        push_record(&mut out, csv_fields(row));
    }
    out
}

pub fn write_csv(report: &DistributionReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, csv_string(report))
        .with_context(|| format!("Failed to write CSV to {}", path.display()))
}

fn csv_fields(row: &DistributionRow) -> impl Iterator<Item = String> {
    [
        row.recipient.clone(),
        row.pool_address.clone(),
        row.symbol.clone(),
        row.distribution.to_string(),
        row.pct_distribution.to_string(),
        row.distro_to_balancer.to_string(),
        row.distro_to_aura.to_string(),
        row.vote_weight_no_boost.to_string(),
        row.static_boost.to_string(),
        row.dynamic_boost.to_string(),
        row.boost.to_string(),
        row.vote_weight.to_string(),
        format!("{}%", row.cap_percent),
        row.fixed_incentive.to_string(),
    ]
    .into_iter()
}

fn push_record(out: &mut String, fields: impl Iterator<Item = String>) {
    let line = fields.map(|f| escape(&f)).collect::<Vec<_>>().join(",");
    out.push_str(&line);
    out.push('\n');
}

/// Quote a field if it holds a separator, quote or line break
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Human-readable run summary
pub fn summary(report: &DistributionReport) -> String {
    Summary(report).to_string()
}

struct Summary<'a>(&'a DistributionReport);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;

        writeln!(f, "=== Gauge Distribution {} ===", report.period)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<44} {:<24} {:>14} {:>8} {:>7} {:>12}",
            "Recipient", "Symbol", "Distribution", "Pct", "Boost", "To Aura"
        )?;
        for row in &report.rows {
            writeln!(
                f,
                "{:<44} {:<24} {:>14.4} {:>7.3}% {:>7.3} {:>12.4}{}",
                row.recipient,
                truncate(&row.symbol, 24),
                row.distribution,
                row.pct_distribution,
                row.boost,
                row.distro_to_aura,
                if row.capped { "  (capped)" } else { "" }
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Eligible gauges:      {}", report.eligible_gauges)?;
        writeln!(f, "Receiving gauges:     {}", report.rows.len())?;
        writeln!(f, "Capped gauges:        {}", report.capped_gauges())?;
        writeln!(f, "Redistribution passes: {}", report.passes)?;
        writeln!(f, "Protocol fees (USD):  {:.2}", report.total_protocol_fees)?;
        writeln!(f, "Total budget:         {:.4}", report.total_budget)?;
        writeln!(f, "Tokens distributed:   {:.4}", report.distributed)?;
        writeln!(f, "  to Balancer:        {:.4}", report.total_to_balancer())?;
        writeln!(f, "  to Aura:            {:.4}", report.total_to_aura())?;
        writeln!(f, "Unspent:              {:.4}", report.unspent)?;

        if let AllocationStatus::CapacityExhausted { unspent } = report.status {
            writeln!(f)?;
            writeln!(
                f,
                "WARNING: caps left {:.4} tokens undistributed; double check the distribution",
                unspent
            )?;
        }
        for gauge in &report.over_committed {
            writeln!(f, "WARNING: fixed emissions for {} exceed its cap", gauge)?;
        }

        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max - 1).collect();
        t.push('~');
        t
    }
}
