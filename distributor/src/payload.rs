// Copyright (c) 2024 Botho Foundation

//! Transaction payloads for the multisig transaction builder.
//!
//! Both payloads start from a JSON template holding example transactions and
//! fill in recipients and wei amounts. Token amounts leave floating point here:
//! the exact binary value of each amount is truncated to 10 decimal places,
//! then scaled to wei and rounded to an integer in decimal arithmetic. So
//! `0.3` becomes `0.2999999999`, not its shortest printed form.
//!
//! - Injector stream: `[claim, setRecipientList, transfer]`. The recipient
//!   list carries per-period amounts; the transfer funds the whole epoch.
//! - Aura direct stream: `[approve, stream, stream, ...]`, one stream per gauge
//!   routing a share to Aura, approve covering the total.

use anyhow::Context;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::pipeline::DistributionRow;

/// Built-in injector template
pub const BAL_INJECTOR_TEMPLATE: &str = include_str!("../data/output_tx_template.json");

/// Built-in Aura direct-stream template
pub const AURA_DIRECT_TEMPLATE: &str = include_str!("../data/aura_direct_stream.json");

/// Decimal places kept before converting to wei
const AMOUNT_DECIMALS: u32 = 10;

const WEI_PER_TOKEN: u64 = 1_000_000_000_000_000_000;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Template has no transaction {index}")]
    MissingTransaction { index: usize },

    #[error("Template transaction {index} has no contractInputsValues object")]
    MissingInputs { index: usize },

    #[error("Amount {0} can't be expressed in wei")]
    InvalidAmount(f64),

    #[error("Amount {0} overflows when scaled to wei")]
    WeiOverflow(Decimal),

    #[error("Number of periods must be positive")]
    ZeroPeriods,
}

/// Truncate a token amount to [`AMOUNT_DECIMALS`] places
fn epoch_amount(tokens: f64) -> Result<Decimal, PayloadError> {
    if !(tokens.is_finite() && tokens >= 0.0) {
        return Err(PayloadError::InvalidAmount(tokens));
    }
    let amount = Decimal::from_f64_retain(tokens).ok_or(PayloadError::InvalidAmount(tokens))?;
    Ok(amount.round_dp_with_strategy(AMOUNT_DECIMALS, RoundingStrategy::ToZero))
}

/// Scale a token amount to an integral number of wei
fn to_wei(amount: Decimal) -> Result<Decimal, PayloadError> {
    amount
        .checked_mul(Decimal::from(WEI_PER_TOKEN))
        .map(|wei| wei.round())
        .ok_or(PayloadError::WeiOverflow(amount))
}

fn template_tx(template: &Value, index: usize) -> Result<Value, PayloadError> {
    let tx = template
        .get("transactions")
        .and_then(|txs| txs.get(index))
        .ok_or(PayloadError::MissingTransaction { index })?;
    if !tx.get("contractInputsValues").is_some_and(Value::is_object) {
        return Err(PayloadError::MissingInputs { index });
    }
    Ok(tx.clone())
}

fn set_input(tx: &mut Value, key: &str, value: String) {
    if let Some(inputs) = tx
        .get_mut("contractInputsValues")
        .and_then(Value::as_object_mut)
    {
        inputs.insert(key.to_string(), Value::String(value));
    }
}

fn with_transactions(template: &Value, transactions: Vec<Value>) -> Value {
    let mut payload = template.clone();
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("transactions".to_string(), Value::Array(transactions));
    }
    payload
}

/// Populate the injector template from the Balancer side of each row.
///
/// Rows with nothing for the injector are left out. Returns `None` when no
/// row has anything to stream.
pub fn build_bal_injector_transaction(
    template: &Value,
    rows: &[DistributionRow],
    num_periods: u32,
) -> Result<Option<Value>, PayloadError> {
    if num_periods == 0 {
        return Err(PayloadError::ZeroPeriods);
    }
    let claim_tx = template_tx(template, 0)?;
    let mut recipients_tx = template_tx(template, 1)?;
    let mut transfer_tx = template_tx(template, 2)?;

    let periods = Decimal::from(num_periods);
    let mut gauges = Vec::new();
    let mut amounts = Vec::new();
    let mut max_periods = Vec::new();
    let mut total = Decimal::ZERO;

    for row in rows {
        let epoch = epoch_amount(row.distro_to_balancer)?;
        let epoch_wei = to_wei(epoch)?;
        if epoch_wei.is_zero() {
            continue;
        }
        let per_period_wei = to_wei(epoch / periods)?;

        gauges.push(row.recipient.clone());
        amounts.push(per_period_wei.to_string());
        max_periods.push(num_periods.to_string());
        total += epoch_wei;
    }

    if gauges.is_empty() {
        return Ok(None);
    }

    set_input(&mut recipients_tx, "gaugeAddresses", format!("[{}]", gauges.join(",")));
    set_input(&mut recipients_tx, "amountsPerPeriod", format!("[{}]", amounts.join(",")));
    set_input(&mut recipients_tx, "maxPeriods", format!("[{}]", max_periods.join(",")));
    set_input(&mut transfer_tx, "amount", total.to_string());

    info!(
        recipients = gauges.len(),
        total_wei = %total,
        "Built injector stream payload"
    );

    Ok(Some(with_transactions(
        template,
        vec![claim_tx, recipients_tx, transfer_tx],
    )))
}

/// Populate the Aura direct-stream template from the Aura side of each row.
///
/// `aura_pid` maps a recipient address to its Aura pool id; recipients
/// without one keep their address in `_pid` so the gap is easy to spot.
/// Returns `None` when no row streams a nonzero amount to Aura.
pub fn build_aura_direct_transaction<F>(
    template: &Value,
    rows: &[DistributionRow],
    aura_pid: F,
    num_periods: u32,
) -> Result<Option<Value>, PayloadError>
where
    F: Fn(&str) -> Option<String>,
{
    if num_periods == 0 {
        return Err(PayloadError::ZeroPeriods);
    }
    let mut approve_tx = template_tx(template, 0)?;
    let stream_template = template_tx(template, 1)?;

    let mut streams = Vec::new();
    let mut total = Decimal::ZERO;
    for row in rows {
        let wei = to_wei(epoch_amount(row.distro_to_aura)?)?;
        if wei.is_zero() {
            continue;
        }

        let pid = aura_pid(&row.recipient).unwrap_or_else(|| {
            warn!(
                recipient = %row.recipient,
                "No aura pid found for gauge, using gauge address in payload instead"
            );
            row.recipient.clone()
        });

        let mut tx = stream_template.clone();
        set_input(&mut tx, "_pid", pid);
        set_input(&mut tx, "_amount", wei.to_string());
        set_input(&mut tx, "_periods", num_periods.to_string());
        streams.push(tx);
        total += wei;
    }

    if streams.is_empty() {
        info!("No distributions to send to aura direct");
        return Ok(None);
    }

    set_input(&mut approve_tx, "amount", total.to_string());
    info!(
        streams = streams.len(),
        total_wei = %total,
        "Built aura direct stream payload"
    );

    let mut transactions = Vec::with_capacity(streams.len() + 1);
    transactions.push(approve_tx);
    transactions.extend(streams);
    Ok(Some(with_transactions(template, transactions)))
}

/// Load a template file, or parse the built-in one when no path is given
pub fn load_template(path: Option<&Path>, builtin: &str) -> anyhow::Result<Value> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read template from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse template from {}", path.display()))
        }
        None => serde_json::from_str(builtin).context("Failed to parse built-in template"),
    }
}

pub fn write_payload(payload: &Value, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let contents = serde_json::to_string_pretty(payload).context("Failed to serialize payload")?;
    fs::write(path, contents)
        .with_context(|| format!("Failed to write payload to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(recipient: &str, to_balancer: f64, to_aura: f64) -> DistributionRow {
        DistributionRow {
            gauge_address: format!("{recipient}-gauge"),
            recipient: recipient.to_string(),
            pool_address: String::new(),
            pool_id: String::new(),
            symbol: String::new(),
            distribution: to_balancer + to_aura,
            pct_distribution: 0.0,
            distro_to_balancer: to_balancer,
            distro_to_aura: to_aura,
            vote_weight_no_boost: 0.0,
            static_boost: 1.0,
            dynamic_boost: 1.0,
            boost: 1.0,
            vote_weight: 0.0,
            cap_percent: 100.0,
            fixed_incentive: 0.0,
            capped: false,
        }
    }

    fn injector_template() -> Value {
        load_template(None, BAL_INJECTOR_TEMPLATE).unwrap()
    }

    fn aura_template() -> Value {
        load_template(None, AURA_DIRECT_TEMPLATE).unwrap()
    }

    fn inputs(tx: &Value) -> &serde_json::Map<String, Value> {
        tx["contractInputsValues"].as_object().unwrap()
    }

    #[test]
    fn test_epoch_amount_truncates() {
        assert_eq!(epoch_amount(1.123456789019).unwrap().to_string(), "1.1234567890");
        assert_eq!(to_wei(epoch_amount(0.5).unwrap()).unwrap().to_string(), "500000000000000000");
        // 0.3 is stored as 0.29999999999999998889...
        assert_eq!(epoch_amount(0.3).unwrap().to_string(), "0.2999999999");
        assert_eq!(
            to_wei(epoch_amount(0.3).unwrap()).unwrap().to_string(),
            "299999999900000000"
        );
        assert!(epoch_amount(-1.0).is_err());
        assert!(epoch_amount(f64::NAN).is_err());
    }

    #[test]
    fn test_bal_injector_payload() {
        let rows = vec![row("0xA", 600.0, 0.0), row("0xB", 300.5, 0.0)];

        let payload = build_bal_injector_transaction(&injector_template(), &rows, 2)
            .unwrap()
            .unwrap();

        let txs = payload["transactions"].as_array().unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0]["contractMethod"]["name"], "claim");
        assert_eq!(txs[1]["contractMethod"]["name"], "setRecipientList");
        assert_eq!(txs[2]["contractMethod"]["name"], "transfer");

        let recipients = inputs(&txs[1]);
        assert_eq!(recipients["gaugeAddresses"], "[0xA,0xB]");
        assert_eq!(
            recipients["amountsPerPeriod"],
            "[300000000000000000000,150250000000000000000]"
        );
        assert_eq!(recipients["maxPeriods"], "[2,2]");
        assert_eq!(inputs(&txs[2])["amount"], "900500000000000000000");
        // Template metadata is kept
        assert_eq!(payload["chainId"], "42161");
    }

    #[test]
    fn test_bal_injector_skips_aura_only_rows() {
        let rows = vec![row("0xA", 100.0, 0.0), row("0xB", 0.0, 50.0)];
        let payload = build_bal_injector_transaction(&injector_template(), &rows, 1)
            .unwrap()
            .unwrap();
        assert_eq!(
            inputs(&payload["transactions"][1])["gaugeAddresses"],
            "[0xA]"
        );

        let aura_only = vec![row("0xB", 0.0, 50.0)];
        assert!(build_bal_injector_transaction(&injector_template(), &aura_only, 1)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_aura_direct_payload() {
        let rows = vec![row("0xA", 75.0, 25.0), row("0xB", 100.0, 0.0), row("0xC", 0.0, 10.0)];
        let pids = |recipient: &str| (recipient == "0xA").then(|| "42".to_string());

        let payload = build_aura_direct_transaction(&aura_template(), &rows, pids, 2)
            .unwrap()
            .unwrap();

        let txs = payload["transactions"].as_array().unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0]["contractMethod"]["name"], "approve");
        assert_eq!(inputs(&txs[0])["amount"], "35000000000000000000");

        assert_eq!(inputs(&txs[1])["_pid"], "42");
        assert_eq!(inputs(&txs[1])["_amount"], "25000000000000000000");
        assert_eq!(inputs(&txs[1])["_periods"], "2");
        // Missing pid falls back to the recipient address
        assert_eq!(inputs(&txs[2])["_pid"], "0xC");
    }

    #[test]
    fn test_aura_direct_skipped_without_aura_share() {
        let rows = vec![row("0xA", 100.0, 0.0)];
        let payload =
            build_aura_direct_transaction(&aura_template(), &rows, |_: &str| None, 2).unwrap();
        assert!(payload.is_none());
    }

    #[test]
    fn test_malformed_template() {
        let template: Value = serde_json::json!({ "transactions": [] });
        assert!(matches!(
            build_bal_injector_transaction(&template, &[row("0xA", 1.0, 0.0)], 2),
            Err(PayloadError::MissingTransaction { index: 0 })
        ));

        let template: Value = serde_json::json!({ "transactions": [{ "to": "0x0" }] });
        assert!(matches!(
            build_aura_direct_transaction(&template, &[], |_: &str| None, 2),
            Err(PayloadError::MissingInputs { index: 0 })
        ));
    }

    #[test]
    fn test_zero_periods_rejected() {
        assert!(matches!(
            build_bal_injector_transaction(&injector_template(), &[], 0),
            Err(PayloadError::ZeroPeriods)
        ));
    }

    #[test]
    fn test_write_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("payload.json");
        write_payload(&injector_template(), &path).unwrap();

        let loaded = load_template(Some(&path), "").unwrap();
        assert_eq!(loaded, injector_template());
    }
}
