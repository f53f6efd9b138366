use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{resolve_relative, Config};
use crate::payload::{
    build_aura_direct_transaction, build_bal_injector_transaction, load_template, write_payload,
    AURA_DIRECT_TEMPLATE, BAL_INJECTOR_TEMPLATE,
};
use crate::period::Period;
use crate::pipeline::{run_period, DistributionReport};
use crate::pools::PoolOverrides;
use crate::report;
use crate::snapshot::PeriodSnapshot;

/// Options for one run
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub snapshot: PathBuf,
    /// End of the period as a unix timestamp (now if unset)
    pub ts_bound: Option<i64>,
    /// Overrides the output directory from the config
    pub output_dir: Option<PathBuf>,
}

/// Files written by a run
#[derive(Debug)]
pub struct RunOutcome {
    pub report: DistributionReport,
    pub csv: PathBuf,
    pub bal_injector: Option<PathBuf>,
    pub aura_direct: Option<PathBuf>,
}

/// Run the distribution and print a summary
pub fn run(config_path: &Path, args: &RunArgs) -> Result<()> {
    let outcome = execute(config_path, args)?;

    println!();
    print!("{}", report::summary(&outcome.report));
    println!();
    println!("CSV written to: {}", outcome.csv.display());
    match &outcome.bal_injector {
        Some(path) => println!("Injector payload written to: {}", path.display()),
        None => println!("No injector payload (nothing routed to the injector)"),
    }
    match &outcome.aura_direct {
        Some(path) => println!("Aura direct payload written to: {}", path.display()),
        None => println!("No aura direct payload (nothing routed to Aura)"),
    }

    Ok(())
}

/// Run the distribution and write every output file
pub fn execute(config_path: &Path, args: &RunArgs) -> Result<RunOutcome> {
    let config = Config::load(config_path)
        .context("No config found. Run 'gauge-distributor init' first.")?;
    let distribution = &config.distribution;

    let overrides = PoolOverrides::from_config(distribution, &config.pools)
        .with_context(|| format!("Invalid pool configuration in {}", config_path.display()))?;

    let snapshot = PeriodSnapshot::load(&args.snapshot)?;

    let period = match args.ts_bound {
        Some(ts) => Period::ending_at(ts, distribution.epoch_days)?,
        None => Period::ending_now(distribution.epoch_days)?,
    };
    info!(period = %period, "Collected data for period");

    let report = run_period(distribution, &overrides, &snapshot, period)
        .with_context(|| format!("Distribution failed for {}", period))?;

    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => resolve_relative(config_path, &config.output.dir),
    };
    let stem = period.file_stem(&distribution.file_prefix);

    let csv = output_dir.join(format!("{stem}.csv"));
    report::write_csv(&report, &csv)?;

    let template_path = |path: &Option<PathBuf>| {
        path.as_ref()
            .map(|p| resolve_relative(config_path, p))
    };

    let injector_template = load_template(
        template_path(&config.output.bal_injector_template).as_deref(),
        BAL_INJECTOR_TEMPLATE,
    )?;
    let bal_injector = match build_bal_injector_transaction(
        &injector_template,
        &report.rows,
        distribution.num_periods,
    )? {
        Some(payload) => {
            let path = output_dir.join(format!("{stem}_bal_injector_stream.json"));
            write_payload(&payload, &path)?;
            Some(path)
        }
        None => None,
    };

    let aura_template = load_template(
        template_path(&config.output.aura_direct_template).as_deref(),
        AURA_DIRECT_TEMPLATE,
    )?;
    let aura_direct = match build_aura_direct_transaction(
        &aura_template,
        &report.rows,
        |recipient| snapshot.aura_pid(recipient).map(str::to_string),
        distribution.num_periods,
    )? {
        Some(payload) => {
            let path = output_dir.join(format!("{stem}_aura_direct_stream.json"));
            write_payload(&payload, &path)?;
            Some(path)
        }
        None => None,
    };

    Ok(RunOutcome {
        report,
        csv,
        bal_injector,
        aura_direct,
    })
}
