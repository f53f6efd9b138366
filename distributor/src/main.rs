use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use gauge_distributor::commands::{self, run::RunArgs};
use gauge_distributor::{config, telemetry};

#[derive(Parser)]
#[command(name = "gauge-distributor")]
#[command(about = "Distribute gauge incentives by boosted, capped vote weight", long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.gauge-distributor/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config
    Init,

    /// Validate the config and show the pool whitelist
    Check,

    /// Compute a period's distribution and write the CSV and payloads
    Run {
        /// Period snapshot (JSON)
        #[arg(long)]
        snapshot: PathBuf,

        /// End of the period as a unix timestamp (default: now)
        #[arg(long)]
        ts_bound: Option<i64>,

        /// Output directory (default: from config)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing(cli.verbose)?;

    let config_path = cli.config.unwrap_or_else(config::default_config_path);

    match cli.command {
        Commands::Init => commands::init::run(&config_path),
        Commands::Check => commands::check::run(&config_path),
        Commands::Run {
            snapshot,
            ts_bound,
            output_dir,
        } => commands::run::run(
            &config_path,
            &RunArgs {
                snapshot,
                ts_bound,
                output_dir,
            },
        ),
    }
}
