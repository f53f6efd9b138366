// Copyright (c) 2024 Botho Foundation

//! Logging setup for the CLI.
//!
//! Logs go to stderr so stdout stays free for command output. The level is
//! INFO, or DEBUG with `--verbose`; `RUST_LOG` overrides both.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::new(if verbose { "debug" } else { "info" })
}

/// Install the global tracing subscriber
pub fn init_tracing(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
