// Copyright (c) 2024 Botho Foundation

//! Gauge incentive distributor.
//!
//! Reads a distribution config and a period snapshot, allocates the epoch's
//! incentive tokens across whitelisted gauges with `gauge-allocation`, and
//! writes the audit CSV and the multisig transaction payloads.

#![deny(clippy::print_stdout)]

pub mod config;
pub mod fees;
pub mod payload;
pub mod period;
pub mod pipeline;
pub mod pools;
pub mod report;
pub mod snapshot;
pub mod telemetry;

// Re-export commands module for CLI binary
pub mod commands;
