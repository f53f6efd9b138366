use anyhow::{bail, Result};
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::pools::PoolEntry;

/// Run the init command
pub fn run(config_path: &Path) -> Result<()> {
    if Config::exists(config_path) {
        bail!(
            "Config already exists at {}\nUse a different --config path or delete the existing config.",
            config_path.display()
        );
    }

    let mut config = Config::new();
    config.pools.push(PoolEntry::new(""));
    config.save(config_path)?;

    info!("Config initialized at {}", config_path.display());
    println!("\nDistribution config created.");
    println!("Config saved to: {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Set total and fixed incentive tokens under [distribution]");
    println!("  2. Fill in the [[pools]] whitelist");
    println!("  3. Run 'gauge-distributor check' to validate it");
    println!("  4. Run 'gauge-distributor run --snapshot <file>' for a period");

    Ok(())
}
