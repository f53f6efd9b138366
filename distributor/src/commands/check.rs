use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::pools::PoolOverrides;

/// Validate the config and print the whitelist it describes
pub fn run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)
        .context("No config found. Run 'gauge-distributor init' first.")?;

    let overrides = PoolOverrides::from_config(&config.distribution, &config.pools)
        .with_context(|| format!("Invalid pool configuration in {}", config_path.display()))?;

    let distribution = &config.distribution;
    println!();
    println!("=== Distribution Config ===");
    println!();
    println!("Chain:                 {}", distribution.chain_name);
    println!("Tokens per epoch:      {}", distribution.total_tokens_per_epoch);
    println!("  fixed incentives:    {}", distribution.fixed_incentive_tokens_per_epoch);
    println!("  following the vote:  {}", distribution.tokens_to_follow_voting());
    println!("Dynamic boost cap:     {}", distribution.dynamic_boost_cap);
    println!("Min USD for boost:     {}", distribution.min_usd_for_boost);
    println!("Default cap:           {:.4}%", overrides.default_cap());
    println!(
        "Epoch:                 {} days, streamed over {} periods",
        distribution.epoch_days, distribution.num_periods
    );
    println!();
    println!(
        "{:<68} {:>6} {:>9} {:>10} {:>6}",
        "Pool", "Boost", "Cap", "Fixed", "Aura"
    );
    for pool in overrides.iter() {
        println!(
            "{:<68} {:>6.2} {:>8.3}% {:>10.2} {:>5.0}%",
            pool.pool_id.as_str(),
            pool.static_boost,
            pool.cap_percent,
            pool.fixed_emissions,
            pool.pct_to_aura * 100.0
        );
    }
    println!();
    println!("{} pools whitelisted, config OK.", overrides.len());

    Ok(())
}
