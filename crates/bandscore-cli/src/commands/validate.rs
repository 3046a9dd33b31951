//! The `bandscore validate` command.

use std::path::PathBuf;

use anyhow::Result;

use bandscore_core::pool::{check_coverage, load_pool_directory, parse_pool, StaticPool};
use bandscore_devices::load_config_from;

pub fn execute(pool_path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let pools = if pool_path.is_dir() {
        load_pool_directory(&pool_path)?
    } else {
        vec![parse_pool(&pool_path)?]
    };
    anyhow::ensure!(!pools.is_empty(), "no pool files in {}", pool_path.display());

    let mut total_warnings = 0;

    for pool in &pools {
        println!("Pool: {} ({} items)", pool.name, pool.items().len());

        let warnings = bandscore_core::pool::validate_pool(pool);
        for w in &warnings {
            let prefix = w
                .item_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    // Coverage is judged on everything the test could draw from.
    let combined = StaticPool::merged(pools);
    for w in check_coverage(&combined, &config.blueprint) {
        println!("  WARNING: {}", w.message);
        total_warnings += 1;
    }

    if total_warnings == 0 {
        println!("All pools valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
