//! The `bandscore consent` command.

use std::path::PathBuf;

use anyhow::Result;

use bandscore_devices::config::CONFIG_FILE_NAME;
use bandscore_devices::set_consent;

pub fn execute(accept: bool, config_path: Option<PathBuf>) -> Result<()> {
    let path = config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    set_consent(&path, accept)?;
    if accept {
        println!("Disclaimer accepted in {}", path.display());
    } else {
        println!("Disclaimer acceptance revoked in {}", path.display());
    }
    Ok(())
}
