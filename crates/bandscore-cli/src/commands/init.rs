//! The `bandscore init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("bandscore.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("pools")?;
    write_if_missing(Path::new("pools/practice.toml"), PRACTICE_POOL)?;

    std::fs::create_dir_all("scripts")?;
    write_if_missing(Path::new("scripts/candidate.toml"), SAMPLE_SCRIPT)?;

    println!("\nNext steps:");
    println!("  1. Review the disclaimer, then run: bandscore consent --accept");
    println!("  2. Run: bandscore validate --pool pools/practice.toml");
    println!("  3. Run: bandscore simulate --pool pools/practice.toml --script scripts/candidate.toml");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# bandscore configuration

# Fixed seed for item selection. Remove for a fresh draw every run.
# seed = 7

[consent]
# Set by `bandscore consent --accept`.
accepted = false

[timing]
default_item_secs = 120
reading_warning_secs = 60
intro_recording_secs = 25
repeat_prepare_secs = 3
repeat_record_secs = 10
extended_prepare_secs = 40
extended_record_secs = 40
tick_millis = 1000

[scoring]
min_audio_bytes = 1024
partial_credit = 0.75

[scoring.grammar]
mode = "lenient"
# mode = "sampled"
# error_probability = 0.1
# seed = 1

[devices]
capture = "synthetic"
bytes_per_second = 8000
speech = "logging"
"#;

const PRACTICE_POOL: &str = include_str!("../../../../pools/practice.toml");

const SAMPLE_SCRIPT: &str = include_str!("../../../../scripts/strong.toml");
