//! bandscore CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{ArgGroup, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "bandscore",
    version,
    about = "Timed language-exam practice sessions with band scoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated test session with a scripted candidate
    Simulate {
        /// Path to a .toml item pool or a directory of pools
        #[arg(long)]
        pool: PathBuf,

        /// Candidate script (default: answer from the key, speak 30s)
        #[arg(long)]
        script: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seed for item selection (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Deliver ticks in wall-clock time instead of immediately
        #[arg(long)]
        realtime: bool,

        /// Output directory
        #[arg(long, default_value = "./bandscore-results")]
        output: PathBuf,

        /// Output format: json, html, all
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Show a saved session report
    Show {
        /// Report JSON
        #[arg(long)]
        report: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Compare a retake against an earlier attempt
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Band moves up to this size count as unchanged
        #[arg(long, default_value = "0")]
        threshold: u32,

        /// Exit code 1 if any band declined
        #[arg(long)]
        fail_on_decline: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Also write an HTML comparison to this path
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Validate item pool TOML files
    Validate {
        /// Path to pool file or directory
        #[arg(long)]
        pool: PathBuf,

        /// Config file whose blueprint the pool is checked against
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Record or withdraw acceptance of the disclaimer
    #[command(group(ArgGroup::new("decision").required(true).args(["accept", "revoke"])))]
    Consent {
        #[arg(long)]
        accept: bool,

        #[arg(long)]
        revoke: bool,

        /// Config file to update (default: ./bandscore.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config, practice pool and candidate script
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bandscore=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            pool,
            script,
            config,
            seed,
            realtime,
            output,
            format,
        } => {
            commands::simulate::execute(pool, script, config, seed, realtime, output, format).await
        }
        Commands::Show { report, format } => commands::show::execute(report, format),
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_decline,
            format,
            html,
        } => commands::compare::execute(baseline, current, threshold, fail_on_decline, format, html),
        Commands::Validate { pool, config } => commands::validate::execute(pool, config),
        Commands::Consent {
            accept,
            revoke: _,
            config,
        } => commands::consent::execute(accept, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
