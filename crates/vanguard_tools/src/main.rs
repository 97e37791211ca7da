//! Vanguard - development tools
//!
//! # Usage
//!
//! ```bash
//! # Check every data file and scenario
//! cargo run -p vanguard_tools -- validate assets/data
//!
//! # Run a scenario headless and print the outcome
//! cargo run -p vanguard_tools -- skirmish --scenario assets/data/scenarios/skirmish.ron
//!
//! # Same, as JSON, with a different damage seed
//! cargo run -p vanguard_tools -- skirmish --scenario assets/data/scenarios/skirmish.ron --seed 7 --json
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vanguard_tools::scenario::Scenario;
use vanguard_tools::skirmish::{run_skirmish, SkirmishOptions, DEFAULT_CLIP_SECONDS};
use vanguard_tools::validate::validate_data_directory;
use vanguard_tools::{DataSet, ToolError};

#[derive(Parser)]
#[command(name = "vanguard")]
#[command(about = "Development tools for Vanguard")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },

    /// Run a scenario without graphics
    Skirmish {
        /// Scenario file to run
        #[arg(short, long)]
        scenario: PathBuf,

        /// Path to data directory
        #[arg(short, long, default_value = "assets/data")]
        data: PathBuf,

        /// Ticks to simulate (defaults to the scenario's own count)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Damage seed override
        #[arg(long)]
        seed: Option<u64>,

        /// Seconds between hits of an attack clip
        #[arg(long, default_value_t = DEFAULT_CLIP_SECONDS)]
        clip_seconds: f32,

        /// Keep running after only allies are left
        #[arg(long)]
        full: bool,

        /// Print the report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries reports. RUST_LOG wins over --verbose.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli.command) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), ToolError> {
    match command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {}", path.display());
            let report = validate_data_directory(&path)?;
            tracing::info!(
                factions = report.factions,
                units = report.units,
                buildings = report.buildings,
                scenarios = report.scenarios.len(),
                warnings = report.warnings.len(),
                "Validation passed"
            );
        }
        Commands::Skirmish {
            scenario,
            data,
            ticks,
            seed,
            clip_seconds,
            full,
            json,
        } => {
            let data = DataSet::load(&data)?;
            let scenario = Scenario::load(&scenario)?;
            let options = SkirmishOptions {
                ticks,
                seed,
                clip_seconds,
                stop_when_decided: !full,
            };
            let report = run_skirmish(&data, &scenario, &options)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.render_text());
            }
        }
    }
    Ok(())
}
