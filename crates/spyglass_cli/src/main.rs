//! Spyglass CLI
//!
//! Replay scroll scenarios, validate scenario files, and evaluate ratios.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spyglass_core::{Ratio, SpyConfig, DEFAULT_DELAY_MS};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod replay;

use config::Scenario;

#[derive(Parser)]
#[command(name = "spyglass")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Spyglass scroll-spy toolkit", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario and print every state change
    Replay {
        /// Scenario file (TOML)
        scenario: PathBuf,

        /// Print transitions as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Validate a scenario file
    Check {
        /// Scenario file (TOML)
        scenario: PathBuf,
    },

    /// Resolve a ratio against a reference length
    Ratio {
        /// Ratio such as 120, -40 or 25%
        #[arg(allow_hyphen_values = true)]
        value: String,

        /// Reference length in pixels
        total: f64,

        /// Added to negative ratios
        #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
        adjust: f64,
    },

    /// Show version and default options
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Replay { scenario, json } => cmd_replay(&scenario, json),

        Commands::Check { scenario } => cmd_check(&scenario),

        Commands::Ratio {
            value,
            total,
            adjust,
        } => cmd_ratio(&value, total, adjust),

        Commands::Info => cmd_info(),
    }
}

fn cmd_replay(path: &Path, json: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;

    info!(
        "Replaying {} ({} elements, {} steps)",
        path.display(),
        scenario.elements.len(),
        scenario.steps.len()
    );

    for problem in scenario.validate() {
        warn!("{}", problem);
    }

    let transitions = replay::run(&scenario)?;

    for transition in &transitions {
        if json {
            println!("{}", serde_json::to_string(transition)?);
        } else {
            println!(
                "{:>6}ms  {:<4} {:<20} {}",
                transition.time_ms, transition.id, transition.element, transition.state
            );
        }
    }

    Ok(())
}

fn cmd_check(path: &Path) -> Result<()> {
    let scenario = Scenario::load(path)?;

    info!("Checking scenario: {}", path.display());

    let problems = scenario.validate();
    if problems.is_empty() {
        info!(
            "{} elements and {} steps look fine",
            scenario.elements.len(),
            scenario.steps.len()
        );
        return Ok(());
    }

    for problem in &problems {
        println!("{}", problem);
    }
    anyhow::bail!("Found {} problem(s) in {}", problems.len(), path.display());
}

fn cmd_ratio(value: &str, total: f64, adjust: f64) -> Result<()> {
    let ratio = value
        .parse::<Ratio>()
        .with_context(|| format!("Cannot evaluate '{}'", value))?;

    println!("{}", ratio.resolve(total, adjust));
    Ok(())
}

fn cmd_info() -> Result<()> {
    let defaults = SpyConfig::default();

    println!("Spyglass");
    println!("========");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Default options:");
    println!("  - delay:      {}ms", DEFAULT_DELAY_MS);
    println!("  - offset:     {}", defaults.offset);
    println!("  - size:       {}", defaults.size);
    println!("  - horizontal: false");
    println!("  - contain:    {}", defaults.contain);
    println!();
    println!("Ratio syntax: -?<digits>[%]");
    println!("  negative values count back from the far edge");

    Ok(())
}
