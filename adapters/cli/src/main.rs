#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays encirclement scenarios headlessly.

mod scenario;
mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use errand_world::{query, World};
use tracing_subscriber::EnvFilter;

use crate::{scenario::Scenario, simulation::Session};

#[derive(Debug, Parser)]
#[command(name = "errand")]
#[command(about = "Territory encirclement engine driven from scenario files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Plays a scenario file to completion and prints the outcome.
    Run {
        /// Path to the scenario TOML file.
        scenario: PathBuf,
        /// Upper bound on simulated frames (ticks).
        #[arg(long, default_value_t = 20_000)]
        max_ticks: u64,
        /// Simulated milliseconds per frame.
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,
    },
    /// Prints the welcome banner.
    Banner,
}

/// Entry point for the errand command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match Cli::parse().command {
        Commands::Run {
            scenario,
            max_ticks,
            frame_ms,
        } => {
            if frame_ms == 0 {
                bail!("--frame-ms must be at least 1");
            }
            let loaded = Scenario::load(&scenario)
                .with_context(|| format!("failed to load scenario {}", scenario.display()))?;
            let summary =
                Session::new(&loaded, Duration::from_millis(frame_ms)).run(max_ticks);
            println!("{summary}");
        }
        Commands::Banner => println!("{}", query::welcome_banner(&World::new())),
    }
    Ok(())
}
