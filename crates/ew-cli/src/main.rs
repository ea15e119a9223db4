//! CLI frontend for Emberwild scenarios.

mod commands;
mod scenario;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ew",
    about = "Emberwild: run and inspect server simulation scenarios",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a scenario and validate its content
    Check {
        /// Scenario JSON file
        file: PathBuf,
    },

    /// Run a tick-based simulation of a scenario
    Simulate {
        /// Scenario JSON file
        file: PathBuf,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "100")]
        ticks: u64,

        /// Seconds per tick
        #[arg(long, default_value = "0.1")]
        dt: f32,

        /// RNG seed (overrides the scenario's)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Show all events (not just summary)
        #[arg(short, long)]
        verbose: bool,
    },

    /// Walk a conversation with an NPC
    Talk {
        /// Scenario JSON file
        file: PathBuf,

        /// NPC name
        npc: String,

        /// Player name (default: first player in the scenario)
        #[arg(short, long)]
        player: Option<String>,

        /// Choice labels to pick, in order
        #[arg(short, long = "choose")]
        choices: Vec<String>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("EW_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| "ew=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { file } => commands::check::run(&file),
        Commands::Simulate {
            file,
            ticks,
            dt,
            seed,
            verbose,
        } => commands::simulate::run(&file, ticks, dt, seed, verbose),
        Commands::Talk {
            file,
            npc,
            player,
            choices,
        } => commands::talk::run(&file, &npc, player.as_deref(), &choices),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
