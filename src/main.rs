//! Headless driver for the cart lab trial controller.
//!
//! ```bash
//! # Run a simulated session with the default data paths
//! cartlab run
//!
//! # Point the rig at participant 12, trial 1
//! cartlab set-participant --participant 12 --trial 1
//!
//! # Show how many copies of a product fill a shelf
//! cartlab plan-shelf
//! ```

mod app;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use cartlab_cart::stock_layout;
use cartlab_experiment::{JsonPreferences, SessionIdError, store_session_ids};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use app::App;
use config::SessionConfig;

#[derive(Parser, Debug)]
#[command(name = "cartlab")]
#[command(author, version, about = "VR shopping-trial controller", long_about = None)]
struct Cli {
    /// Session config (JSON); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level, overridden by RUST_LOG
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a session with a simulated participant (default)
    Run {
        /// Run ticks back to back instead of in real time
        #[arg(long)]
        unpaced: bool,

        /// RNG seed for a reproducible participant
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Store the participant and trial the next session starts at
    SetParticipant {
        #[arg(short, long)]
        participant: String,

        #[arg(short, long)]
        trial: String,
    },

    /// Print the stocking layout for the configured product bounds
    PlanShelf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    info!("cartlab v{}", env!("CARGO_PKG_VERSION"));
    let mut config = SessionConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run { unpaced: false, seed: None }) {
        Commands::Run { unpaced, seed } => {
            config.simulation.unpaced |= unpaced;
            if seed.is_some() {
                config.simulation.seed = seed;
            }
            let summary = App::new(config)?.run()?;
            println!(
                "Trials: {}  Purchases: {}  Walked away: {}  Stacked: {}",
                summary.trials, summary.purchases, summary.skipped, summary.stacked
            );
        }
        Commands::SetParticipant { participant, trial } => {
            let mut prefs = JsonPreferences::open(&config.preferences)?;
            match store_session_ids(&mut prefs, &participant, &trial) {
                Ok((p, t)) => println!("Set Participant ID to {p} and Trial Number to {t}."),
                Err(SessionIdError::Invalid(message)) => anyhow::bail!(message),
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!("saving session ids to {}", config.preferences.display())
                    });
                }
            }
        }
        Commands::PlanShelf => {
            let positions = stock_layout(&config.product_bounds, &config.shelf)?;
            let size = config.product_bounds.size();
            let (across, deep) = config.shelf.capacity(size);
            println!(
                "Product {:.3} x {:.3} m on a {:.2} x {:.2} m shelf: {across} across, {deep} deep",
                size.x, size.z, config.shelf.width, config.shelf.depth
            );
            for (i, p) in positions.iter().enumerate() {
                println!("  {:>2}: ({:+.3}, {:+.3}, {:+.3})", i + 1, p.x, p.y, p.z);
            }
        }
    }

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .compact()
        .init();
}
