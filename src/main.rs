//! Risklab CLI
//!
//! Terminal front end for the sizing model and the Monte Carlo engines.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use risklab::risk::{
    consecutive_losses_to_ruin, geometric_growth_rate, kelly_fraction, SizingModel,
};
use risklab::sim::{compute_heavy_metrics, compute_milestones, MilestoneTable};
use risklab::{CancelToken, MarketInputs, SimulationConfig};

/// Position sizing and Monte Carlo projection CLI.
#[derive(Parser)]
#[command(name = "risklab")]
#[command(about = "Project equity paths under equity-dependent position sizing", long_about = None)]
struct Cli {
    /// JSON file overriding simulation defaults
    #[arg(short, long, env = "RISKLAB_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "RISKLAB_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the risk fraction of every model at an equity level
    Fraction {
        /// Account equity in dollars
        equity: f64,

        /// Win rate percentage (0-100)
        #[arg(short, long, default_value = "50", env = "RISKLAB_WIN_RATE")]
        win_rate: f64,

        /// Reward-to-risk ratio
        #[arg(short, long, default_value = "1.5", env = "RISKLAB_REWARD_RATIO")]
        reward_ratio: f64,
    },

    /// Run the full metrics simulation
    Metrics {
        /// Account equity in dollars
        equity: f64,

        /// Win rate percentage (0-100)
        #[arg(short, long, default_value = "50", env = "RISKLAB_WIN_RATE")]
        win_rate: f64,

        /// Reward-to-risk ratio
        #[arg(short, long, default_value = "1.5", env = "RISKLAB_REWARD_RATIO")]
        reward_ratio: f64,

        /// Print every trajectory band point
        #[arg(long)]
        bands: bool,
    },

    /// Project milestone reach probabilities
    Milestones {
        /// Account equity in dollars
        equity: f64,

        /// Win rate percentage (0-100)
        #[arg(short, long, default_value = "50", env = "RISKLAB_WIN_RATE")]
        win_rate: f64,

        /// Reward-to-risk ratio
        #[arg(short, long, default_value = "1.5", env = "RISKLAB_REWARD_RATIO")]
        reward_ratio: f64,

        /// Re-roll seed
        #[arg(short, long, default_value = "555", env = "RISKLAB_SEED")]
        seed: u32,
    },

    /// Show the effective simulation configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Fraction {
            equity,
            win_rate,
            reward_ratio,
        } => {
            let inputs = MarketInputs::new(equity, win_rate, reward_ratio)?;

            println!("\n=== Risk at ${:.2} ===\n", inputs.equity());
            println!(
                "{:<12} {:>8} {:>14} {:>12}",
                "MODEL", "RISK%", "$RISK", "GROWTH"
            );
            println!("{}", "-".repeat(49));
            for model in SizingModel::ALL {
                let fraction = model.risk_fraction(inputs.equity());
                println!(
                    "{:<12} {:>7.2}% {:>14.2} {:>12.5}",
                    model.label(),
                    fraction * 100.0,
                    model.dollar_risk(inputs.equity()),
                    geometric_growth_rate(fraction, inputs.win_rate(), inputs.reward_ratio())
                );
            }
            println!();
            println!(
                "Full Kelly:     {:.2}%",
                kelly_fraction(inputs.win_rate(), inputs.reward_ratio()) * 100.0
            );
            println!(
                "Losses to ruin: {}",
                consecutive_losses_to_ruin(inputs.equity())
            );
        }

        Commands::Metrics {
            equity,
            win_rate,
            reward_ratio,
            bands,
        } => {
            let inputs = MarketInputs::new(equity, win_rate, reward_ratio)?;
            info!(equity, win_rate, reward_ratio, "Starting metrics run");

            let started = chrono::Local::now();
            let result =
                run_cancellable(move |cancel| compute_heavy_metrics(&inputs, &config, &cancel))
                    .await?;

            println!("Computed at {}", started.format("%Y-%m-%d %H:%M:%S"));
            println!("{}", result);

            if bands {
                for projection in &result.projections {
                    println!("\n--- {} median path ---", projection.model.label());
                    for point in &projection.bands {
                        println!(
                            "  step {:>3}: {:>16.2} (log10 {:>6.3})  [{:.2} - {:.2}]",
                            point.step, point.median, point.log10_median, point.p25, point.p75
                        );
                    }
                }
            }
        }

        Commands::Milestones {
            equity,
            win_rate,
            reward_ratio,
            seed,
        } => {
            let inputs = MarketInputs::new(equity, win_rate, reward_ratio)?;
            info!(equity, win_rate, reward_ratio, seed, "Starting milestone run");

            let results = run_cancellable(move |cancel| {
                compute_milestones(&inputs, seed, &config, &cancel)
            })
            .await?;

            println!("{}", MilestoneTable(&results));
        }

        Commands::Config => {
            println!("\n=== Simulation Configuration ===\n");
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Defaults, optionally overridden by a JSON file.
fn load_config(path: Option<&PathBuf>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = SimulationConfig::from_json_str(&raw)
        .with_context(|| format!("Invalid config {}", path.display()))?;

    info!(path = %path.display(), "Loaded simulation config");
    Ok(config)
}

/// Run a simulation off the async runtime; Ctrl+C trips its cancel token.
async fn run_cancellable<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(CancelToken) -> risklab::Result<T> + Send + 'static,
{
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();
    let mut handle = tokio::task::spawn_blocking(move || job(worker_cancel));

    tokio::select! {
        joined = &mut handle => {
            let result = joined.context("Simulation task panicked")?;
            Ok(result?)
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling simulation");
            cancel.cancel();
            let _ = handle.await;
            anyhow::bail!("Simulation cancelled")
        }
    }
}
