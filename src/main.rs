//! Scaled-Entry Trade Planner
//!
//! Sizes an initial order from a risk budget, distributes a profit target
//! across pyramid top-up levels, and schedules the break-even stop for each
//! top-up activation.

mod error;
mod models;
mod planner;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::models::Instrument;
use crate::planner::{PipGainConvention, PlanEngine, PlanParams};

/// Scaled-entry trade planner CLI.
#[derive(Parser)]
#[command(name = "pyraplan")]
#[command(about = "Plan pyramid top-ups and break-even stops for one trade", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and print a trading plan
    Plan {
        /// Instrument snapshot as a JSON file (overrides the instrument flags)
        #[arg(long)]
        instrument: Option<PathBuf>,

        /// Symbol name
        #[arg(long, default_value = "EURUSD")]
        symbol: String,

        /// Venue point size
        #[arg(long, default_value = "0.00001")]
        point: Decimal,

        /// Price decimal digits
        #[arg(long, default_value = "5")]
        digits: u32,

        /// Pip value per 1.0 lot, in account currency
        #[arg(long, default_value = "10")]
        value_per_point: Decimal,

        /// Minimum tradable volume
        #[arg(long, default_value = "0.01")]
        volume_min: Decimal,

        /// Maximum tradable volume
        #[arg(long, default_value = "100")]
        volume_max: Decimal,

        /// Volume step
        #[arg(long, default_value = "0.01")]
        volume_step: Decimal,

        /// Current bid
        #[arg(long, default_value = "1.08500")]
        bid: Decimal,

        /// Current ask
        #[arg(long, default_value = "1.08630")]
        ask: Decimal,

        /// Account size in account currency
        #[arg(short, long, env = "ACCOUNT_SIZE", default_value = "1250")]
        account: Decimal,

        /// Percent of the account risked on the initial stop
        #[arg(short, long, default_value = "4")]
        risk: Decimal,

        /// Percent of the account targeted as total gain
        #[arg(short, long, default_value = "10")]
        target_gain: Decimal,

        /// Initial stop distance in pips
        #[arg(short, long, default_value = "50")]
        stop: Decimal,

        /// Take-profit distance in pips
        #[arg(short, long, default_value = "100")]
        pips: Decimal,

        /// Top-up levels as percentages of the take-profit distance
        #[arg(long, value_delimiter = ',', default_value = "35,50,65")]
        levels: Vec<Decimal>,

        /// Acceptable deviation between planned and targeted gain
        #[arg(long, default_value = "0.01")]
        tolerance: Decimal,

        /// Refit attempts before giving up
        #[arg(long, default_value = "10")]
        max_iterations: u32,

        /// Pip gain sign convention (advance, retrace)
        #[arg(long, default_value = "advance")]
        convention: String,

        /// Emit the plan as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Show the default planning configuration
    Config,
}

fn main() -> Result<()> {
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

    match cli.command {
        Commands::Plan {
            instrument,
            symbol,
            point,
            digits,
            value_per_point,
            volume_min,
            volume_max,
            volume_step,
            bid,
            ask,
            account,
            risk,
            target_gain,
            stop,
            pips,
            levels,
            tolerance,
            max_iterations,
            convention,
            json,
        } => {
            let instrument = match instrument {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading instrument file {}", path.display()))?;
                    serde_json::from_str::<Instrument>(&raw)
                        .with_context(|| format!("parsing instrument file {}", path.display()))?
                }
                None => Instrument {
                    symbol,
                    point,
                    digits,
                    value_per_point,
                    volume_min,
                    volume_max,
                    volume_step,
                    bid,
                    ask,
                    stop_level_points: Decimal::ZERO,
                    freeze_level_points: Decimal::ZERO,
                },
            };

            let params = PlanParams {
                account_size: account,
                risk_percent: risk,
                target_gain_percent: target_gain,
                initial_stop_pips: stop,
                take_profit_pips: pips,
                topup_levels: levels,
                tolerance,
                max_refit_iterations: max_iterations,
                pip_gain_convention: PipGainConvention::from_str(&convention),
            };

            info!(symbol = %instrument.symbol, "building plan");

            let engine = PlanEngine::new(params);
            let plan = engine.build_plan(&instrument)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("{}", plan);
                println!("Review the orders above and submit them through your execution tooling.");
            }
        }

        Commands::Config => {
            let params = PlanParams::default();

            println!("\n=== Planning Configuration ===\n");
            println!("Risk:");
            println!("  Account Size:         ${}", params.account_size);
            println!("  Risk Percent:         {}%", params.risk_percent);
            println!("  Risk Budget:          ${:.2}", params.risk_usd());
            println!("  Initial Stop:         {} pips", params.initial_stop_pips);

            println!("\nTarget:");
            println!("  Target Gain Percent:  {}%", params.target_gain_percent);
            println!("  Target Gain:          ${:.2}", params.target_gain());
            println!("  Take Profit:          {} pips", params.take_profit_pips);

            println!("\nTop-Ups:");
            let levels: Vec<String> = params
                .topup_levels
                .iter()
                .map(|l| format!("{}%", l))
                .collect();
            println!("  Levels:               {}", levels.join(", "));

            println!("\nValidation:");
            println!("  Tolerance:            ${}", params.tolerance);
            println!("  Max Refit Iterations: {}", params.max_refit_iterations);
            println!("  Pip Gain Convention:  {:?}", params.pip_gain_convention);
        }
    }

    Ok(())
}
