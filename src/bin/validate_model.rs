//! CI model validation gate
//!
//! Trains (or loads a registered run), compares averaged holdout metrics with
//! the thresholds and writes a JSON report.
//!
//! Exit codes:
//! - 0: passed, or skipped because no data or model was available
//! - 1: metrics below threshold
//! - 2: unexpected error

use clap::Parser;
use std::path::PathBuf;
use weather_forecast::{
    config::Config,
    logging,
    registry::Stage,
    validation::{self, ValidationOutcome, ValidationRequest, ValidationSource, ValidationThresholds},
};

#[derive(Parser)]
#[command(name = "validate_model")]
#[command(about = "Validate forecast model metrics against thresholds")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Minimum average R² (overrides config)
    #[arg(long)]
    min_r2: Option<f64>,

    /// Maximum average RMSE (overrides config)
    #[arg(long)]
    max_rmse: Option<f64>,

    /// Directory the trained artifact is written to
    #[arg(long, default_value = "./model")]
    model_path: String,

    /// History CSV to train on; synthetic history when omitted
    #[arg(long, conflicts_with = "from_stage")]
    data: Option<PathBuf>,

    /// Validate the newest run registered at this stage instead of training
    #[arg(long)]
    from_stage: Option<Stage>,

    /// Report output path
    #[arg(long, default_value = "validation_report.json")]
    report: PathBuf,

    /// Print a human-readable summary
    #[arg(long)]
    summary: bool,
}

fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(2);
        }
    };
    logging::init(&config.logging);

    let request = ValidationRequest {
        thresholds: ValidationThresholds {
            min_r2: args.min_r2.unwrap_or(config.validation.min_r2),
            max_rmse: args.max_rmse.unwrap_or(config.validation.max_rmse),
        },
        source: match args.from_stage {
            Some(stage) => ValidationSource::Registered { stage },
            None => ValidationSource::Train { data: args.data },
        },
        model_path: args.model_path,
        report_path: args.report,
    };

    let outcome = validation::run(&config, &request);

    if args.summary {
        if let Some(report) = outcome.report() {
            println!("{}", report.summary());
        }
    }
    match &outcome {
        ValidationOutcome::Passed(_) => println!("✅ Model validation passed"),
        ValidationOutcome::BelowThreshold(report) => {
            for failure in &report.failures {
                println!("  ✗ {}", failure);
            }
            println!("❌ Model validation failed");
        }
        ValidationOutcome::Skipped { reason } => println!("⚠️  Validation skipped: {}", reason),
        ValidationOutcome::Errored { message } => eprintln!("Validation error: {}", message),
    }

    std::process::exit(outcome.exit_code());
}
