//! Weather Forecast CLI
//!
//! Trains the per-target ensembles, manages registered versions and serves
//! multi-day forecasts from the command line.

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use weather_forecast::{
    config::Config,
    data::{load_frame, load_records, synthetic_history, write_records},
    features::FeatureFrame,
    forecast::{ForecastService, ForecastSource, MAX_HORIZON},
    logging,
    registry::{ModelRegistry, Stage},
    training::Trainer,
    types::Target,
    validation::SYNTHETIC_SEED,
};

#[derive(Parser)]
#[command(name = "weather-forecast")]
#[command(about = "Daily weather forecasting with weighted tree ensembles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new model version and register it
    Train {
        /// Daily history CSV; synthetic history when omitted
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Days of synthetic history (overrides config)
        #[arg(long)]
        synthetic_days: Option<usize>,
        /// Promote the new version to Production
        #[arg(long)]
        promote: bool,
    },
    /// Forecast the days after the last record of a history CSV
    Forecast {
        /// Daily history CSV; its last row seeds the forecast
        #[arg(short, long)]
        input: PathBuf,
        /// Days to forecast
        #[arg(short, long, default_value_t = 7)]
        days: usize,
        /// Registry stage to serve from (defaults to the configured one)
        #[arg(long)]
        stage: Option<Stage>,
        /// Use only the last record instead of the full history
        #[arg(long)]
        seed_only: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Move a registered version to a stage
    Promote {
        version: u32,
        #[arg(long, default_value = "production")]
        stage: Stage,
    },
    /// List registered versions
    Models,
    /// Write seeded synthetic history to CSV
    Synthesize {
        #[arg(short, long, default_value_t = 3650)]
        days: usize,
        #[arg(short, long, default_value = "data/weather_history.csv")]
        output: PathBuf,
        #[arg(long, default_value_t = SYNTHETIC_SEED)]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    logging::init(&config.logging);

    match cli.command {
        Commands::Train {
            data,
            synthetic_days,
            promote,
        } => train(&config, data, synthetic_days, promote),
        Commands::Forecast {
            input,
            days,
            stage,
            seed_only,
            json,
        } => forecast(&config, &input, days, stage, seed_only, json),
        Commands::Promote { version, stage } => promote(&config, version, stage),
        Commands::Models => list_models(&config),
        Commands::Synthesize { days, output, seed } => synthesize(days, &output, seed),
    }
}

fn train(config: &Config, data: Option<PathBuf>, synthetic_days: Option<usize>, promote: bool) -> anyhow::Result<()> {
    let frame = match data {
        Some(path) => load_frame(&path)?,
        None => {
            let days = synthetic_days.unwrap_or(config.training.synthetic_days);
            let records = synthetic_history(days, Utc::now().date_naive(), SYNTHETIC_SEED)?;
            FeatureFrame::from_records(&records)?
        }
    };

    let outcome = Trainer::from_config(config).train(&frame)?;
    let registry = ModelRegistry::open(&config.registry)?;
    let entry = registry.persist(&outcome.artifact)?;

    println!("\n🌦  Training run {}\n", outcome.run.run_id);
    println!(
        "Window: {} .. {} ({} train / {} test rows)\n",
        outcome.run.window.start, outcome.run.window.end, outcome.run.window.train_rows, outcome.run.window.test_rows
    );
    println!("{:<15} {:>10} {:>10} {:>10}", "Target", "RMSE", "MAE", "R²");
    println!("{}", "-".repeat(48));
    for (target, m) in &outcome.run.metrics {
        println!("{:<15} {:>10.4} {:>10.4} {:>10.4}", target, m.rmse, m.mae, m.r2);
    }
    println!("{}", "-".repeat(48));
    println!("{:<15} {:>10.4} {:>10} {:>10.4}\n", "average", outcome.run.avg_rmse, "", outcome.run.avg_r2);

    println!("Registered version {} as {}", entry.version, entry.stage);
    if promote {
        let promoted = registry.promote(entry.version, Stage::Production)?;
        println!("Promoted version {} to {}", promoted.version, promoted.stage);
    }
    Ok(())
}

fn forecast(
    config: &Config,
    input: &Path,
    days: usize,
    stage: Option<Stage>,
    seed_only: bool,
    json: bool,
) -> anyhow::Result<()> {
    if days == 0 || days > MAX_HORIZON {
        anyhow::bail!("--days must be between 1 and {}", MAX_HORIZON);
    }

    let records = load_records(input)?;
    let history = if seed_only {
        &records[records.len().saturating_sub(1)..]
    } else {
        &records[..]
    };

    let registry = ModelRegistry::open(&config.registry)?;
    let service = ForecastService::from_registry(&registry, stage.unwrap_or(config.registry.serving_stage));
    let served = service.forecast_from_history(history, days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&served)?);
        return Ok(());
    }

    match &served.source {
        ForecastSource::Model { version, run_id } => {
            println!("\n🌤  Forecast from model version {} (run {})\n", version, run_id)
        }
        ForecastSource::Fallback => println!("\n⚠️  No model available, showing persistence forecast\n"),
    }

    print!("{:<12}", "Date");
    for target in Target::ALL {
        print!(" {:>14}", target.column());
    }
    println!();
    println!("{}", "-".repeat(12 + 15 * Target::ALL.len()));
    for day in &served.days {
        print!("{:<12}", day.date);
        for target in Target::ALL {
            print!(" {:>14.2}", day.get(target).unwrap_or(f64::NAN));
        }
        println!();
    }
    Ok(())
}

fn promote(config: &Config, version: u32, stage: Stage) -> anyhow::Result<()> {
    let registry = ModelRegistry::open(&config.registry)?;
    let entry = registry.promote(version, stage)?;
    println!("Version {} is now {}", entry.version, entry.stage);
    Ok(())
}

fn list_models(config: &Config) -> anyhow::Result<()> {
    let registry = ModelRegistry::open(&config.registry)?;
    let entries = registry.list()?;

    println!("\n📦 Registered versions of {}:\n", registry.model_name());
    if entries.is_empty() {
        println!("  (none)");
        return Ok(());
    }

    println!("{:>7} {:<12} {:>8} {:>8}  {:<20} {}", "Version", "Stage", "R²", "RMSE", "Created", "Run");
    println!("{}", "-".repeat(100));
    for entry in entries {
        println!(
            "{:>7} {:<12} {:>8.4} {:>8.4}  {:<20} {}",
            entry.version,
            entry.stage.to_string(),
            entry.avg_r2,
            entry.avg_rmse,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.run_id
        );
    }
    Ok(())
}

fn synthesize(days: usize, output: &Path, seed: u64) -> anyhow::Result<()> {
    let records = synthetic_history(days, Utc::now().date_naive(), seed)?;
    write_records(output, &records)?;
    println!("Wrote {} days to {}", records.len(), output.display());
    Ok(())
}
