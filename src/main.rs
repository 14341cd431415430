//! calibration-forecast - calibration interval forecasting CLI
//!
//! # Usage
//!
//! ```bash
//! # Direct prediction from a feature map (inline JSON or a file path)
//! calibration-forecast --model model.json predict --features '{"temperatura": 21, ...}'
//!
//! # Forecast one instrument from a JSON export
//! calibration-forecast --model model.json replay --events historicos.json --code MN-104
//!
//! # Fleet dashboard (heuristic mode without --model)
//! calibration-forecast dashboard --events historicos.json
//!
//! # Import a JSON export into a sled database, then query it
//! calibration-forecast import --events historicos.json --db ./data/calibrations.db
//! calibration-forecast --model model.json replay --db ./data/calibrations.db --code MN-104
//! ```
//!
//! # Environment Variables
//!
//! - `CALIBRATION_FORECAST_CONFIG`: Path to the engine TOML config
//! - `CALIBRATION_FORECAST_MODEL`: Path to the model bundle JSON
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use calibration_forecast::store::load_events_json;
use calibration_forecast::{
    CalibrationForecaster, CalibrationStore, EngineConfig, MemoryStore, RawFeatures, SledStore,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "calibration-forecast")]
#[command(about = "Calibration interval forecasting and history replay")]
#[command(version)]
struct CliArgs {
    /// Model bundle (JSON). Overrides `oracle.model_path` from the config.
    #[arg(long, global = true, env = "CALIBRATION_FORECAST_MODEL")]
    model: Option<PathBuf>,

    /// Engine config (TOML). Without it the standard search order applies.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

/// Where calibration events come from.
#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
struct EventSource {
    /// JSON array of calibration records
    #[arg(long)]
    events: Option<PathBuf>,

    /// sled database created with `import`
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Predict days until the next calibration from a feature map
    Predict {
        /// Inline JSON object, or a path to a JSON file
        #[arg(long)]
        features: String,
    },

    /// Forward estimate and historical reconstruction for one instrument
    Replay {
        #[command(flatten)]
        source: EventSource,
        /// Instrument code
        #[arg(long)]
        code: String,
    },

    /// Fleet-wide interval report
    Dashboard {
        #[command(flatten)]
        source: EventSource,
    },

    /// Load a JSON export into a sled database
    Import {
        /// JSON array of calibration records
        #[arg(long)]
        events: PathBuf,
        /// Target sled database directory
        #[arg(long)]
        db: PathBuf,
    },
}

// ============================================================================
// Helpers
// ============================================================================

fn load_config(path: Option<&Path>, model: Option<PathBuf>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(p) => EngineConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display()))?,
        None => EngineConfig::load(),
    };
    if model.is_some() {
        config.oracle.model_path = model;
    }
    Ok(config)
}

fn open_store(source: &EventSource) -> Result<Arc<dyn CalibrationStore>> {
    if let Some(db) = &source.db {
        let store = SledStore::open(db)
            .with_context(|| format!("Failed to open sled database {}", db.display()))?;
        return Ok(Arc::new(store));
    }
    let path = source
        .events
        .as_deref()
        .context("Either --events or --db is required")?;
    let events = load_events_json(path)
        .with_context(|| format!("Failed to read events from {}", path.display()))?;
    Ok(Arc::new(MemoryStore::from_events(events)))
}

fn parse_features(arg: &str) -> Result<RawFeatures> {
    let path = Path::new(arg);
    let json = if path.is_file() {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    } else {
        arg.to_string()
    };
    serde_json::from_str(&json).context("Features must be a JSON object")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = load_config(args.config.as_deref(), args.model)?;

    match args.command {
        SubCommand::Predict { features } => {
            let raw = parse_features(&features)?;
            let svc = CalibrationForecaster::from_config(Arc::new(MemoryStore::new()), config);
            print_json(&svc.predict(&raw)?)
        }
        SubCommand::Replay { source, code } => {
            let svc = CalibrationForecaster::from_config(open_store(&source)?, config);
            print_json(&svc.forecast(&code)?)
        }
        SubCommand::Dashboard { source } => {
            let svc = CalibrationForecaster::from_config(open_store(&source)?, config);
            print_json(&svc.dashboard()?)
        }
        SubCommand::Import { events, db } => {
            let loaded = load_events_json(&events)
                .with_context(|| format!("Failed to read events from {}", events.display()))?;
            let store = SledStore::open(&db)
                .with_context(|| format!("Failed to open sled database {}", db.display()))?;
            let n = store.insert_all(&loaded)?;
            info!(imported = n, total = store.count(), db = %db.display(), "Import complete");
            Ok(())
        }
    }
}
