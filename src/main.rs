//! Stockcast - next-day price forecasts from an ensemble of models
//!
//! # Usage
//! ```sh
//! cargo run -- predict AAPL
//! MODE=mock cargo run -- watch TSLA --interval 30 --iterations 5
//! cargo run -- serve
//! ```
//!
//! One-shot commands always retrain. `serve` keeps a single service alive
//! and reads commands from stdin, so cached predictions and `clear-cache`
//! apply across lines.
//!
//! # Environment Variables
//! - `MODE` - Market data source: `yahoo`, `csv` or `mock` (default: yahoo)
//! - `NEWS_API_KEY` - Enables news sentiment when set
//! - `OBSERVABILITY_ENABLED` - Enable metrics reporting (default: true)
//! - `OBSERVABILITY_INTERVAL` - Interval in seconds between metric outputs (default: 60)

use anyhow::Result;
use clap::{Parser, Subcommand};
use stockcast::config::Config;
use stockcast::application::prediction::session::{summary_line, supported_listing};
use stockcast::application::prediction::{PredictionService, Reply, Session};
use stockcast::infrastructure::ServiceFactory;
use stockcast::infrastructure::observability::{Metrics, MetricsReporter};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{Level, error, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast the next close for a symbol
    Predict {
        symbol: String,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-run the forecast on a fixed interval
    Watch {
        symbol: String,

        /// Seconds between runs (defaults to WATCH_INTERVAL_SECS)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after this many runs
        #[arg(long)]
        iterations: Option<usize>,
    },
    /// Latest price without running the models
    Quote { symbol: String },
    /// List the symbols the predictor is tuned for
    Supported,
    /// Report which models and data sources are available
    Health,
    /// Read commands from stdin against one shared, caching service
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let log_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(log_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    info!(
        "Stockcast {} starting (mode: {:?})",
        env!("CARGO_PKG_VERSION"),
        config.mode
    );

    let metrics = if config.observability.enabled {
        let metrics = Metrics::new()?;
        let reporter = MetricsReporter::new(metrics.clone(), config.observability.interval_secs);
        tokio::spawn(async move {
            reporter.run().await;
        });
        Some(metrics)
    } else {
        None
    };

    let service = ServiceFactory::create_prediction_service(&config, metrics);

    match cli.command {
        Commands::Predict { symbol, json } => {
            let result = service.predict(&symbol, false).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", summary_line(&result));
            }
        }
        Commands::Watch {
            symbol,
            interval,
            iterations,
        } => {
            let interval =
                Duration::from_secs(interval.unwrap_or(config.prediction.watch_interval_secs));
            let (tx, mut rx) = mpsc::channel(8);

            let printer = tokio::spawn(async move {
                while let Some(outcome) = rx.recv().await {
                    match outcome {
                        Ok(result) => println!("{}", summary_line(&result)),
                        Err(e) => error!("{}", e),
                    }
                }
            });

            tokio::select! {
                delivered = service.watch(&symbol, interval, tx, iterations) => {
                    info!("Watch finished after {} runs", delivered);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received. Exiting...");
                }
            }
            printer.await.ok();
        }
        Commands::Quote { symbol } => {
            let quote = service.quote(&symbol).await?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
        Commands::Supported => {
            println!("{}", supported_listing());
        }
        Commands::Health => {
            println!(
                "{}",
                serde_json::to_string_pretty(&service.capabilities())?
            );
        }
        Commands::Serve => {
            info!("Serving commands on stdin. Type 'quit' or press Ctrl+C to exit.");
            tokio::select! {
                res = serve(&service) => res?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received. Exiting...");
                }
            }
        }
    }

    Ok(())
}

async fn serve(service: &PredictionService) -> Result<()> {
    let session = Session::new(service);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match session.handle(&line).await {
            Reply::Output(text) => println!("{}", text),
            Reply::Error(message) => println!("error: {}", message),
            Reply::Empty => {}
            Reply::Quit => break,
        }
    }
    info!("Session closed");
    Ok(())
}
