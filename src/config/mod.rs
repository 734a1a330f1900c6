//! Configuration module for Stockcast.
//!
//! Structured configuration loaded from environment variables, organized
//! by concern: market data, sentiment, prediction and observability.

mod market_data_config;
mod observability_config;
mod prediction_config;
mod sentiment_config;

pub use market_data_config::MarketDataEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use prediction_config::PredictionEnvConfig;
pub use sentiment_config::SentimentEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Where price history comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Yahoo,
    Csv,
    Mock,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yahoo" => Ok(Mode::Yahoo),
            "csv" => Ok(Mode::Csv),
            "mock" => Ok(Mode::Mock),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'yahoo', 'csv', or 'mock'", s),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub market_data: MarketDataEnvConfig,
    pub sentiment: SentimentEnvConfig,
    pub prediction: PredictionEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Yahoo,
            market_data: MarketDataEnvConfig::default(),
            sentiment: SentimentEnvConfig::default(),
            prediction: PredictionEnvConfig::default(),
            observability: ObservabilityEnvConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mode_str = env::var("MODE").unwrap_or_else(|_| "yahoo".to_string());
        let mode = Mode::from_str(&mode_str)?;

        let config = Self {
            mode,
            market_data: MarketDataEnvConfig::from_env(),
            sentiment: SentimentEnvConfig::from_env(),
            prediction: PredictionEnvConfig::from_env(),
            observability: ObservabilityEnvConfig::from_env(),
        };
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.prediction;

        if p.lookback == 0 {
            anyhow::bail!("PREDICTION_LOOKBACK must be at least 1");
        }
        if !(p.train_split_ratio > 0.0 && p.train_split_ratio < 1.0) {
            anyhow::bail!(
                "TRAIN_SPLIT_RATIO must be between 0 and 1 (exclusive), got {}",
                p.train_split_ratio
            );
        }

        let weights = [
            ("ENSEMBLE_WEIGHT_RF", p.weight_rf),
            ("ENSEMBLE_WEIGHT_GB", p.weight_gb),
            ("ENSEMBLE_WEIGHT_XGB", p.weight_xgb),
            ("ENSEMBLE_WEIGHT_LSTM", p.weight_lstm),
        ];
        for (name, w) in weights {
            if !w.is_finite() || w < 0.0 {
                anyhow::bail!("{} must be a non-negative number, got {}", name, w);
            }
        }
        if weights.iter().all(|(_, w)| *w == 0.0) {
            anyhow::bail!("At least one ensemble weight must be positive");
        }

        if self.market_data.history_years == 0 {
            anyhow::bail!("HISTORY_YEARS must be at least 1");
        }
        Ok(())
    }
}
