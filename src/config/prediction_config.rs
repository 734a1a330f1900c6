//! Pipeline, ensemble and cache settings.

use std::env;

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionEnvConfig {
    pub lookback: usize,
    pub lstm_epochs: usize,
    pub train_split_ratio: f64,
    pub cache_ttl_secs: u64,
    pub weight_rf: f64,
    pub weight_gb: f64,
    pub weight_xgb: f64,
    pub weight_lstm: f64,
    pub watch_interval_secs: u64,
}

impl Default for PredictionEnvConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            lstm_epochs: 30,
            train_split_ratio: 0.8,
            cache_ttl_secs: 300,
            weight_rf: 0.35,
            weight_gb: 0.25,
            weight_xgb: 0.25,
            weight_lstm: 0.15,
            watch_interval_secs: 60,
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

impl PredictionEnvConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            lookback: env::var("PREDICTION_LOOKBACK")
                .unwrap_or_else(|_| "20".to_string())
                .parse::<usize>()
                .unwrap_or(d.lookback),
            lstm_epochs: env::var("LSTM_EPOCHS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<usize>()
                .unwrap_or(d.lstm_epochs),
            train_split_ratio: env_f64("TRAIN_SPLIT_RATIO", d.train_split_ratio),
            cache_ttl_secs: env::var("PREDICTION_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse::<u64>()
                .unwrap_or(d.cache_ttl_secs),
            weight_rf: env_f64("ENSEMBLE_WEIGHT_RF", d.weight_rf),
            weight_gb: env_f64("ENSEMBLE_WEIGHT_GB", d.weight_gb),
            weight_xgb: env_f64("ENSEMBLE_WEIGHT_XGB", d.weight_xgb),
            weight_lstm: env_f64("ENSEMBLE_WEIGHT_LSTM", d.weight_lstm),
            watch_interval_secs: env::var("WATCH_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .unwrap_or(d.watch_interval_secs),
        }
    }
}
