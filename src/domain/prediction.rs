use crate::domain::ml::ModelFlags;
use crate::domain::sentiment::SentimentLabel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DISCLAIMER: &str = "This is a demo prediction. Not financial advice.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

impl Direction {
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            Direction::Up
        } else if change < 0.0 {
            Direction::Down
        } else {
            Direction::Neutral
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
            Direction::Neutral => write!(f, "neutral"),
        }
    }
}

/// Indicator values at the most recent feature row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub macd: f64,
    /// 20-day volatility of daily returns, in percent.
    pub volatility: f64,
    pub ma20: f64,
    pub ma50: Option<f64>,
}

/// Full output of one pipeline run.
///
/// Field names are the contract the serving layer depends on; they
/// serialize in camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub symbol: String,
    pub current_price: f64,
    pub predicted_price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub direction: Direction,
    pub confidence: f64,
    pub sentiment: f64,
    pub sentiment_label: SentimentLabel,
    pub indicators: IndicatorSnapshot,
    pub models: ModelFlags,
    pub data_points: usize,
    pub timestamp: DateTime<Utc>,
    pub disclaimer: String,
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
