use crate::domain::errors::PredictionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores above this are bullish, below its negation bearish.
pub const SENTIMENT_LABEL_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Bullish,
    Neutral,
    Bearish,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score > SENTIMENT_LABEL_THRESHOLD {
            Self::Bullish
        } else if score < -SENTIMENT_LABEL_THRESHOLD {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Neutral => write!(f, "neutral"),
            Self::Bearish => write!(f, "bearish"),
        }
    }
}

#[async_trait]
pub trait SentimentProvider: Send + Sync {
    /// News sentiment for a symbol in [-1, 1].
    async fn fetch_sentiment(&self, symbol: &str) -> Result<f64, PredictionError>;

    /// Whether the provider is configured well enough to ever return a
    /// non-neutral score. Queried once when the service is assembled.
    fn is_available(&self) -> bool;

    fn name(&self) -> &str;
}
