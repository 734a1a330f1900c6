use serde::{Deserialize, Serialize};

/// Number of model inputs per time step.
pub const N_FEATURES: usize = 15;

/// Ordered list of feature names.
/// This order MUST match `FeatureRow::to_vector`; the scaler statistics and
/// every trained model are positional.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "close",
    "volume",
    "ma_5",
    "ma_10",
    "ma_20",
    "daily_return",
    "volatility_5",
    "volatility_20",
    "rsi",
    "macd",
    "volume_change",
    "volume_ratio",
    "price_vs_ma20",
    "high_low_range",
    "sentiment",
];

/// One fully-defined time step of the feature table.
///
/// `weekly_return` and `ma_50` are derived alongside the model inputs: they
/// take part in warm-up trimming and the indicator snapshot but are not
/// part of the model input vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureRow {
    pub close: f64,
    pub volume: f64,
    pub ma_5: f64,
    pub ma_10: f64,
    pub ma_20: f64,
    pub daily_return: f64,
    pub volatility_5: f64,
    pub volatility_20: f64,
    pub rsi: f64,
    pub macd: f64,
    pub volume_change: f64,
    pub volume_ratio: f64,
    pub price_vs_ma20: f64,
    pub high_low_range: f64,
    pub sentiment: f64,
    pub weekly_return: f64,
    pub ma_50: f64,
    /// Next bar's close.
    pub target: f64,
}

impl FeatureRow {
    /// Model inputs in `FEATURE_NAMES` order.
    pub fn to_vector(&self) -> [f64; N_FEATURES] {
        [
            self.close,
            self.volume,
            self.ma_5,
            self.ma_10,
            self.ma_20,
            self.daily_return,
            self.volatility_5,
            self.volatility_20,
            self.rsi,
            self.macd,
            self.volume_change,
            self.volume_ratio,
            self.price_vs_ma20,
            self.high_low_range,
            self.sentiment,
        ]
    }
}
