use crate::application::market_data::indicators::TechnicalIndicators;
use crate::domain::errors::PredictionError;
use crate::domain::market::{MIN_OBSERVATIONS, PriceSeries};
use crate::domain::ml::{FeatureRow, N_FEATURES};
use tracing::debug;

/// Feature rows that survived warm-up trimming, in time order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    pub fn inputs(&self) -> Vec<[f64; N_FEATURES]> {
        self.rows.iter().map(FeatureRow::to_vector).collect()
    }

    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.target).collect()
    }
}

/// Builds the fixed-width feature table from a price history and the
/// symbol's sentiment score.
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Sentiment is broadcast to every row. Rows with any undefined
    /// indicator are dropped, and so is the final bar (its target is the
    /// close of a bar that does not exist yet).
    pub fn build(series: &PriceSeries, sentiment: f64) -> Result<FeatureTable, PredictionError> {
        if series.len() < MIN_OBSERVATIONS {
            return Err(PredictionError::data_unavailable(
                series.symbol(),
                format!(
                    "Insufficient data for {} (need {}+ days, got {})",
                    series.symbol(),
                    MIN_OBSERVATIONS,
                    series.len()
                ),
            ));
        }

        let sentiment = if sentiment.is_finite() {
            sentiment.clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let bars = series.bars();
        let ind = TechnicalIndicators::compute(series);

        let rows: Vec<FeatureRow> = (0..bars.len())
            .filter_map(|i| {
                let bar = &bars[i];
                Some(FeatureRow {
                    close: bar.close,
                    volume: bar.volume,
                    ma_5: ind.ma_5[i]?,
                    ma_10: ind.ma_10[i]?,
                    ma_20: ind.ma_20[i]?,
                    daily_return: ind.daily_return[i]?,
                    volatility_5: ind.volatility_5[i]?,
                    volatility_20: ind.volatility_20[i]?,
                    rsi: ind.rsi[i],
                    macd: ind.macd[i],
                    volume_change: ind.volume_change[i]?,
                    volume_ratio: ind.volume_ratio[i]?,
                    price_vs_ma20: ind.price_vs_ma20[i]?,
                    high_low_range: ind.high_low_range[i]?,
                    sentiment,
                    weekly_return: ind.weekly_return[i]?,
                    ma_50: ind.ma_50[i]?,
                    target: bars.get(i + 1)?.close,
                })
            })
            .collect();

        if rows.is_empty() {
            return Err(PredictionError::data_unavailable(
                series.symbol(),
                "no complete feature rows after indicator warm-up",
            ));
        }

        debug!(
            "FeatureBuilder: {} -> {} rows from {} bars",
            series.symbol(),
            rows.len(),
            series.len()
        );

        Ok(FeatureTable { rows })
    }
}
