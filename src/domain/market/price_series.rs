use crate::domain::errors::PredictionError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Minimum number of daily observations required before feature derivation.
pub const MIN_OBSERVATIONS: usize = 100;

/// A single daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Finite prices with a positive close and non-negative volume.
    pub fn is_well_formed(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
            && self.close > 0.0
            && self.volume >= 0.0
    }
}

/// Strictly time-ordered daily history for one symbol.
///
/// Construction validates ordering, bar sanity and the minimum length, so every
/// `PriceSeries` that exists is usable by the feature builder.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, PredictionError> {
        let symbol = symbol.into().to_uppercase();

        if bars.is_empty() {
            return Err(PredictionError::data_unavailable(
                symbol.clone(),
                format!("No data found for {}", symbol),
            ));
        }

        if bars.len() < MIN_OBSERVATIONS {
            return Err(PredictionError::data_unavailable(
                symbol.clone(),
                format!(
                    "Insufficient data for {} (need {}+ days, got {})",
                    symbol,
                    MIN_OBSERVATIONS,
                    bars.len()
                ),
            ));
        }

        if let Some(bar) = bars.iter().find(|b| !b.is_well_formed()) {
            return Err(PredictionError::data_unavailable(
                symbol,
                format!("malformed bar on {}", bar.date),
            ));
        }

        if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(PredictionError::data_unavailable(
                symbol,
                format!("bars out of order at {} -> {}", w[0].date, w[1].date),
            ));
        }

        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Quick quote built from the two most recent bars.
    pub fn quote(&self) -> Option<Quote> {
        Quote::from_bars(&self.symbol, &self.bars)
    }
}

/// Latest trading snapshot for a symbol, served without running the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub previous_close: Option<f64>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub date: NaiveDate,
}

impl Quote {
    /// Snapshot of the last bar, with the close before it as reference.
    /// Works on short histories too, so quotes never need the full
    /// `MIN_OBSERVATIONS` window.
    pub fn from_bars(symbol: &str, bars: &[Bar]) -> Option<Self> {
        let last = bars.last()?;
        let previous_close = bars
            .len()
            .checked_sub(2)
            .and_then(|i| bars.get(i))
            .map(|b| b.close);

        Some(Self {
            symbol: symbol.to_uppercase(),
            price: last.close,
            previous_close,
            open: last.open,
            high: last.high,
            low: last.low,
            volume: last.volume,
            date: last.date,
        })
    }

    pub fn change_percent(&self) -> Option<f64> {
        let prev = self.previous_close.filter(|p| *p != 0.0)?;
        Some((self.price - prev) / prev * 100.0)
    }
}
