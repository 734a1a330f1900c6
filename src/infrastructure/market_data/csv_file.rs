use crate::domain::errors::PredictionError;
use crate::domain::market::{Bar, PriceSeries, Quote};
use crate::domain::ports::MarketDataService;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date")]
    date: String,
    #[serde(alias = "Open")]
    open: Option<f64>,
    #[serde(alias = "High")]
    high: Option<f64>,
    #[serde(alias = "Low")]
    low: Option<f64>,
    #[serde(alias = "Close")]
    close: Option<f64>,
    #[serde(alias = "Volume")]
    volume: Option<f64>,
}

/// Reads `<dir>/<SYMBOL>.csv` files with Date,Open,High,Low,Close,Volume
/// columns, oldest row first.
pub struct CsvMarketDataService {
    dir: PathBuf,
}

impl CsvMarketDataService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }

    async fn load(&self, symbol: &str) -> Result<Vec<Bar>> {
        let path = self.path_for(symbol);
        tokio::task::spawn_blocking(move || read_bars(&path))
            .await
            .context("CSV reader task failed")?
    }
}

fn read_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut bars = Vec::new();
    for (line, record) in reader.deserialize::<CsvRecord>().enumerate() {
        let record = record.with_context(|| format!("Bad row {} in {}", line + 2, path.display()))?;
        let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d")
            .with_context(|| format!("Bad date '{}' in {}", record.date, path.display()))?;

        if let (Some(open), Some(high), Some(low), Some(close)) =
            (record.open, record.high, record.low, record.close)
        {
            bars.push(Bar {
                date,
                open,
                high,
                low,
                close,
                volume: record.volume.unwrap_or(0.0),
            });
        }
    }
    Ok(bars)
}

#[async_trait]
impl MarketDataService for CsvMarketDataService {
    async fn fetch_price_series(&self, symbol: &str) -> Result<PriceSeries, PredictionError> {
        let symbol = symbol.to_uppercase();
        let bars = self
            .load(&symbol)
            .await
            .map_err(|e| PredictionError::data_unavailable(&symbol, format!("{:#}", e)))?;
        debug!("CSV: {} bars for {}", bars.len(), symbol);
        PriceSeries::new(symbol, bars)
    }

    async fn latest_quote(&self, symbol: &str) -> Result<Quote> {
        let symbol = symbol.to_uppercase();
        let bars = self.load(&symbol).await?;
        Quote::from_bars(&symbol, &bars).with_context(|| format!("No quote data for {}", symbol))
    }

    fn name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("stockcast-csv-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_csv(dir: &Path, symbol: &str, rows: usize) {
        let mut file = std::fs::File::create(dir.join(format!("{}.csv", symbol))).unwrap();
        writeln!(file, "Date,Open,High,Low,Close,Adj Close,Volume").unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for i in 0..rows {
            let d = start + chrono::Duration::days(i as i64);
            let c = 50.0 + i as f64;
            writeln!(file, "{},{},{},{},{},{},{}", d, c, c + 1.0, c - 1.0, c, c, 1000 + i).unwrap();
        }
        // A row with a missing close is dropped
        writeln!(file, "2030-01-01,1,1,1,,1,1").unwrap();
    }

    #[tokio::test]
    async fn test_loads_series() {
        let dir = temp_dir("load");
        write_csv(&dir, "AAPL", 120);
        let service = CsvMarketDataService::new(&dir);

        let series = service.fetch_price_series("aapl").await.unwrap();
        assert_eq!(series.len(), 120);
        assert_eq!(series.bars()[0].close, 50.0);
        assert_eq!(series.bars()[119].volume, 1119.0);

        let quote = service.latest_quote("AAPL").await.unwrap();
        assert_eq!(quote.price, 169.0);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_short_and_missing_files() {
        let dir = temp_dir("short");
        write_csv(&dir, "SHORT", 20);
        let service = CsvMarketDataService::new(&dir);

        let err = service.fetch_price_series("SHORT").await.unwrap_err();
        assert!(err.to_string().contains("need 100+"));

        let err = service.fetch_price_series("MISSING").await.unwrap_err();
        assert!(matches!(err, PredictionError::DataUnavailable { .. }));
        let _ = std::fs::remove_dir_all(dir);
    }
}
