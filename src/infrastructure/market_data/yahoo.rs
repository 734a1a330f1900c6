use crate::domain::errors::PredictionError;
use crate::domain::market::{Bar, PriceSeries, Quote};
use crate::domain::ports::MarketDataService;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) stockcast";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Daily history from the Yahoo Finance chart API.
pub struct YahooMarketDataService {
    client: Client,
    base_url: String,
    history_years: u32,
}

impl YahooMarketDataService {
    pub fn new(base_url: String, history_years: u32) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            history_years: history_years.max(1),
        }
    }

    async fn fetch_bars(&self, symbol: &str, range: &str) -> Result<Vec<Bar>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .query(&[("range", range), ("interval", "1d")])
            .send()
            .await
            .with_context(|| format!("Failed to send chart request for {}", symbol))?;

        if !response.status().is_success() {
            anyhow::bail!("Yahoo chart API returned status {} for {}", response.status(), symbol);
        }

        let body: ChartResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse chart response for {}", symbol))?;
        let bars = parse_chart(body)?;
        debug!("Yahoo: {} daily bars for {} ({})", bars.len(), symbol, range);
        Ok(bars)
    }
}

fn parse_chart(body: ChartResponse) -> Result<Vec<Bar>> {
    if let Some(err) = body.chart.error {
        anyhow::bail!("{}: {}", err.code, err.description);
    }

    let Some(result) = body.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let columns = result.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten();

    let mut bars: Vec<Bar> = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        // Rows with any missing field (halts, partial sessions) are skipped
        let (Some(open), Some(high), Some(low), Some(close)) = (
            at(&columns.open, i),
            at(&columns.high, i),
            at(&columns.low, i),
            at(&columns.close, i),
        ) else {
            continue;
        };
        let Some(date) = DateTime::from_timestamp(*ts, 0).map(|dt| dt.date_naive()) else {
            continue;
        };
        let bar = Bar {
            date,
            open,
            high,
            low,
            close,
            volume: at(&columns.volume, i).unwrap_or(0.0),
        };
        if !bar.is_well_formed() {
            continue;
        }

        match bars.last_mut() {
            Some(prev) if prev.date == date => *prev = bar,
            Some(prev) if prev.date > date => continue,
            _ => bars.push(bar),
        }
    }
    Ok(bars)
}

#[async_trait]
impl MarketDataService for YahooMarketDataService {
    async fn fetch_price_series(&self, symbol: &str) -> Result<PriceSeries, PredictionError> {
        let symbol = symbol.to_uppercase();
        let range = format!("{}y", self.history_years);
        let bars = self
            .fetch_bars(&symbol, &range)
            .await
            .map_err(|e| PredictionError::data_unavailable(&symbol, format!("{:#}", e)))?;

        info!("Fetched {} days of data for {}", bars.len(), symbol);
        PriceSeries::new(symbol, bars)
    }

    async fn latest_quote(&self, symbol: &str) -> Result<Quote> {
        let symbol = symbol.to_uppercase();
        let bars = self.fetch_bars(&symbol, "5d").await?;
        Quote::from_bars(&symbol, &bars).with_context(|| format!("No quote data for {}", symbol))
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"chart":{"result":[{
        "meta":{"symbol":"AAPL","currency":"USD"},
        "timestamp":[1704205800,1704292200,1704378600,1704465000,1704465900],
        "indicators":{"quote":[{
            "open":[187.15,184.22,null,181.99,182.00],
            "high":[188.44,185.88,183.10,182.76,182.50],
            "low":[183.89,183.43,180.88,180.17,181.00],
            "close":[185.64,184.25,181.91,181.18,181.50],
            "volume":[82488700,58414500,71983600,null,1000]
        }]}}],"error":null}}"#;

    #[test]
    fn test_parse_skips_incomplete_rows_and_dedupes_dates() {
        let body: ChartResponse = serde_json::from_str(SAMPLE).unwrap();
        let bars = parse_chart(body).unwrap();

        // third row has a null open, last two share a date
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].close, 185.64);
        assert_eq!(bars[1].volume, 58414500.0);
        assert_eq!(bars[2].close, 181.50);
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_parse_keeps_silent_sessions_and_drops_bad_prints() {
        let body: ChartResponse = serde_json::from_str(
            r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704378600],
                "indicators":{"quote":[{
                    "open":[187.15,184.22,182.15],
                    "high":[188.44,185.88,183.09],
                    "low":[183.89,183.43,180.88],
                    "close":[185.64,0.0,181.91],
                    "volume":[null,58414500,71983600]}]}}],"error":null}}"#,
        )
        .unwrap();
        let bars = parse_chart(body).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].volume, 0.0);
        assert_eq!(bars[1].close, 181.91);
    }

    #[test]
    fn test_parse_error_payload() {
        let body: ChartResponse = serde_json::from_str(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        )
        .unwrap();
        let err = parse_chart(body).unwrap_err();
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn test_parse_empty_result() {
        let body: ChartResponse =
            serde_json::from_str(r#"{"chart":{"result":[],"error":null}}"#).unwrap();
        assert!(parse_chart(body).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_data_unavailable() {
        let service = YahooMarketDataService::new("http://127.0.0.1:9".to_string(), 1);
        let err = service.fetch_price_series("aapl").await.unwrap_err();
        assert!(matches!(err, PredictionError::DataUnavailable { .. }));
        assert_eq!(err.symbol(), "AAPL");
    }
}
