use crate::domain::errors::PredictionError;
use crate::domain::market::{Bar, PriceSeries, Quote};
use crate::domain::ports::{Clock, MarketDataService};
use crate::domain::sentiment::SentimentProvider;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

const SYNTHETIC_DAYS: usize = 500;

/// In-memory market data. Serves preset histories and, when synthetic
/// generation is on, a deterministic random walk for any other symbol.
pub struct MockMarketDataService {
    series: RwLock<HashMap<String, Vec<Bar>>>,
    synthetic: bool,
    calls: AtomicUsize,
}

impl MockMarketDataService {
    pub fn new() -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            synthetic: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Only preset symbols resolve; everything else is `DataUnavailable`.
    pub fn new_no_sim() -> Self {
        Self {
            synthetic: false,
            ..Self::new()
        }
    }

    pub fn with_series(self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.series
            .try_write()
            .map(|mut guard| guard.insert(symbol.to_uppercase(), bars))
            .ok();
        self
    }

    pub async fn set_series(&self, symbol: &str, bars: Vec<Bar>) {
        self.series
            .write()
            .await
            .insert(symbol.to_uppercase(), bars);
    }

    /// Number of history fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    async fn bars_for(&self, symbol: &str) -> Option<Vec<Bar>> {
        if let Some(bars) = self.series.read().await.get(symbol) {
            return Some(bars.clone());
        }
        self.synthetic
            .then(|| random_walk_bars(SYNTHETIC_DAYS, symbol_seed(symbol)))
    }
}

impl Default for MockMarketDataService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataService for MockMarketDataService {
    async fn fetch_price_series(&self, symbol: &str) -> Result<PriceSeries, PredictionError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let symbol = symbol.to_uppercase();
        let bars = self.bars_for(&symbol).await.unwrap_or_default();
        debug!("MockMarketDataService: {} bars for {}", bars.len(), symbol);
        PriceSeries::new(symbol, bars)
    }

    async fn latest_quote(&self, symbol: &str) -> Result<Quote> {
        let symbol = symbol.to_uppercase();
        let bars = self.bars_for(&symbol).await.unwrap_or_default();
        Quote::from_bars(&symbol, &bars)
            .ok_or_else(|| anyhow::anyhow!("No quote data for {}", symbol))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn symbol_seed(symbol: &str) -> u64 {
    symbol
        .bytes()
        .fold(1469598103934665603u64, |h, b| (h ^ b as u64).wrapping_mul(1099511628211))
}

fn weekdays_from(start: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start
        .iter_days()
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
}

/// `days` weekday bars with a flat close of `price`.
pub fn constant_bars(days: usize, price: f64) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    weekdays_from(start)
        .take(days)
        .map(|date| Bar {
            date,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 1_000_000.0,
        })
        .collect()
}

/// Seeded random-walk history starting at 100 with roughly 1.5% daily moves.
pub fn random_walk_bars(days: usize, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or_default();
    let mut close = 100.0_f64;

    weekdays_from(start)
        .take(days)
        .map(|date| {
            let open = close;
            close = (close * (1.0 + rng.random_range(-0.03..0.03))).max(1.0);
            let high = open.max(close) * (1.0 + rng.random_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.random_range(0.0..0.01));
            Bar {
                date,
                open,
                high,
                low,
                close,
                volume: rng.random_range(1_000_000.0..5_000_000.0),
            }
        })
        .collect()
}

/// Always returns the same score.
pub struct StaticSentimentProvider {
    score: f64,
}

impl StaticSentimentProvider {
    pub fn new(score: f64) -> Self {
        Self { score }
    }
}

#[async_trait]
impl SentimentProvider for StaticSentimentProvider {
    async fn fetch_sentiment(&self, _symbol: &str) -> Result<f64, PredictionError> {
        Ok(self.score)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Every fetch fails, as an unreachable news API would.
#[derive(Default)]
pub struct FailingSentimentProvider;

#[async_trait]
impl SentimentProvider for FailingSentimentProvider {
    async fn fetch_sentiment(&self, symbol: &str) -> Result<f64, PredictionError> {
        Err(PredictionError::SentimentFetch {
            symbol: symbol.to_string(),
            reason: "simulated outage".to_string(),
        })
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        match self.now.lock() {
            Ok(mut now) => *now += by,
            Err(poisoned) => *poisoned.into_inner() += by,
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        match self.now.lock() {
            Ok(mut now) => *now = to,
            Err(poisoned) => *poisoned.into_inner() = to,
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_synthetic_series_is_deterministic() {
        let market = MockMarketDataService::new();
        let a = market.fetch_price_series("aapl").await.unwrap();
        let b = market.fetch_price_series("AAPL").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), SYNTHETIC_DAYS);
        assert_eq!(market.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_no_sim_rejects_unknown_symbols() {
        let market = MockMarketDataService::new_no_sim().with_series("FLAT", constant_bars(120, 50.0));

        assert!(market.fetch_price_series("FLAT").await.is_ok());
        let err = market.fetch_price_series("NOPE").await.unwrap_err();
        assert!(err.to_string().contains("No data found for NOPE"));
        assert!(market.latest_quote("NOPE").await.is_err());
    }

    #[tokio::test]
    async fn test_quote_from_preset() {
        let market = MockMarketDataService::new_no_sim().with_series("flat", constant_bars(3, 10.0));
        let quote = market.latest_quote("FLAT").await.unwrap();
        assert_eq!(quote.price, 10.0);
        assert_eq!(quote.previous_close, Some(10.0));
        assert_eq!(quote.change_percent(), Some(0.0));
    }

    #[test]
    fn test_bars_skip_weekends_and_stay_positive() {
        let bars = random_walk_bars(300, 7);
        assert_eq!(bars.len(), 300);
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
        assert!(bars.iter().all(|b| b.low <= b.close && b.close <= b.high && b.low > 0.0));
        assert!(
            bars.iter()
                .all(|b| !matches!(b.date.weekday(), Weekday::Sat | Weekday::Sun))
        );
    }

    #[tokio::test]
    async fn test_sentiment_doubles() {
        assert_eq!(
            StaticSentimentProvider::new(0.4)
                .fetch_sentiment("X")
                .await
                .unwrap(),
            0.4
        );
        let err = FailingSentimentProvider.fetch_sentiment("X").await.unwrap_err();
        assert_eq!(err.symbol(), "X");
    }

    #[test]
    fn test_manual_clock() {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::seconds(301));
        assert_eq!(clock.now(), start + Duration::seconds(301));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
