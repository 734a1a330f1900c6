use crate::domain::errors::PredictionError;
use crate::domain::market::{PriceSeries, Quote};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// Daily history for `symbol`. Fails with `DataUnavailable` when the
    /// history is empty or shorter than `MIN_OBSERVATIONS`.
    async fn fetch_price_series(&self, symbol: &str) -> Result<PriceSeries, PredictionError>;

    async fn latest_quote(&self, symbol: &str) -> anyhow::Result<Quote>;

    fn name(&self) -> &str;
}

/// Time source, injected so cache expiry can be tested without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
