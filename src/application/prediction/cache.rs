use crate::domain::ports::Clock;
use crate::domain::prediction::PredictionResult;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub result: PredictionResult,
    pub cached_at: DateTime<Utc>,
}

/// Per-symbol store of the latest prediction, valid for `ttl` after it
/// was written.
pub struct PredictionCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl std::fmt::Debug for PredictionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionCache")
            .field("entries", &"<RwLock>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl PredictionCache {
    pub fn new(clock: Arc<dyn Clock>, ttl: std::time::Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            ttl: Duration::from_std(ttl).unwrap_or(Duration::seconds(300)),
        }
    }

    fn key(symbol: &str) -> String {
        symbol.trim().to_uppercase()
    }

    /// The cached result if it is younger than the TTL.
    pub fn get(&self, symbol: &str) -> Option<PredictionResult> {
        let now = self.clock.now();
        let key = Self::key(symbol);
        let fresh = |entry: &CacheEntry| now - entry.cached_at < self.ttl;

        match self.entries.read() {
            Ok(guard) => guard.get(&key).filter(|e| fresh(e)).map(|e| e.result.clone()),
            Err(poisoned) => poisoned
                .into_inner()
                .get(&key)
                .filter(|e| fresh(e))
                .map(|e| e.result.clone()),
        }
    }

    /// Store `result`, replacing whatever was cached for the symbol.
    pub fn put(&self, symbol: &str, result: PredictionResult) {
        let entry = CacheEntry {
            result,
            cached_at: self.clock.now(),
        };
        match self.entries.write() {
            Ok(mut guard) => {
                guard.insert(Self::key(symbol), entry);
            }
            Err(poisoned) => {
                tracing::error!("PredictionCache: Lock poisoned during write, recovering");
                poisoned.into_inner().insert(Self::key(symbol), entry);
            }
        }
    }

    /// Drops every entry and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut guard = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let dropped = guard.len();
        guard.clear();
        dropped
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::ModelFlags;
    use crate::domain::prediction::{DISCLAIMER, Direction, IndicatorSnapshot};
    use crate::domain::sentiment::SentimentLabel;
    use crate::infrastructure::mock::ManualClock;
    use chrono::TimeZone;

    fn result(symbol: &str, price: f64) -> PredictionResult {
        PredictionResult {
            symbol: symbol.to_string(),
            current_price: price,
            predicted_price: price,
            change: 0.0,
            change_percent: 0.0,
            direction: Direction::Neutral,
            confidence: 70.0,
            sentiment: 0.0,
            sentiment_label: SentimentLabel::Neutral,
            indicators: IndicatorSnapshot {
                rsi: 50.0,
                macd: 0.0,
                volatility: 0.0,
                ma20: price,
                ma50: Some(price),
            },
            models: ModelFlags::default(),
            data_points: 50,
            timestamp: Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap(),
            disclaimer: DISCLAIMER.to_string(),
        }
    }

    fn cache() -> (Arc<ManualClock>, PredictionCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap(),
        ));
        let cache = PredictionCache::new(clock.clone(), std::time::Duration::from_secs(300));
        (clock, cache)
    }

    #[test]
    fn test_get_after_put() {
        let (_, cache) = cache();
        cache.put("aapl", result("AAPL", 190.0));
        assert_eq!(cache.get("AAPL"), Some(result("AAPL", 190.0)));
        assert_eq!(cache.get(" aapl "), Some(result("AAPL", 190.0)));
    }

    #[test]
    fn test_expires_after_ttl() {
        let (clock, cache) = cache();
        cache.put("MSFT", result("MSFT", 400.0));

        clock.advance(Duration::seconds(299));
        assert!(cache.get("MSFT").is_some());

        clock.advance(Duration::seconds(1));
        assert!(cache.get("MSFT").is_none());
        // Expired entries stay stored until overwritten or cleared
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_overwrites_and_resets_age() {
        let (clock, cache) = cache();
        cache.put("TSLA", result("TSLA", 200.0));
        clock.advance(Duration::seconds(250));
        cache.put("TSLA", result("TSLA", 210.0));
        clock.advance(Duration::seconds(100));

        assert_eq!(cache.get("TSLA").map(|r| r.current_price), Some(210.0));
    }

    #[test]
    fn test_clear_empties_everything() {
        let (_, cache) = cache();
        cache.put("AAPL", result("AAPL", 1.0));
        cache.put("BTC-USD", result("BTC-USD", 2.0));
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.get("AAPL").is_none());
        assert!(cache.get("BTC-USD").is_none());
    }
}
