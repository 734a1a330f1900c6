use super::cache::PredictionCache;
use super::pipeline::PredictionPipeline;
use crate::domain::errors::PredictionError;
use crate::domain::market::Quote;
use crate::domain::market::universe;
use crate::domain::ports::{Clock, MarketDataService};
use crate::domain::prediction::PredictionResult;
use crate::domain::sentiment::SentimentProvider;
use crate::infrastructure::observability::Metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// What this service instance can do, reported by `health`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub xgboost: bool,
    pub lstm: bool,
    pub sentiment_analyzer: bool,
    pub device: String,
    pub market_data: String,
    pub sentiment_provider: String,
    pub supported_symbols: usize,
    pub cached_predictions: usize,
}

/// Async front of the prediction core: fetches inputs, runs the pipeline
/// off the runtime, and owns the result cache.
pub struct PredictionService {
    market_data: Arc<dyn MarketDataService>,
    sentiment: Arc<dyn SentimentProvider>,
    sentiment_available: bool,
    pipeline: Arc<PredictionPipeline>,
    cache: PredictionCache,
    clock: Arc<dyn Clock>,
    metrics: Option<Metrics>,
}

impl PredictionService {
    pub fn new(
        market_data: Arc<dyn MarketDataService>,
        sentiment: Arc<dyn SentimentProvider>,
        pipeline: PredictionPipeline,
        clock: Arc<dyn Clock>,
        cache_ttl: Duration,
    ) -> Self {
        let sentiment_available = sentiment.is_available();
        if !sentiment_available {
            info!(
                "PredictionService: sentiment provider '{}' unavailable, using neutral sentiment",
                sentiment.name()
            );
        }

        Self {
            market_data,
            sentiment,
            sentiment_available,
            pipeline: Arc::new(pipeline),
            cache: PredictionCache::new(clock.clone(), cache_ttl),
            clock,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Predict the next close for `symbol`. With `use_cache`, a result
    /// younger than the cache TTL is returned without retraining.
    pub async fn predict(
        &self,
        symbol: &str,
        use_cache: bool,
    ) -> Result<PredictionResult, PredictionError> {
        let symbol = normalize(symbol)?;

        if use_cache {
            let cached = self.cache.get(&symbol);
            if let Some(metrics) = &self.metrics {
                metrics.record_cache_lookup(cached.is_some());
            }
            if let Some(result) = cached {
                info!("{}: serving cached prediction", symbol);
                return Ok(result);
            }
        }

        let started = Instant::now();
        let outcome = self.run_pipeline(&symbol).await;

        match &outcome {
            Ok(result) => {
                self.cache.put(&symbol, result.clone());
                if let Some(metrics) = &self.metrics {
                    metrics.inc_predictions("success");
                    metrics.record_models(&result.models);
                    metrics.observe_pipeline(&symbol, started.elapsed().as_secs_f64());
                    metrics.cache_entries.set(self.cache.len() as f64);
                }
            }
            Err(e) => {
                error!("Prediction error for {}: {}", symbol, e);
                if let Some(metrics) = &self.metrics {
                    metrics.inc_predictions("failure");
                }
            }
        }
        outcome
    }

    async fn run_pipeline(&self, symbol: &str) -> Result<PredictionResult, PredictionError> {
        let (series, sentiment) = tokio::join!(
            self.market_data.fetch_price_series(symbol),
            self.sentiment_for(symbol)
        );
        let series = series?;
        info!("Sentiment for {}: {:.3}", symbol, sentiment);

        let pipeline = self.pipeline.clone();
        let now = self.clock.now();
        tokio::task::spawn_blocking(move || pipeline.run(&series, sentiment, now))
            .await
            .map_err(|e| PredictionError::PipelineAborted {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?
    }

    /// Sentiment in [-1, 1]; any failure degrades to neutral.
    async fn sentiment_for(&self, symbol: &str) -> f64 {
        if !self.sentiment_available {
            return 0.0;
        }

        let score = match self.sentiment.fetch_sentiment(symbol).await {
            Ok(score) if score.is_finite() => score.clamp(-1.0, 1.0),
            Ok(score) => {
                warn!("{}: non-finite sentiment {} ignored", symbol, score);
                0.0
            }
            Err(e) => {
                warn!("{}", e);
                if let Some(metrics) = &self.metrics {
                    metrics.inc_sentiment_failures(self.sentiment.name());
                }
                0.0
            }
        };
        if let Some(metrics) = &self.metrics {
            metrics.set_sentiment(symbol, score);
        }
        score
    }

    /// Repeatedly predicts `symbol` with the cache bypassed, sending every
    /// iteration's outcome on `tx` and sleeping `interval` in between.
    /// Errors are delivered and the loop carries on. Stops when the
    /// receiver is dropped or after `max_iterations`. Returns the number of
    /// iterations delivered.
    pub async fn watch(
        &self,
        symbol: &str,
        interval: Duration,
        tx: mpsc::Sender<Result<PredictionResult, PredictionError>>,
        max_iterations: Option<usize>,
    ) -> usize {
        let mut delivered = 0;
        info!("Watching {} every {:?}", symbol, interval);

        loop {
            let outcome = self.predict(symbol, false).await;
            if tx.send(outcome).await.is_err() {
                info!("Watch on {} stopped: receiver closed", symbol);
                break;
            }
            delivered += 1;

            if max_iterations.is_some_and(|max| delivered >= max) {
                break;
            }
            tokio::time::sleep(interval).await;
        }
        delivered
    }

    pub async fn quote(&self, symbol: &str) -> anyhow::Result<Quote> {
        let symbol = normalize(symbol)?;
        self.market_data.latest_quote(&symbol).await
    }

    /// Empties the result cache, returning the number of entries dropped.
    pub fn clear_cache(&self) -> usize {
        let dropped = self.cache.clear();
        if let Some(metrics) = &self.metrics {
            metrics.cache_entries.set(0.0);
        }
        info!("Prediction cache cleared ({} entries)", dropped);
        dropped
    }

    pub fn cached(&self, symbol: &str) -> Option<PredictionResult> {
        self.cache.get(symbol)
    }

    pub fn capabilities(&self) -> Capabilities {
        let trainers = self.pipeline.capabilities();
        Capabilities {
            xgboost: trainers.xgb,
            lstm: trainers.lstm,
            sentiment_analyzer: self.sentiment_available,
            device: "CPU".to_string(),
            market_data: self.market_data.name().to_string(),
            sentiment_provider: self.sentiment.name().to_string(),
            supported_symbols: universe::total_supported(),
            cached_predictions: self.cache.len(),
        }
    }
}

fn normalize(symbol: &str) -> Result<String, PredictionError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() || symbol.chars().any(char::is_whitespace) {
        return Err(PredictionError::InvalidSymbol { symbol });
    }
    Ok(symbol)
}
