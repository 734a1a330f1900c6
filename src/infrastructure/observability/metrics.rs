//! Prometheus metrics definitions for Stockcast
//!
//! All metrics use the `stockcast_` prefix.

use crate::domain::ml::ModelFlags;
use prometheus::{
    CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge, GenericGaugeVec},
};
use std::sync::Arc;

/// Prometheus metrics for the prediction service
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Pipeline runs by outcome (success, failure)
    pub predictions_total: CounterVec,
    /// Cache lookups by result (hit, miss)
    pub cache_requests_total: CounterVec,
    /// Symbols currently cached
    pub cache_entries: GenericGauge<AtomicF64>,
    /// Models that contributed to a prediction, per kind
    pub models_trained_total: CounterVec,
    /// Full pipeline duration (fetch, train, combine) in seconds
    pub pipeline_duration_seconds: HistogramVec,
    /// Last sentiment score per symbol (-1 to 1)
    pub sentiment_score: GenericGaugeVec<AtomicF64>,
    /// Sentiment fetches that fell back to neutral
    pub sentiment_failures_total: CounterVec,
    /// Uptime in seconds
    pub uptime_seconds: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let predictions_total = CounterVec::new(
            Opts::new("stockcast_predictions_total", "Prediction runs by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let cache_requests_total = CounterVec::new(
            Opts::new(
                "stockcast_cache_requests_total",
                "Prediction cache lookups by result",
            ),
            &["result"],
        )?;
        registry.register(Box::new(cache_requests_total.clone()))?;

        let cache_entries = Gauge::with_opts(Opts::new(
            "stockcast_cache_entries",
            "Number of cached predictions",
        ))?;
        registry.register(Box::new(cache_entries.clone()))?;

        let models_trained_total = CounterVec::new(
            Opts::new(
                "stockcast_models_trained_total",
                "Models contributing to a prediction, by kind",
            ),
            &["model"],
        )?;
        registry.register(Box::new(models_trained_total.clone()))?;

        let pipeline_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "stockcast_pipeline_duration_seconds",
                "End-to-end prediction pipeline duration in seconds",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
            &["symbol"],
        )?;
        registry.register(Box::new(pipeline_duration_seconds.clone()))?;

        let sentiment_score = GaugeVec::new(
            Opts::new(
                "stockcast_sentiment_score",
                "Most recent news sentiment per symbol (-1 to 1)",
            ),
            &["symbol"],
        )?;
        registry.register(Box::new(sentiment_score.clone()))?;

        let sentiment_failures_total = CounterVec::new(
            Opts::new(
                "stockcast_sentiment_failures_total",
                "Sentiment fetches that fell back to neutral",
            ),
            &["provider"],
        )?;
        registry.register(Box::new(sentiment_failures_total.clone()))?;

        let uptime_seconds = Gauge::with_opts(Opts::new(
            "stockcast_uptime_seconds",
            "Process uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            predictions_total,
            cache_requests_total,
            cache_entries,
            models_trained_total,
            pipeline_duration_seconds,
            sentiment_score,
            sentiment_failures_total,
            uptime_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_predictions(&self, outcome: &str) {
        self.predictions_total.with_label_values(&[outcome]).inc();
    }

    pub fn predictions(&self, outcome: &str) -> f64 {
        self.predictions_total.with_label_values(&[outcome]).get()
    }

    pub fn record_cache_lookup(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.cache_requests_total.with_label_values(&[result]).inc();
    }

    pub fn cache_lookups(&self, result: &str) -> f64 {
        self.cache_requests_total.with_label_values(&[result]).get()
    }

    pub fn record_models(&self, flags: &ModelFlags) {
        for (model, used) in [
            ("rf", flags.rf),
            ("gb", flags.gb),
            ("xgb", flags.xgb),
            ("lstm", flags.lstm),
        ] {
            if used {
                self.models_trained_total.with_label_values(&[model]).inc();
            }
        }
    }

    pub fn models_trained(&self, model: &str) -> f64 {
        self.models_trained_total.with_label_values(&[model]).get()
    }

    pub fn observe_pipeline(&self, symbol: &str, seconds: f64) {
        self.pipeline_duration_seconds
            .with_label_values(&[symbol])
            .observe(seconds);
    }

    pub fn set_sentiment(&self, symbol: &str, score: f64) {
        self.sentiment_score.with_label_values(&[symbol]).set(score);
    }

    pub fn inc_sentiment_failures(&self, provider: &str) {
        self.sentiment_failures_total
            .with_label_values(&[provider])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_predictions("success");
        assert!(metrics.render().contains("stockcast_"));
    }

    #[test]
    fn test_cache_lookup_counters() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_cache_lookup(true);
        metrics.record_cache_lookup(false);
        metrics.record_cache_lookup(false);
        assert_eq!(metrics.cache_lookups("hit"), 1.0);
        assert_eq!(metrics.cache_lookups("miss"), 2.0);
    }

    #[test]
    fn test_model_flags_recorded() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_models(&ModelFlags {
            rf: true,
            gb: true,
            xgb: false,
            lstm: false,
        });
        assert_eq!(metrics.models_trained("rf"), 1.0);
        assert_eq!(metrics.models_trained("xgb"), 0.0);
        assert!(metrics.render().contains("stockcast_models_trained_total"));
    }

    #[test]
    fn test_sentiment_gauge_per_symbol() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.set_sentiment("AAPL", 0.25);
        metrics.set_sentiment("MSFT", -0.5);
        let output = metrics.render();
        assert!(output.contains("stockcast_sentiment_score"));
        assert!(output.contains("AAPL"));
        assert!(output.contains("MSFT"));
    }
}
