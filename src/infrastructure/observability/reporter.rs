//! Push-based metrics reporter for Stockcast
//!
//! Periodically outputs metrics as structured JSON to stdout.

use crate::infrastructure::observability::metrics::Metrics;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Metrics snapshot for JSON output
#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub predictions: PredictionSnapshot,
    pub cache: CacheSnapshot,
    pub models: ModelSnapshot,
}

#[derive(Serialize)]
pub struct PredictionSnapshot {
    pub success: u64,
    pub failure: u64,
}

#[derive(Serialize)]
pub struct CacheSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

#[derive(Serialize)]
pub struct ModelSnapshot {
    pub rf: u64,
    pub gb: u64,
    pub xgb: u64,
    pub lstm: u64,
}

/// Push-based metrics reporter
///
/// Outputs metrics as structured JSON logs on a configurable interval.
pub struct MetricsReporter {
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Metrics, interval_seconds: u64) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds.max(1)),
        }
    }

    /// Run the reporter in a loop, outputting metrics periodically
    pub async fn run(self) {
        info!(
            "MetricsReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );

        loop {
            tokio::time::sleep(self.interval).await;

            let snapshot = self.collect_snapshot();
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    println!("METRICS_JSON:{}", json);
                    info!(
                        "Predictions: {} ok / {} failed | Cache: {} entries | Uptime: {}s",
                        snapshot.predictions.success,
                        snapshot.predictions.failure,
                        snapshot.cache.entries,
                        snapshot.uptime_seconds
                    );
                }
                Err(e) => warn!("Failed to serialize metrics: {}", e),
            }
        }
    }

    fn collect_snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start_time.elapsed().as_secs();
        self.metrics.uptime_seconds.set(uptime as f64);

        let m = &self.metrics;
        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: uptime,
            version: env!("CARGO_PKG_VERSION").to_string(),
            predictions: PredictionSnapshot {
                success: m.predictions("success") as u64,
                failure: m.predictions("failure") as u64,
            },
            cache: CacheSnapshot {
                hits: m.cache_lookups("hit") as u64,
                misses: m.cache_lookups("miss") as u64,
                entries: m.cache_entries.get().max(0.0) as u64,
            },
            models: ModelSnapshot {
                rf: m.models_trained("rf") as u64,
                gb: m.models_trained("gb") as u64,
                xgb: m.models_trained("xgb") as u64,
                lstm: m.models_trained("lstm") as u64,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_snapshot_collection() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_predictions("success");
        metrics.inc_predictions("failure");
        metrics.inc_predictions("success");
        metrics.record_cache_lookup(true);
        metrics.cache_entries.set(3.0);

        let reporter = MetricsReporter::new(metrics, 60);
        let snapshot = reporter.collect_snapshot();

        assert_eq!(snapshot.predictions.success, 2);
        assert_eq!(snapshot.predictions.failure, 1);
        assert_eq!(snapshot.cache.hits, 1);
        assert_eq!(snapshot.cache.entries, 3);
        assert!(!snapshot.timestamp.is_empty());
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = MetricsSnapshot {
            timestamp: "2026-01-10T10:00:00Z".to_string(),
            uptime_seconds: 3600,
            version: "0.4.2".to_string(),
            predictions: PredictionSnapshot {
                success: 12,
                failure: 1,
            },
            cache: CacheSnapshot {
                hits: 40,
                misses: 13,
                entries: 5,
            },
            models: ModelSnapshot {
                rf: 12,
                gb: 12,
                xgb: 12,
                lstm: 9,
            },
        };

        let json = serde_json::to_string(&snapshot).expect("Failed to serialize");
        assert!(json.contains("\"hits\":40"));
        assert!(json.contains("\"lstm\":9"));
    }
}
