//! Line-oriented command session over one long-lived `PredictionService`.
//!
//! Every command in a session shares the same service, so cached results
//! and `clear-cache` carry over from one line to the next.
//!
//! ```text
//! predict AAPL [--no-cache] [--json]
//! quote AAPL
//! clear-cache
//! health
//! supported
//! quit
//! ```

use super::service::PredictionService;
use crate::domain::market::universe;
use crate::domain::prediction::PredictionResult;

/// What the caller should do after a command line is handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Output(String),
    Error(String),
    Empty,
    Quit,
}

pub struct Session<'a> {
    service: &'a PredictionService,
}

impl<'a> Session<'a> {
    pub fn new(service: &'a PredictionService) -> Self {
        Self { service }
    }

    pub async fn handle(&self, line: &str) -> Reply {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Reply::Empty;
        };
        let args: Vec<&str> = words.collect();

        match command.to_lowercase().as_str() {
            "predict" => self.predict(&args).await,
            "quote" => match args.as_slice() {
                [symbol] => match self.service.quote(symbol).await {
                    Ok(quote) => to_json(&quote),
                    Err(e) => Reply::Error(e.to_string()),
                },
                _ => Reply::Error("usage: quote <SYMBOL>".to_string()),
            },
            "clear-cache" => {
                let dropped = self.service.clear_cache();
                Reply::Output(format!("Cleared {} cached predictions", dropped))
            }
            "health" => to_json(&self.service.capabilities()),
            "supported" => Reply::Output(supported_listing()),
            "quit" | "exit" => Reply::Quit,
            other => Reply::Error(format!("unknown command '{}'", other)),
        }
    }

    async fn predict(&self, args: &[&str]) -> Reply {
        let mut symbol = None;
        let mut use_cache = true;
        let mut json = false;
        for arg in args {
            match *arg {
                "--no-cache" => use_cache = false,
                "--json" => json = true,
                flag if flag.starts_with("--") => {
                    return Reply::Error(format!("unknown flag '{}'", flag));
                }
                value if symbol.is_none() => symbol = Some(value),
                _ => return Reply::Error(PREDICT_USAGE.to_string()),
            }
        }
        let Some(symbol) = symbol else {
            return Reply::Error(PREDICT_USAGE.to_string());
        };

        match self.service.predict(symbol, use_cache).await {
            Ok(result) if json => to_json(&result),
            Ok(result) => Reply::Output(summary_line(&result)),
            Err(e) => Reply::Error(e.to_string()),
        }
    }
}

const PREDICT_USAGE: &str = "usage: predict <SYMBOL> [--no-cache] [--json]";

fn to_json<T: serde::Serialize>(value: &T) -> Reply {
    match serde_json::to_string_pretty(value) {
        Ok(text) => Reply::Output(text),
        Err(e) => Reply::Error(e.to_string()),
    }
}

/// One-line human summary of a forecast.
pub fn summary_line(result: &PredictionResult) -> String {
    format!(
        "{} {:.2} -> {:.2} ({:+.2}%, {}) confidence {:.0}% | sentiment {:.2} ({}) | {} bars",
        result.symbol,
        result.current_price,
        result.predicted_price,
        result.change_percent,
        result.direction,
        result.confidence,
        result.sentiment,
        result.sentiment_label,
        result.data_points
    )
}

pub fn supported_listing() -> String {
    format!(
        "Stocks: {}\nCrypto: {}\nTotal:  {}",
        universe::SUPPORTED_STOCKS.join(", "),
        universe::SUPPORTED_CRYPTO.join(", "),
        universe::total_supported()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::ensemble::EnsembleCombiner;
    use crate::application::ml::trainer::ModelTrainers;
    use crate::application::prediction::{PipelineSettings, PredictionPipeline};
    use crate::domain::ports::Clock;
    use crate::infrastructure::mock::{
        ManualClock, MockMarketDataService, StaticSentimentProvider, constant_bars,
    };
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;

    fn service(market: Arc<MockMarketDataService>) -> PredictionService {
        let mut trainers = ModelTrainers::default();
        trainers.random_forest.n_trees = 5;
        trainers.gradient_boosting.n_estimators = 5;
        #[cfg(feature = "xgboost")]
        {
            trainers.xgboost.n_estimators = 5;
        }
        trainers.lstm.hidden_size = 4;
        trainers.lstm.epochs = 1;
        let pipeline = PredictionPipeline::new(
            PipelineSettings::default(),
            trainers,
            EnsembleCombiner::default(),
        );
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 2, 2, 14, 30, 0).unwrap(),
        ));
        PredictionService::new(
            market,
            Arc::new(StaticSentimentProvider::new(0.0)),
            pipeline,
            clock as Arc<dyn Clock>,
            Duration::from_secs(300),
        )
    }

    fn flat_market() -> Arc<MockMarketDataService> {
        Arc::new(
            MockMarketDataService::new_no_sim().with_series("FLAT", constant_bars(100, 100.0)),
        )
    }

    #[tokio::test]
    async fn test_repeat_predict_is_served_from_cache() {
        let market = flat_market();
        let svc = service(market.clone());
        let session = Session::new(&svc);

        let first = session.handle("predict FLAT").await;
        let second = session.handle("predict flat").await;
        assert!(matches!(first, Reply::Output(ref line) if line.starts_with("FLAT 100.00 -> 100.00")));
        assert_eq!(first, second);
        assert_eq!(market.fetch_count(), 1);

        session.handle("predict FLAT --no-cache").await;
        assert_eq!(market.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let market = flat_market();
        let svc = service(market.clone());
        let session = Session::new(&svc);

        session.handle("predict FLAT").await;
        assert_eq!(
            session.handle("clear-cache").await,
            Reply::Output("Cleared 1 cached predictions".to_string())
        );
        assert_eq!(
            session.handle("clear-cache").await,
            Reply::Output("Cleared 0 cached predictions".to_string())
        );

        session.handle("predict FLAT").await;
        assert_eq!(market.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_json_predict_and_quote() {
        let svc = service(flat_market());
        let session = Session::new(&svc);

        let Reply::Output(text) = session.handle("predict FLAT --json").await else {
            panic!("expected JSON output");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["symbol"], "FLAT");

        let Reply::Output(text) = session.handle("quote flat").await else {
            panic!("expected quote output");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["price"], 100.0);
    }

    #[tokio::test]
    async fn test_bad_lines_report_errors() {
        let market = flat_market();
        let svc = service(market.clone());
        let session = Session::new(&svc);

        assert_eq!(session.handle("   ").await, Reply::Empty);
        assert!(matches!(session.handle("train FLAT").await, Reply::Error(ref m) if m.contains("unknown command")));
        assert!(matches!(session.handle("predict").await, Reply::Error(ref m) if m.starts_with("usage")));
        assert!(matches!(session.handle("predict FLAT --fast").await, Reply::Error(ref m) if m.contains("--fast")));
        assert!(matches!(session.handle("predict GONE").await, Reply::Error(_)));
        assert!(matches!(session.handle("quote").await, Reply::Error(_)));
        assert_eq!(session.handle("QUIT").await, Reply::Quit);
        assert_eq!(market.fetch_count(), 1);
    }
}
