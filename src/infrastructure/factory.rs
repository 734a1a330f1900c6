use crate::application::ml::ensemble::{EnsembleCombiner, EnsembleWeights};
use crate::application::ml::trainer::ModelTrainers;
use crate::application::prediction::{PipelineSettings, PredictionPipeline, PredictionService};
use crate::config::{Config, Mode};
use crate::domain::ports::{Clock, MarketDataService, SystemClock};
use crate::domain::sentiment::SentimentProvider;
use crate::infrastructure::market_data::{CsvMarketDataService, YahooMarketDataService};
use crate::infrastructure::mock::{MockMarketDataService, StaticSentimentProvider};
use crate::infrastructure::news::NewsApiSentimentProvider;
use crate::infrastructure::observability::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct ServiceFactory;

impl ServiceFactory {
    pub fn create_market_data(config: &Config) -> Arc<dyn MarketDataService> {
        match config.mode {
            Mode::Yahoo => Arc::new(YahooMarketDataService::new(
                config.market_data.yahoo_base_url.clone(),
                config.market_data.history_years,
            )),
            Mode::Csv => Arc::new(CsvMarketDataService::new(
                config.market_data.csv_data_dir.clone(),
            )),
            Mode::Mock => Arc::new(MockMarketDataService::new()),
        }
    }

    /// Mock mode never touches the network, so sentiment is pinned to neutral.
    pub fn create_sentiment(config: &Config) -> Arc<dyn SentimentProvider> {
        match config.mode {
            Mode::Mock => Arc::new(StaticSentimentProvider::new(0.0)),
            Mode::Yahoo | Mode::Csv => Arc::new(NewsApiSentimentProvider::new(
                config.sentiment.news_api_url.clone(),
                config.sentiment.news_api_key.clone(),
                config.sentiment.page_size,
                Duration::from_secs(config.sentiment.timeout_secs),
            )),
        }
    }

    pub fn create_pipeline(config: &Config) -> PredictionPipeline {
        let p = &config.prediction;
        let settings = PipelineSettings {
            lookback: p.lookback,
            train_split_ratio: p.train_split_ratio,
        };
        let weights = EnsembleWeights {
            rf: p.weight_rf,
            gb: p.weight_gb,
            xgb: p.weight_xgb,
            lstm: p.weight_lstm,
        };
        let trainers = ModelTrainers::default().with_lstm_epochs(p.lstm_epochs);
        PredictionPipeline::new(settings, trainers, EnsembleCombiner::new(weights))
    }

    pub fn create_prediction_service(config: &Config, metrics: Option<Metrics>) -> PredictionService {
        let market_data = Self::create_market_data(config);
        let sentiment = Self::create_sentiment(config);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        info!(
            "ServiceFactory: market data '{}', sentiment '{}', cache TTL {}s",
            market_data.name(),
            sentiment.name(),
            config.prediction.cache_ttl_secs
        );

        let service = PredictionService::new(
            market_data,
            sentiment,
            Self::create_pipeline(config),
            clock,
            Duration::from_secs(config.prediction.cache_ttl_secs),
        );
        match metrics {
            Some(metrics) => service.with_metrics(metrics),
            None => service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_mode_wiring() {
        let config = Config {
            mode: Mode::Mock,
            ..Config::default()
        };
        assert_eq!(ServiceFactory::create_market_data(&config).name(), "mock");
        assert_eq!(ServiceFactory::create_sentiment(&config).name(), "static");

        let caps = ServiceFactory::create_prediction_service(&config, None).capabilities();
        assert!(caps.sentiment_analyzer);
        assert_eq!(caps.cached_predictions, 0);
    }

    #[test]
    fn test_pipeline_takes_configured_settings() {
        let mut config = Config::default();
        config.prediction.lookback = 12;
        config.prediction.weight_lstm = 0.0;

        let pipeline = ServiceFactory::create_pipeline(&config);
        assert_eq!(pipeline.settings().lookback, 12);
    }

    #[test]
    fn test_news_provider_without_key_is_unavailable() {
        let config = Config::default();
        let sentiment = ServiceFactory::create_sentiment(&config);
        assert!(!sentiment.is_available());
    }
}
