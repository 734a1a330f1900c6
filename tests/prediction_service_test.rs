use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use stockcast::application::ml::ensemble::EnsembleCombiner;
use stockcast::application::ml::trainer::ModelTrainers;
use stockcast::application::prediction::{PipelineSettings, PredictionPipeline, PredictionService};
use stockcast::domain::errors::PredictionError;
use stockcast::domain::ports::Clock;
use stockcast::domain::sentiment::SentimentProvider;
use stockcast::infrastructure::mock::{
    FailingSentimentProvider, ManualClock, MockMarketDataService, StaticSentimentProvider,
    constant_bars,
};
use tokio::sync::mpsc;

fn fast_pipeline() -> PredictionPipeline {
    let mut trainers = ModelTrainers::default();
    trainers.random_forest.n_trees = 8;
    trainers.gradient_boosting.n_estimators = 8;
    #[cfg(feature = "xgboost")]
    {
        trainers.xgboost.n_estimators = 8;
    }
    trainers.lstm.hidden_size = 4;
    trainers.lstm.epochs = 1;
    PredictionPipeline::new(
        PipelineSettings::default(),
        trainers,
        EnsembleCombiner::default(),
    )
}

struct Harness {
    market: Arc<MockMarketDataService>,
    clock: Arc<ManualClock>,
    service: PredictionService,
}

fn harness(market: MockMarketDataService, sentiment: Arc<dyn SentimentProvider>) -> Harness {
    let market = Arc::new(market);
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 2, 2, 14, 30, 0).unwrap(),
    ));
    let service = PredictionService::new(
        market.clone(),
        sentiment,
        fast_pipeline(),
        clock.clone() as Arc<dyn Clock>,
        Duration::from_secs(300),
    );
    Harness {
        market,
        clock,
        service,
    }
}

fn flat_market() -> MockMarketDataService {
    MockMarketDataService::new_no_sim().with_series("FLAT", constant_bars(100, 100.0))
}

#[tokio::test]
async fn test_cache_expires_after_ttl() {
    let h = harness(flat_market(), Arc::new(StaticSentimentProvider::new(0.0)));

    let first = h.service.predict("FLAT", true).await.unwrap();
    assert_eq!(h.market.fetch_count(), 1);

    h.clock.advance(ChronoDuration::seconds(299));
    let second = h.service.predict("flat", true).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(h.market.fetch_count(), 1);

    h.clock.advance(ChronoDuration::seconds(1));
    let third = h.service.predict("FLAT", true).await.unwrap();
    assert_eq!(h.market.fetch_count(), 2);
    assert!(third.timestamp > first.timestamp);
}

#[tokio::test]
async fn test_bypass_and_clear_cache() {
    let h = harness(flat_market(), Arc::new(StaticSentimentProvider::new(0.0)));

    h.service.predict("FLAT", true).await.unwrap();
    h.service.predict("FLAT", false).await.unwrap();
    assert_eq!(h.market.fetch_count(), 2);
    assert!(h.service.cached("FLAT").is_some());
    assert_eq!(h.service.capabilities().cached_predictions, 1);

    assert_eq!(h.service.clear_cache(), 1);
    assert!(h.service.cached("FLAT").is_none());
    h.service.predict("FLAT", true).await.unwrap();
    assert_eq!(h.market.fetch_count(), 3);
}

#[tokio::test]
async fn test_sentiment_outage_degrades_to_neutral() {
    let h = harness(flat_market(), Arc::new(FailingSentimentProvider));

    let result = h.service.predict("FLAT", false).await.unwrap();
    assert_eq!(result.sentiment, 0.0);
    assert_eq!(result.sentiment_label.to_string(), "neutral");
    assert_eq!(result.predicted_price, 100.0);
}

#[tokio::test]
async fn test_invalid_symbol_rejected_before_fetch() {
    let h = harness(flat_market(), Arc::new(StaticSentimentProvider::new(0.0)));

    let err = h.service.predict("   ", true).await.unwrap_err();
    assert!(matches!(err, PredictionError::InvalidSymbol { .. }));
    assert_eq!(h.market.fetch_count(), 0);
}

#[tokio::test]
async fn test_watch_keeps_going_after_errors() {
    let h = harness(
        MockMarketDataService::new_no_sim(),
        Arc::new(StaticSentimentProvider::new(0.0)),
    );
    let (tx, mut rx) = mpsc::channel(8);

    let delivered = h
        .service
        .watch("GONE", Duration::from_millis(1), tx, Some(3))
        .await;
    assert_eq!(delivered, 3);

    let mut errors = 0;
    while let Some(outcome) = rx.recv().await {
        assert!(matches!(outcome, Err(PredictionError::DataUnavailable { .. })));
        errors += 1;
    }
    assert_eq!(errors, 3);
    assert_eq!(h.market.fetch_count(), 3);
}

#[tokio::test]
async fn test_watch_picks_up_new_data() {
    let h = harness(
        MockMarketDataService::new_no_sim(),
        Arc::new(StaticSentimentProvider::new(0.0)),
    );
    let (tx, mut rx) = mpsc::channel(1);
    let market = h.market.clone();

    let consumer = async move {
        let first = rx.recv().await;
        market.set_series("LATE", constant_bars(100, 42.0)).await;
        let second = rx.recv().await;
        (first, second)
    };
    let (delivered, (first, second)) = tokio::join!(
        h.service
            .watch("LATE", Duration::from_millis(1), tx, Some(2)),
        consumer
    );

    assert_eq!(delivered, 2);
    assert!(matches!(first, Some(Err(_))));
    let result = second.unwrap().unwrap();
    assert_eq!(result.predicted_price, 42.0);
}

#[tokio::test]
async fn test_watch_stops_when_receiver_dropped() {
    let h = harness(flat_market(), Arc::new(StaticSentimentProvider::new(0.0)));
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let delivered = h
        .service
        .watch("FLAT", Duration::from_millis(1), tx, None)
        .await;
    assert_eq!(delivered, 0);
}

#[tokio::test]
async fn test_quote_uses_last_bar() {
    let h = harness(flat_market(), Arc::new(StaticSentimentProvider::new(0.0)));

    let quote = h.service.quote("flat").await.unwrap();
    assert_eq!(quote.symbol, "FLAT");
    assert_eq!(quote.price, 100.0);
    assert!(h.service.quote("NOPE").await.is_err());
}
