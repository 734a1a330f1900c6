use crate::application::ml::confidence::ConfidenceEstimator;
use crate::application::ml::ensemble::EnsembleCombiner;
use crate::application::ml::evaluation::evaluate_holdout;
use crate::application::ml::feature_builder::{FeatureBuilder, FeatureTable};
use crate::application::ml::scaler::StandardScaler;
use crate::application::ml::sequence::SequenceWindows;
use crate::application::ml::trainer::{ModelTrainers, TrainerCapabilities};
use crate::domain::errors::PredictionError;
use crate::domain::market::PriceSeries;
use crate::domain::ml::{ModelFlags, N_FEATURES};
use crate::domain::prediction::{
    DISCLAIMER, Direction, IndicatorSnapshot, PredictionResult, round_to,
};
use crate::domain::sentiment::SentimentLabel;
use chrono::{DateTime, Utc};
use ndarray::{Array2, s};
use tracing::{debug, info};

/// Fewest training windows the sequence model will be fitted on.
pub const MIN_SEQUENCE_TRAIN_WINDOWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub lookback: usize,
    pub train_split_ratio: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            lookback: 20,
            train_split_ratio: 0.8,
        }
    }
}

/// One synchronous feature-build, train, combine pass for a single symbol.
#[derive(Debug, Clone, Default)]
pub struct PredictionPipeline {
    settings: PipelineSettings,
    trainers: ModelTrainers,
    combiner: EnsembleCombiner,
    confidence: ConfidenceEstimator,
}

impl PredictionPipeline {
    pub fn new(settings: PipelineSettings, trainers: ModelTrainers, combiner: EnsembleCombiner) -> Self {
        Self {
            settings,
            trainers,
            combiner,
            confidence: ConfidenceEstimator,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn capabilities(&self) -> TrainerCapabilities {
        self.trainers.capabilities
    }

    pub fn run(
        &self,
        series: &PriceSeries,
        sentiment: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<PredictionResult, PredictionError> {
        let symbol = series.symbol();
        let table = FeatureBuilder::build(series, sentiment)?;
        let n = table.len();

        let x = feature_matrix(&table);
        let y = table.targets();
        let (_scaler, scaled) = StandardScaler::fit_transform(&x);

        let split = split_index(n, self.settings.train_split_ratio);
        let x_train = scaled.slice(s![..split, ..]).to_owned();
        let y_train = &y[..split];

        let windows = SequenceWindows::create(&scaled, &y, self.settings.lookback);
        let sequence_train = sequence_training_windows(&windows, split, self.settings.lookback);
        if sequence_train.is_none() {
            debug!(
                "{}: sequence model skipped ({} windows, lookback {})",
                symbol,
                windows.len(),
                self.settings.lookback
            );
        }

        let models = self
            .trainers
            .train_all(symbol, &x_train, y_train, sequence_train.as_ref());

        if split < n {
            let x_test = scaled.slice(s![split.., ..]).to_owned();
            for (kind, score) in evaluate_holdout(&models, &x_test, &y[split..]) {
                debug!(
                    "{} [{}] holdout MAE {:.4}, R2 {:.4} over {} rows",
                    symbol, kind, score.mae, score.r2, score.samples
                );
            }
        }

        let latest = scaled.row(n - 1);
        let predictions = models.predict_all(symbol, latest, windows.last());
        let ensemble = self.combiner.combine(symbol, &predictions)?;

        let last = table
            .last()
            .ok_or_else(|| PredictionError::data_unavailable(symbol, "empty feature table"))?;
        let current_price = last.close;
        let moved = price_move(current_price, ensemble.prediction);
        let confidence = self.confidence.estimate(&predictions, current_price);
        let models_used = ModelFlags::from_kinds(predictions.keys().copied());
        let sentiment = last.sentiment;

        info!(
            "{}: predicted {:.2} from {:.2} ({} models, weight {:.2}, confidence {:.1})",
            symbol,
            ensemble.prediction,
            current_price,
            models_used.count(),
            ensemble.total_weight,
            confidence
        );

        Ok(PredictionResult {
            symbol: symbol.to_string(),
            current_price: round_to(current_price, 2),
            predicted_price: round_to(ensemble.prediction, 2),
            change: moved.change,
            change_percent: moved.change_percent,
            direction: moved.direction,
            confidence: round_to(confidence, 1),
            sentiment: round_to(sentiment, 3),
            sentiment_label: SentimentLabel::from_score(sentiment),
            indicators: IndicatorSnapshot {
                rsi: round_to(last.rsi, 2),
                macd: round_to(last.macd, 4),
                volatility: round_to(last.volatility_20 * 100.0, 2),
                ma20: round_to(last.ma_20, 2),
                ma50: Some(round_to(last.ma_50, 2)),
            },
            models: models_used,
            data_points: n,
            timestamp,
            disclaimer: DISCLAIMER.to_string(),
        })
    }
}

/// Rounded change figures for the result record.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PriceMove {
    change: f64,
    change_percent: f64,
    direction: Direction,
}

/// Direction is the sign of the raw difference, so a move too small to
/// survive rounding still reports up or down.
fn price_move(current_price: f64, predicted: f64) -> PriceMove {
    let change = predicted - current_price;
    let change_percent = if current_price != 0.0 {
        change / current_price * 100.0
    } else {
        0.0
    };
    PriceMove {
        change: round_to(change, 2),
        change_percent: round_to(change_percent, 2),
        direction: Direction::from_change(change),
    }
}

fn feature_matrix(table: &FeatureTable) -> Array2<f64> {
    let rows = table.inputs();
    Array2::from_shape_fn((rows.len(), N_FEATURES), |(r, c)| rows[r][c])
}

/// Rows before this index train the models, the rest are held out.
fn split_index(n: usize, ratio: f64) -> usize {
    ((n as f64 * ratio) as usize).clamp(1, n.max(1))
}

/// Training windows for the sequence model, or `None` when the history is
/// too short: it needs at least `2 * lookback` windows overall and
/// `MIN_SEQUENCE_TRAIN_WINDOWS` inside the training split.
pub fn sequence_training_windows(
    windows: &SequenceWindows,
    split: usize,
    lookback: usize,
) -> Option<SequenceWindows> {
    if windows.len() < 2 * lookback {
        return None;
    }
    let train = split.saturating_sub(lookback);
    (train >= MIN_SEQUENCE_TRAIN_WINDOWS).then(|| windows.head(train))
}
