use super::gradient_boosting::{GradientBoostingModel, GradientBoostingParams};
use super::lstm::{LstmModel, LstmParams};
use super::predictor::TabularRegressor;
use super::random_forest::{RandomForestModel, RandomForestParams};
use super::sequence::SequenceWindows;
#[cfg(feature = "xgboost")]
use super::xgboost::{XgBoostModel, XgBoostParams};
use crate::domain::errors::PredictionError;
use crate::domain::ml::{ModelFlags, ModelKind};
use ndarray::{Array2, ArrayView1, ArrayView2};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, warn};

/// Which optional trainers this build/configuration can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainerCapabilities {
    pub xgb: bool,
    pub lstm: bool,
}

impl Default for TrainerCapabilities {
    fn default() -> Self {
        Self {
            xgb: cfg!(feature = "xgboost"),
            lstm: true,
        }
    }
}

/// Trained models for one symbol. Absent entries were skipped or failed.
#[derive(Default)]
pub struct ModelSet {
    tabular: BTreeMap<ModelKind, Box<dyn TabularRegressor>>,
    lstm: Option<LstmModel>,
}

impl ModelSet {
    pub fn insert_tabular(&mut self, model: Box<dyn TabularRegressor>) {
        self.tabular.insert(model.kind(), model);
    }

    pub fn set_lstm(&mut self, model: LstmModel) {
        self.lstm = Some(model);
    }

    pub fn contains(&self, kind: ModelKind) -> bool {
        match kind {
            ModelKind::Lstm => self.lstm.is_some(),
            other => self.tabular.contains_key(&other),
        }
    }

    pub fn flags(&self) -> ModelFlags {
        ModelFlags::from_kinds(ModelKind::ALL.into_iter().filter(|k| self.contains(*k)))
    }

    pub fn is_empty(&self) -> bool {
        self.tabular.is_empty() && self.lstm.is_none()
    }

    pub fn tabular(&self) -> impl Iterator<Item = &Box<dyn TabularRegressor>> {
        self.tabular.values()
    }

    pub fn lstm(&self) -> Option<&LstmModel> {
        self.lstm.as_ref()
    }

    /// Point predictions from every tabular model on one scaled row.
    /// A model that fails to predict is logged and left out.
    pub fn predict_tabular(&self, symbol: &str, row: ArrayView1<f64>) -> BTreeMap<ModelKind, f64> {
        let mut out = BTreeMap::new();
        for (kind, model) in &self.tabular {
            match model.predict_row(row) {
                Ok(p) if p.is_finite() => {
                    out.insert(*kind, p);
                }
                Ok(p) => warn!("{} [{}] produced non-finite prediction {}", symbol, kind, p),
                Err(e) => warn!("{} [{}] prediction failed: {}", symbol, kind, e),
            }
        }
        out
    }

    /// Tabular predictions plus the sequence model's prediction on `window`.
    pub fn predict_all(
        &self,
        symbol: &str,
        row: ArrayView1<f64>,
        window: Option<ArrayView2<f64>>,
    ) -> BTreeMap<ModelKind, f64> {
        let mut out = self.predict_tabular(symbol, row);
        if let (Some(model), Some(window)) = (&self.lstm, window) {
            match model.predict_window(window) {
                Ok(p) => {
                    out.insert(ModelKind::Lstm, p);
                }
                Err(e) => warn!("{} [lstm] prediction failed: {}", symbol, e),
            }
        }
        out
    }
}

/// Fits the ensemble members independently and in parallel.
#[derive(Debug, Clone, Default)]
pub struct ModelTrainers {
    pub random_forest: RandomForestParams,
    pub gradient_boosting: GradientBoostingParams,
    #[cfg(feature = "xgboost")]
    pub xgboost: XgBoostParams,
    pub lstm: LstmParams,
    pub capabilities: TrainerCapabilities,
}

type Trained = Option<Box<dyn TabularRegressor>>;

impl ModelTrainers {
    pub fn with_capabilities(mut self, capabilities: TrainerCapabilities) -> Self {
        self.capabilities = TrainerCapabilities {
            xgb: capabilities.xgb && cfg!(feature = "xgboost"),
            lstm: capabilities.lstm,
        };
        self
    }

    pub fn with_lstm_epochs(mut self, epochs: usize) -> Self {
        self.lstm.epochs = epochs;
        self
    }

    /// Train every available model. `sequences` is `None` when the history
    /// is too short for the sequence model.
    pub fn train_all(
        &self,
        symbol: &str,
        x_train: &Array2<f64>,
        y_train: &[f64],
        sequences: Option<&SequenceWindows>,
    ) -> ModelSet {
        let started = Instant::now();

        let ((rf, gb), (xgb, lstm)) = rayon::join(
            || {
                rayon::join(
                    || self.train_random_forest(symbol, x_train, y_train),
                    || self.train_gradient_boosting(symbol, x_train, y_train),
                )
            },
            || {
                rayon::join(
                    || self.train_xgboost(symbol, x_train, y_train),
                    || sequences.and_then(|w| self.train_lstm(symbol, w)),
                )
            },
        );

        let mut set = ModelSet::default();
        for model in [rf, gb, xgb].into_iter().flatten() {
            set.insert_tabular(model);
        }
        if let Some(model) = lstm {
            set.set_lstm(model);
        }

        debug!(
            "{}: trained {:?} on {} rows in {:?}",
            symbol,
            set.flags(),
            x_train.nrows(),
            started.elapsed()
        );
        set
    }

    fn train_random_forest(&self, symbol: &str, x: &Array2<f64>, y: &[f64]) -> Trained {
        let result = RandomForestModel::fit(x, y, self.random_forest);
        keep_or_warn(symbol, ModelKind::Rf, result.map(|m| Box::new(m) as Box<dyn TabularRegressor>))
    }

    fn train_gradient_boosting(&self, symbol: &str, x: &Array2<f64>, y: &[f64]) -> Trained {
        let result = GradientBoostingModel::fit(x, y, self.gradient_boosting);
        keep_or_warn(symbol, ModelKind::Gb, result.map(|m| Box::new(m) as Box<dyn TabularRegressor>))
    }

    #[cfg(feature = "xgboost")]
    fn train_xgboost(&self, symbol: &str, x: &Array2<f64>, y: &[f64]) -> Trained {
        if !self.capabilities.xgb {
            return None;
        }
        let result = XgBoostModel::fit(x, y, self.xgboost);
        keep_or_warn(symbol, ModelKind::Xgb, result.map(|m| Box::new(m) as Box<dyn TabularRegressor>))
    }

    #[cfg(not(feature = "xgboost"))]
    fn train_xgboost(&self, _symbol: &str, _x: &Array2<f64>, _y: &[f64]) -> Trained {
        None
    }

    fn train_lstm(&self, symbol: &str, windows: &SequenceWindows) -> Option<LstmModel> {
        if !self.capabilities.lstm {
            return None;
        }
        keep_or_warn(symbol, ModelKind::Lstm, LstmModel::fit(windows, &self.lstm))
    }
}

fn keep_or_warn<T>(symbol: &str, kind: ModelKind, result: Result<T, String>) -> Option<T> {
    match result {
        Ok(model) => Some(model),
        Err(reason) => {
            let err = PredictionError::ModelTraining {
                model: kind.to_string(),
                symbol: symbol.to_string(),
                reason,
            };
            warn!("{}", err);
            None
        }
    }
}
