use crate::domain::errors::PredictionError;
use crate::domain::ml::ModelKind;
use std::collections::BTreeMap;

/// Relative weight of each ensemble member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleWeights {
    pub rf: f64,
    pub gb: f64,
    pub xgb: f64,
    pub lstm: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            rf: 0.35,
            gb: 0.25,
            xgb: 0.25,
            lstm: 0.15,
        }
    }
}

impl EnsembleWeights {
    pub fn weight(&self, kind: ModelKind) -> f64 {
        match kind {
            ModelKind::Rf => self.rf,
            ModelKind::Gb => self.gb,
            ModelKind::Xgb => self.xgb,
            ModelKind::Lstm => self.lstm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleOutput {
    pub prediction: f64,
    pub total_weight: f64,
}

/// Weighted average over whichever models produced a prediction,
/// renormalized by the weight actually used.
#[derive(Debug, Clone, Default)]
pub struct EnsembleCombiner {
    weights: EnsembleWeights,
}

impl EnsembleCombiner {
    pub fn new(weights: EnsembleWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &EnsembleWeights {
        &self.weights
    }

    pub fn combine(
        &self,
        symbol: &str,
        predictions: &BTreeMap<ModelKind, f64>,
    ) -> Result<EnsembleOutput, PredictionError> {
        let (weighted, total_weight) = predictions
            .iter()
            .map(|(kind, p)| (*p, self.weights.weight(*kind)))
            .filter(|(p, w)| p.is_finite() && *w > 0.0)
            .fold((0.0, 0.0), |(sum, total), (p, w)| (sum + p * w, total + w));

        if total_weight <= 0.0 {
            return Err(PredictionError::NoModelsAvailable {
                symbol: symbol.to_string(),
            });
        }

        Ok(EnsembleOutput {
            prediction: weighted / total_weight,
            total_weight,
        })
    }
}
