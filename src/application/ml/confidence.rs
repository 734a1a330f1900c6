use crate::domain::ml::ModelKind;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

pub const MIN_CONFIDENCE: f64 = 50.0;
pub const MAX_CONFIDENCE: f64 = 95.0;
pub const DEFAULT_CONFIDENCE: f64 = 70.0;

/// Scores how much the tabular models agree on the latest row.
///
/// Dispersion is the population standard deviation of their point
/// predictions, expressed relative to the current price. The sequence
/// model never takes part.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceEstimator;

impl ConfidenceEstimator {
    pub fn estimate(&self, predictions: &BTreeMap<ModelKind, f64>, current_price: f64) -> f64 {
        let tabular: Vec<f64> = predictions
            .iter()
            .filter(|(kind, _)| kind.is_tabular())
            .map(|(_, p)| *p)
            .collect();

        if tabular.len() < 2 {
            return DEFAULT_CONFIDENCE;
        }

        let std_dev = tabular.iter().population_std_dev();
        let raw = 100.0 - (std_dev / current_price * 1000.0);
        if !raw.is_finite() {
            return MIN_CONFIDENCE;
        }
        raw.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preds(entries: &[(ModelKind, f64)]) -> BTreeMap<ModelKind, f64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_perfect_agreement_hits_ceiling() {
        let c = ConfidenceEstimator.estimate(
            &preds(&[
                (ModelKind::Rf, 100.0),
                (ModelKind::Gb, 100.0),
                (ModelKind::Xgb, 100.0),
            ]),
            100.0,
        );
        assert_eq!(c, MAX_CONFIDENCE);
    }

    #[test]
    fn test_moderate_disagreement() {
        // population std of [99, 101] is 1.0 -> 100 - 1/100*1000 = 90
        let c = ConfidenceEstimator
            .estimate(&preds(&[(ModelKind::Rf, 99.0), (ModelKind::Gb, 101.0)]), 100.0);
        assert!((c - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_large_disagreement_hits_floor() {
        let c = ConfidenceEstimator
            .estimate(&preds(&[(ModelKind::Rf, 50.0), (ModelKind::Gb, 150.0)]), 100.0);
        assert_eq!(c, MIN_CONFIDENCE);
    }

    #[test]
    fn test_fewer_than_two_tabular_defaults() {
        let c = ConfidenceEstimator.estimate(
            &preds(&[(ModelKind::Rf, 100.0), (ModelKind::Lstm, 300.0)]),
            100.0,
        );
        assert_eq!(c, DEFAULT_CONFIDENCE);
        assert_eq!(ConfidenceEstimator.estimate(&BTreeMap::new(), 100.0), DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_sequence_model_excluded_from_dispersion() {
        let with_lstm = ConfidenceEstimator.estimate(
            &preds(&[
                (ModelKind::Rf, 99.0),
                (ModelKind::Gb, 101.0),
                (ModelKind::Lstm, 10.0),
            ]),
            100.0,
        );
        assert!((with_lstm - 90.0).abs() < 1e-9);
    }
}
