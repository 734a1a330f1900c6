use super::trainer::ModelSet;
use crate::domain::ml::ModelKind;
use ndarray::Array2;
use std::collections::BTreeMap;

/// Holdout fit quality of one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldoutScore {
    pub mae: f64,
    pub r2: f64,
    pub samples: usize,
}

pub fn mean_absolute_error(predicted: &[f64], actual: &[f64]) -> Option<f64> {
    if predicted.is_empty() || predicted.len() != actual.len() {
        return None;
    }
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, t)| (p - t).abs())
        .sum();
    Some(sum / predicted.len() as f64)
}

/// Coefficient of determination. `None` when the actuals have no variance.
pub fn r_squared(predicted: &[f64], actual: &[f64]) -> Option<f64> {
    if predicted.is_empty() || predicted.len() != actual.len() {
        return None;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot <= f64::EPSILON {
        return None;
    }
    let ss_res: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, t)| (t - p).powi(2))
        .sum();
    Some(1.0 - ss_res / ss_tot)
}

/// Scores every tabular model on the held-out rows.
pub fn evaluate_holdout(
    models: &ModelSet,
    x_test: &Array2<f64>,
    y_test: &[f64],
) -> BTreeMap<ModelKind, HoldoutScore> {
    let mut scores = BTreeMap::new();
    if x_test.nrows() == 0 {
        return scores;
    }

    for model in models.tabular() {
        let Ok(predicted) = model.predict_rows(x_test) else {
            continue;
        };
        if let Some(mae) = mean_absolute_error(&predicted, y_test) {
            scores.insert(
                model.kind(),
                HoldoutScore {
                    mae,
                    r2: r_squared(&predicted, y_test).unwrap_or(f64::NAN),
                    samples: y_test.len(),
                },
            );
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mae() {
        assert_eq!(mean_absolute_error(&[1.0, 2.0], &[2.0, 4.0]), Some(1.5));
        assert_eq!(mean_absolute_error(&[], &[]), None);
        assert_eq!(mean_absolute_error(&[1.0], &[1.0, 2.0]), None);
    }

    #[test]
    fn test_r_squared() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(r_squared(&actual, &actual), Some(1.0));
        let mean_pred = [2.5; 4];
        assert!(r_squared(&mean_pred, &actual).unwrap().abs() < 1e-12);
        assert_eq!(r_squared(&[1.0, 1.0], &[3.0, 3.0]), None);
    }
}
