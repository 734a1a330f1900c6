use super::predictor::{TabularRegressor, to_dense_rows};
use crate::domain::ml::ModelKind;
use ndarray::{Array2, ArrayView1};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use tracing::trace;

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientBoostingParams {
    pub n_estimators: usize,
    pub max_depth: u16,
    pub learning_rate: f64,
    pub min_samples_split: usize,
}

impl Default for GradientBoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 5,
            learning_rate: 0.1,
            min_samples_split: 2,
        }
    }
}

/// Least-squares gradient boosting: each stage fits a regression tree to
/// the residuals of the stages before it.
pub struct GradientBoostingModel {
    init: f64,
    learning_rate: f64,
    stages: Vec<Tree>,
}

impl GradientBoostingModel {
    pub fn fit(
        x: &Array2<f64>,
        y: &[f64],
        params: GradientBoostingParams,
    ) -> Result<Self, String> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(format!(
                "Invalid training set: {} rows, {} targets",
                x.nrows(),
                y.len()
            ));
        }

        let x_matrix = DenseMatrix::from_2d_vec(&to_dense_rows(x))
            .map_err(|e| format!("Matrix error: {}", e))?;

        let init = y.iter().sum::<f64>() / y.len() as f64;
        let mut current = vec![init; y.len()];
        let mut stages = Vec::with_capacity(params.n_estimators);

        for stage in 0..params.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, p)| t - p).collect();

            let tree_params = DecisionTreeRegressorParameters::default()
                .with_max_depth(params.max_depth)
                .with_min_samples_split(params.min_samples_split);
            let tree = Tree::fit(&x_matrix, &residuals, tree_params)
                .map_err(|e| format!("Stage {} training error: {}", stage, e))?;

            let update = tree
                .predict(&x_matrix)
                .map_err(|e| format!("Stage {} predict error: {}", stage, e))?;
            for (p, u) in current.iter_mut().zip(&update) {
                *p += params.learning_rate * u;
            }
            stages.push(tree);
        }

        trace!(
            "GradientBoosting: fitted {} stages on {} rows",
            stages.len(),
            y.len()
        );

        Ok(Self {
            init,
            learning_rate: params.learning_rate,
            stages,
        })
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }
}

impl TabularRegressor for GradientBoostingModel {
    fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64, String> {
        let input = DenseMatrix::from_2d_vec(&vec![row.to_vec()])
            .map_err(|e| format!("Matrix creation failed: {}", e))?;

        let mut prediction = self.init;
        for tree in &self.stages {
            let out = tree
                .predict(&input)
                .map_err(|e| format!("Prediction failed: {}", e))?;
            prediction += self.learning_rate * out.first().copied().unwrap_or(0.0);
        }
        Ok(prediction)
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Gb
    }

    fn name(&self) -> &str {
        "Gradient Boosting"
    }
}
