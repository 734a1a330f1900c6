use super::predictor::{TabularRegressor, to_dense_rows};
use crate::domain::ml::ModelKind;
use ndarray::{Array2, ArrayView1};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomForestParams {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 150,
            max_depth: 15,
            min_samples_split: 5,
            seed: 42,
        }
    }
}

pub struct RandomForestModel {
    model: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
}

impl RandomForestModel {
    pub fn fit(x: &Array2<f64>, y: &[f64], params: RandomForestParams) -> Result<Self, String> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(format!(
                "Invalid training set: {} rows, {} targets",
                x.nrows(),
                y.len()
            ));
        }

        let x_matrix = DenseMatrix::from_2d_vec(&to_dense_rows(x))
            .map_err(|e| format!("Matrix error: {}", e))?;
        let rf_params = RandomForestRegressorParameters::default()
            .with_n_trees(params.n_trees)
            .with_max_depth(params.max_depth)
            .with_min_samples_split(params.min_samples_split)
            .with_seed(params.seed);

        let model = RandomForestRegressor::fit(&x_matrix, &y.to_vec(), rf_params)
            .map_err(|e| format!("Training error: {}", e))?;

        Ok(Self { model })
    }
}

impl TabularRegressor for RandomForestModel {
    fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64, String> {
        let input = DenseMatrix::from_2d_vec(&vec![row.to_vec()])
            .map_err(|e| format!("Matrix creation failed: {}", e))?;

        let predictions = self
            .model
            .predict(&input)
            .map_err(|e| format!("Prediction failed: {}", e))?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| "No prediction returned".to_string())
    }

    fn predict_rows(&self, x: &Array2<f64>) -> Result<Vec<f64>, String> {
        let input = DenseMatrix::from_2d_vec(&to_dense_rows(x))
            .map_err(|e| format!("Matrix creation failed: {}", e))?;
        self.model
            .predict(&input)
            .map_err(|e| format!("Prediction failed: {}", e))
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Rf
    }

    fn name(&self) -> &str {
        "SmartCore Random Forest"
    }
}
