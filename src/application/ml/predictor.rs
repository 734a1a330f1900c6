use crate::domain::ml::ModelKind;
use ndarray::{Array2, ArrayView1};

/// A fitted regressor over scaled feature rows.
pub trait TabularRegressor: Send + Sync {
    /// Predict the next close for one scaled feature row.
    fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64, String>;

    /// Predict for every row of a scaled matrix.
    fn predict_rows(&self, x: &Array2<f64>) -> Result<Vec<f64>, String> {
        x.rows().into_iter().map(|r| self.predict_row(r)).collect()
    }

    fn kind(&self) -> ModelKind;

    fn name(&self) -> &str;
}

pub(crate) fn to_dense_rows(x: &Array2<f64>) -> Vec<Vec<f64>> {
    x.rows().into_iter().map(|r| r.to_vec()).collect()
}
