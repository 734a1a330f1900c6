use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Column-wise standardization (zero mean, unit variance).
///
/// Statistics use the population variance. Columns whose spread is
/// numerically zero keep a scale of 1 so they map to 0 instead of NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Self {
        let n_cols = x.ncols();
        if x.nrows() == 0 {
            return Self {
                means: Array1::zeros(n_cols),
                scales: Array1::ones(n_cols),
            };
        }

        let means = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_cols));
        let scales = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < 10.0 * f64::EPSILON { 1.0 } else { s });

        Self { means, scales }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.means) / &self.scales
    }

    pub fn transform_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        (&row - &self.means) / &self.scales
    }

    pub fn fit_transform(x: &Array2<f64>) -> (Self, Array2<f64>) {
        let scaler = Self::fit(x);
        let scaled = scaler.transform(x);
        (scaler, scaled)
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn scales(&self) -> &Array1<f64> {
        &self.scales
    }
}
