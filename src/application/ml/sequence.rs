use ndarray::{Array1, Array2, Array3, ArrayView2, Axis, s};

/// Overlapping fixed-length windows over the scaled feature matrix.
///
/// `inputs` has shape `(windows, lookback, features)`. The target of
/// window `i` is the target of the row right after the window ends.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceWindows {
    inputs: Array3<f64>,
    targets: Array1<f64>,
}

impl SequenceWindows {
    pub fn create(matrix: &Array2<f64>, targets: &[f64], lookback: usize) -> Self {
        let rows = matrix.nrows().min(targets.len());
        let n_features = matrix.ncols();

        if lookback == 0 || rows <= lookback {
            return Self {
                inputs: Array3::zeros((0, lookback, n_features)),
                targets: Array1::zeros(0),
            };
        }

        let count = rows - lookback;
        let mut inputs = Array3::zeros((count, lookback, n_features));
        for (i, mut window) in inputs.axis_iter_mut(Axis(0)).enumerate() {
            window.assign(&matrix.slice(s![i..i + lookback, ..]));
        }
        let targets = Array1::from_iter((0..count).map(|i| targets[i + lookback]));

        Self { inputs, targets }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn lookback(&self) -> usize {
        self.inputs.len_of(Axis(1))
    }

    pub fn n_features(&self) -> usize {
        self.inputs.len_of(Axis(2))
    }

    pub fn inputs(&self) -> &Array3<f64> {
        &self.inputs
    }

    pub fn targets(&self) -> &Array1<f64> {
        &self.targets
    }

    /// The first `n` windows (training split).
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.len());
        Self {
            inputs: self.inputs.slice(s![..n, .., ..]).to_owned(),
            targets: self.targets.slice(s![..n]).to_owned(),
        }
    }

    pub fn last(&self) -> Option<ArrayView2<'_, f64>> {
        let n = self.len();
        (n > 0).then(|| self.inputs.index_axis(Axis(0), n - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(rows: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(r, c)| (r * 10 + c) as f64)
    }

    #[test]
    fn test_window_count_and_targets() {
        let m = ramp(30, 3);
        let targets: Vec<f64> = (0..30).map(|i| i as f64 * 2.0).collect();
        let w = SequenceWindows::create(&m, &targets, 5);

        assert_eq!(w.len(), 25);
        assert_eq!(w.lookback(), 5);
        assert_eq!(w.n_features(), 3);
        // window 0 covers rows 0..5, target comes from row 5
        assert_eq!(w.targets()[0], 10.0);
        assert_eq!(w.inputs()[[0, 4, 0]], 40.0);
        assert_eq!(w.inputs()[[24, 0, 1]], 241.0);
        assert_eq!(w.targets()[24], 58.0);
    }

    #[test]
    fn test_too_few_rows_yields_nothing() {
        let m = ramp(20, 2);
        let targets = vec![0.0; 20];
        assert!(SequenceWindows::create(&m, &targets, 20).is_empty());
        assert_eq!(SequenceWindows::create(&m, &targets, 19).len(), 1);
    }

    #[test]
    fn test_head_and_last() {
        let m = ramp(12, 2);
        let targets: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let w = SequenceWindows::create(&m, &targets, 4);

        let head = w.head(3);
        assert_eq!(head.len(), 3);
        assert_eq!(head.targets()[2], 6.0);
        assert_eq!(w.head(100).len(), w.len());

        let last = w.last().unwrap();
        assert_eq!(last.nrows(), 4);
        assert_eq!(last[[3, 0]], 110.0);
    }
}
