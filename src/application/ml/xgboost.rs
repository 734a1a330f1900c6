//! Second-order gradient boosted trees (the XGBoost formulation) for
//! squared-error regression.
//!
//! Splits are found with the exact greedy algorithm: every feature is
//! sorted once per node and every boundary between distinct values is
//! scored by the regularized gain. Thresholds sit halfway between the two
//! neighbouring values.

use super::predictor::TabularRegressor;
use crate::domain::ml::ModelKind;
use ndarray::{Array2, ArrayView1};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XgBoostParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 regularization on leaf weights.
    pub lambda: f64,
    /// Minimum loss reduction required to split.
    pub gamma: f64,
    pub min_child_weight: f64,
}

impl Default for XgBoostParams {
    fn default() -> Self {
        Self {
            n_estimators: 150,
            max_depth: 6,
            learning_rate: 0.1,
            lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn evaluate(&self, row: &ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(weight) => return *weight,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] < *threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a XgBoostParams,
}

impl TreeBuilder<'_> {
    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        -g / (h + self.params.lambda) * self.params.learning_rate
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.lambda)
    }

    fn build(&self, indices: &[usize], depth: usize) -> Node {
        let g: f64 = indices.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = indices.iter().map(|&i| self.hess[i]).sum();

        if depth >= self.params.max_depth || indices.len() < 2 {
            return Node::Leaf(self.leaf_weight(g, h));
        }

        match self.best_split(indices, g, h) {
            Some(split) => Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: Box::new(self.build(&split.left, depth + 1)),
                right: Box::new(self.build(&split.right, depth + 1)),
            },
            None => Node::Leaf(self.leaf_weight(g, h)),
        }
    }

    fn best_split(&self, indices: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let parent = self.score(g, h);
        let mut best: Option<(usize, f64, f64)> = None;
        let mut sorted = indices.to_vec();

        for feature in 0..self.x.ncols() {
            sorted.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

            let mut g_left = 0.0;
            let mut h_left = 0.0;
            for pos in 0..sorted.len() - 1 {
                let i = sorted[pos];
                g_left += self.grad[i];
                h_left += self.hess[i];

                let here = self.x[[i, feature]];
                let next = self.x[[sorted[pos + 1], feature]];
                if here == next {
                    continue;
                }

                let g_right = g - g_left;
                let h_right = h - h_left;
                if h_left < self.params.min_child_weight || h_right < self.params.min_child_weight
                {
                    continue;
                }

                let gain = 0.5
                    * (self.score(g_left, h_left) + self.score(g_right, h_right) - parent)
                    - self.params.gamma;
                if gain > 1e-12 && best.is_none_or(|(_, _, b)| gain > b) {
                    best = Some((feature, (here + next) / 2.0, gain));
                }
            }
        }

        let (feature, threshold, _) = best?;
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[[i, feature]] < threshold);

        Some(SplitCandidate {
            feature,
            threshold,
            left,
            right,
        })
    }
}

pub struct XgBoostModel {
    base_score: f64,
    trees: Vec<Node>,
}

impl XgBoostModel {
    pub fn fit(x: &Array2<f64>, y: &[f64], params: XgBoostParams) -> Result<Self, String> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(format!(
                "Invalid training set: {} rows, {} targets",
                x.nrows(),
                y.len()
            ));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err("Non-finite target value".to_string());
        }

        let base_score = y.iter().sum::<f64>() / y.len() as f64;
        let mut predictions = vec![base_score; y.len()];
        let hess = vec![1.0; y.len()];
        let all: Vec<usize> = (0..y.len()).collect();
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut total_gain_splits = 0usize;

        for _ in 0..params.n_estimators {
            let grad: Vec<f64> = predictions.iter().zip(y).map(|(p, t)| p - t).collect();

            let builder = TreeBuilder {
                x,
                grad: &grad,
                hess: &hess,
                params: &params,
            };
            let tree = builder.build(&all, 0);

            for (i, p) in predictions.iter_mut().enumerate() {
                *p += tree.evaluate(&x.row(i));
            }
            if tree.depth() > 0 {
                total_gain_splits += 1;
            }
            trees.push(tree);
        }

        trace!(
            "XGBoost: {} rounds, {} with splits, base {:.4}",
            trees.len(),
            total_gain_splits,
            base_score
        );

        Ok(Self { base_score, trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn max_depth(&self) -> usize {
        self.trees.iter().map(Node::depth).max().unwrap_or(0)
    }
}

impl TabularRegressor for XgBoostModel {
    fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64, String> {
        Ok(self.base_score + self.trees.iter().map(|t| t.evaluate(&row)).sum::<f64>())
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Xgb
    }

    fn name(&self) -> &str {
        "XGBoost"
    }
}
