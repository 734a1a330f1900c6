//! Stacked LSTM regressor trained with full-batch backpropagation
//! through time and Adam.
//!
//! Gate layout inside every `4H` weight block is input, forget, cell,
//! output. The network reads a whole window and regresses the next close
//! from the top layer's final hidden state.

use super::sequence::SequenceWindows;
use ndarray::{Array1, Array2, ArrayView2, Axis, Dimension, Zip, s};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LstmParams {
    pub hidden_size: usize,
    pub num_layers: usize,
    pub dropout: f64,
    pub epochs: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for LstmParams {
    fn default() -> Self {
        Self {
            hidden_size: 64,
            num_layers: 2,
            dropout: 0.2,
            epochs: 30,
            learning_rate: 0.001,
            seed: 42,
        }
    }
}

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const ADAM_EPS: f64 = 1e-8;

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

struct Moments<D: Dimension> {
    m: ndarray::Array<f64, D>,
    v: ndarray::Array<f64, D>,
}

impl<D: Dimension> Moments<D> {
    fn like(param: &ndarray::Array<f64, D>) -> Self {
        Self {
            m: ndarray::Array::zeros(param.raw_dim()),
            v: ndarray::Array::zeros(param.raw_dim()),
        }
    }

    fn step(
        &mut self,
        param: &mut ndarray::Array<f64, D>,
        grad: &ndarray::Array<f64, D>,
        lr: f64,
        t: i32,
    ) {
        let bias1 = 1.0 - BETA1.powi(t);
        let bias2 = 1.0 - BETA2.powi(t);
        Zip::from(param)
            .and(grad)
            .and(&mut self.m)
            .and(&mut self.v)
            .for_each(|p, &g, m, v| {
                *m = BETA1 * *m + (1.0 - BETA1) * g;
                *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *p -= lr * m_hat / (v_hat.sqrt() + ADAM_EPS);
            });
    }
}

struct LstmLayer {
    /// `(4H, input)`
    w: Array2<f64>,
    /// `(4H, H)`
    u: Array2<f64>,
    b: Array1<f64>,
}

struct LayerGrads {
    w: Array2<f64>,
    u: Array2<f64>,
    b: Array1<f64>,
}

struct StepCache {
    x: Array2<f64>,
    h_prev: Array2<f64>,
    c_prev: Array2<f64>,
    i: Array2<f64>,
    f: Array2<f64>,
    g: Array2<f64>,
    o: Array2<f64>,
    c: Array2<f64>,
}

impl LstmLayer {
    fn new(input: usize, hidden: usize, rng: &mut StdRng) -> Self {
        let k = 1.0 / (hidden as f64).sqrt();
        let mut init = |shape: (usize, usize)| {
            Array2::from_shape_fn(shape, |_| rng.random_range(-k..k))
        };
        let w = init((4 * hidden, input));
        let u = init((4 * hidden, hidden));
        let b = Array1::from_shape_fn(4 * hidden, |_| rng.random_range(-k..k));
        Self { w, u, b }
    }

    fn hidden(&self) -> usize {
        self.u.ncols()
    }

    /// Runs the layer over `xs` (one `(batch, input)` matrix per step).
    /// Returns the hidden state per step and the per-step cache.
    fn forward(&self, xs: &[Array2<f64>]) -> (Vec<Array2<f64>>, Vec<StepCache>) {
        let hidden = self.hidden();
        let batch = xs.first().map(|x| x.nrows()).unwrap_or(0);
        let mut h = Array2::zeros((batch, hidden));
        let mut c = Array2::zeros((batch, hidden));
        let mut outputs = Vec::with_capacity(xs.len());
        let mut caches = Vec::with_capacity(xs.len());

        for x in xs {
            let gates = x.dot(&self.w.t()) + h.dot(&self.u.t()) + &self.b;
            let i = gates.slice(s![.., 0..hidden]).mapv(sigmoid);
            let f = gates.slice(s![.., hidden..2 * hidden]).mapv(sigmoid);
            let g = gates.slice(s![.., 2 * hidden..3 * hidden]).mapv(f64::tanh);
            let o = gates.slice(s![.., 3 * hidden..]).mapv(sigmoid);

            let c_next = &f * &c + &i * &g;
            let h_next = &o * &c_next.mapv(f64::tanh);

            caches.push(StepCache {
                x: x.clone(),
                h_prev: h,
                c_prev: c,
                i,
                f,
                g,
                o,
                c: c_next.clone(),
            });
            outputs.push(h_next.clone());
            h = h_next;
            c = c_next;
        }

        (outputs, caches)
    }

    /// Backpropagation through time. `dh_out[t]` is the loss gradient
    /// reaching this layer's hidden output at step `t` from above.
    /// Returns parameter gradients and the gradient for each input step.
    fn backward(
        &self,
        caches: &[StepCache],
        dh_out: &[Array2<f64>],
    ) -> (LayerGrads, Vec<Array2<f64>>) {
        let hidden = self.hidden();
        let mut grads = LayerGrads {
            w: Array2::zeros(self.w.raw_dim()),
            u: Array2::zeros(self.u.raw_dim()),
            b: Array1::zeros(self.b.raw_dim()),
        };
        let mut dxs = vec![Array2::zeros((0, 0)); caches.len()];

        let batch = caches.first().map(|c| c.x.nrows()).unwrap_or(0);
        let mut dh_next = Array2::<f64>::zeros((batch, hidden));
        let mut dc_next = Array2::<f64>::zeros((batch, hidden));

        for t in (0..caches.len()).rev() {
            let step = &caches[t];
            let dh = &dh_out[t] + &dh_next;
            let tanh_c = step.c.mapv(f64::tanh);

            let d_o = &dh * &tanh_c;
            let dc = &dc_next + &(&dh * &step.o * &tanh_c.mapv(|v| 1.0 - v * v));

            let d_i = &dc * &step.g;
            let d_g = &dc * &step.i;
            let d_f = &dc * &step.c_prev;
            dc_next = &dc * &step.f;

            let mut dgates = Array2::zeros((batch, 4 * hidden));
            dgates
                .slice_mut(s![.., 0..hidden])
                .assign(&(&d_i * &step.i.mapv(|v| v * (1.0 - v))));
            dgates
                .slice_mut(s![.., hidden..2 * hidden])
                .assign(&(&d_f * &step.f.mapv(|v| v * (1.0 - v))));
            dgates
                .slice_mut(s![.., 2 * hidden..3 * hidden])
                .assign(&(&d_g * &step.g.mapv(|v| 1.0 - v * v)));
            dgates
                .slice_mut(s![.., 3 * hidden..])
                .assign(&(&d_o * &step.o.mapv(|v| v * (1.0 - v))));

            grads.w += &dgates.t().dot(&step.x);
            grads.u += &dgates.t().dot(&step.h_prev);
            grads.b += &dgates.sum_axis(Axis(0));

            dxs[t] = dgates.dot(&self.w);
            dh_next = dgates.dot(&self.u);
        }

        (grads, dxs)
    }
}

struct LayerMoments {
    w: Moments<ndarray::Ix2>,
    u: Moments<ndarray::Ix2>,
    b: Moments<ndarray::Ix1>,
}

/// Trained recurrent regressor.
pub struct LstmModel {
    layers: Vec<LstmLayer>,
    fc_w: Array1<f64>,
    fc_b: Array1<f64>,
    lookback: usize,
    final_loss: f64,
}

impl LstmModel {
    pub fn fit(windows: &SequenceWindows, params: &LstmParams) -> Result<Self, String> {
        if windows.is_empty() {
            return Err("No training windows".to_string());
        }
        if params.num_layers == 0 || params.hidden_size == 0 {
            return Err("LSTM needs at least one layer and one hidden unit".to_string());
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let hidden = params.hidden_size;
        let n_features = windows.n_features();

        let mut layers: Vec<LstmLayer> = (0..params.num_layers)
            .map(|l| {
                let input = if l == 0 { n_features } else { hidden };
                LstmLayer::new(input, hidden, &mut rng)
            })
            .collect();
        let k = 1.0 / (hidden as f64).sqrt();
        let mut fc_w = Array1::from_shape_fn(hidden, |_| rng.random_range(-k..k));
        let mut fc_b = Array1::from_elem(1, rng.random_range(-k..k));

        let mut layer_moments: Vec<LayerMoments> = layers
            .iter()
            .map(|l| LayerMoments {
                w: Moments::like(&l.w),
                u: Moments::like(&l.u),
                b: Moments::like(&l.b),
            })
            .collect();
        let mut fc_w_moments = Moments::like(&fc_w);
        let mut fc_b_moments = Moments::like(&fc_b);

        let xs = time_major(windows.inputs().view());
        let targets = windows.targets();
        let batch = targets.len();
        let keep = 1.0 - params.dropout;
        let mut loss = f64::NAN;

        for epoch in 0..params.epochs {
            let mut mask = |rows: usize| -> Array2<f64> {
                Array2::from_shape_fn((rows, hidden), |_| {
                    if params.dropout > 0.0 && rng.random::<f64>() < params.dropout {
                        0.0
                    } else {
                        1.0 / keep
                    }
                })
            };

            // Forward, keeping caches and the dropout masks between layers
            let mut inputs = xs.clone();
            let mut caches = Vec::with_capacity(layers.len());
            let mut between_masks: Vec<Vec<Array2<f64>>> = Vec::with_capacity(layers.len());
            for (l, layer) in layers.iter().enumerate() {
                let (outputs, cache) = layer.forward(&inputs);
                caches.push(cache);
                if l + 1 < layers.len() {
                    let masks: Vec<Array2<f64>> = outputs.iter().map(|_| mask(batch)).collect();
                    inputs = outputs.iter().zip(&masks).map(|(h, m)| h * m).collect();
                    between_masks.push(masks);
                } else {
                    inputs = outputs;
                }
            }

            let last_h = inputs
                .last()
                .ok_or_else(|| "Empty window".to_string())?
                .clone();
            let fc_mask = mask(batch);
            let dropped = &last_h * &fc_mask;
            let preds = dropped.dot(&fc_w) + fc_b[0];

            let errors = &preds - targets;
            loss = errors.mapv(|e| e * e).mean().unwrap_or(f64::NAN);
            if !loss.is_finite() {
                return Err(format!("Loss diverged at epoch {}", epoch + 1));
            }

            // Backward
            let d_pred = errors.mapv(|e| 2.0 * e / batch as f64);
            let d_fc_w = dropped.t().dot(&d_pred);
            let d_fc_b = Array1::from_elem(1, d_pred.sum());

            let d_dropped = d_pred
                .view()
                .insert_axis(Axis(1))
                .dot(&fc_w.view().insert_axis(Axis(0)));
            let d_last = d_dropped * &fc_mask;

            let steps = xs.len();
            let mut dh_out: Vec<Array2<f64>> = vec![Array2::zeros((batch, hidden)); steps];
            dh_out[steps - 1] = d_last;

            let mut layer_grads = Vec::with_capacity(layers.len());
            for l in (0..layers.len()).rev() {
                let (grads, dxs) = layers[l].backward(&caches[l], &dh_out);
                layer_grads.push(grads);
                if l > 0 {
                    dh_out = dxs
                        .into_iter()
                        .zip(&between_masks[l - 1])
                        .map(|(dx, m)| dx * m)
                        .collect();
                }
            }
            layer_grads.reverse();

            let t = (epoch + 1) as i32;
            let lr = params.learning_rate;
            for ((layer, grads), moments) in layers
                .iter_mut()
                .zip(&layer_grads)
                .zip(layer_moments.iter_mut())
            {
                moments.w.step(&mut layer.w, &grads.w, lr, t);
                moments.u.step(&mut layer.u, &grads.u, lr, t);
                moments.b.step(&mut layer.b, &grads.b, lr, t);
            }
            fc_w_moments.step(&mut fc_w, &d_fc_w, lr, t);
            fc_b_moments.step(&mut fc_b, &d_fc_b, lr, t);

            if (epoch + 1) % 10 == 0 {
                debug!(
                    "LSTM Epoch {}/{}, Loss: {:.6}",
                    epoch + 1,
                    params.epochs,
                    loss
                );
            }
        }

        Ok(Self {
            layers,
            fc_w,
            fc_b,
            lookback: windows.lookback(),
            final_loss: loss,
        })
    }

    /// Inference on one `(lookback, features)` window, dropout disabled.
    pub fn predict_window(&self, window: ArrayView2<f64>) -> Result<f64, String> {
        if window.nrows() != self.lookback {
            return Err(format!(
                "Window has {} steps, model expects {}",
                window.nrows(),
                self.lookback
            ));
        }

        let mut inputs: Vec<Array2<f64>> = window
            .rows()
            .into_iter()
            .map(|r| r.to_owned().insert_axis(Axis(0)))
            .collect();
        for layer in &self.layers {
            let (outputs, _) = layer.forward(&inputs);
            inputs = outputs;
        }

        let last = inputs
            .last()
            .ok_or_else(|| "Empty window".to_string())?;
        let prediction = last.row(0).dot(&self.fc_w) + self.fc_b[0];
        if prediction.is_finite() {
            Ok(prediction)
        } else {
            Err("Non-finite prediction".to_string())
        }
    }

    pub fn final_loss(&self) -> f64 {
        self.final_loss
    }

    pub fn name(&self) -> &str {
        "LSTM"
    }
}

/// `(windows, steps, features)` into one `(windows, features)` matrix per step.
fn time_major(inputs: ndarray::ArrayView3<f64>) -> Vec<Array2<f64>> {
    inputs
        .axis_iter(Axis(1))
        .map(|step| step.to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows(n_rows: usize, lookback: usize, target: impl Fn(usize) -> f64) -> SequenceWindows {
        let m = Array2::from_shape_fn((n_rows, 3), |(r, c)| ((r + c) as f64 * 0.3).sin());
        let t: Vec<f64> = (0..n_rows).map(target).collect();
        SequenceWindows::create(&m, &t, lookback)
    }

    fn small() -> LstmParams {
        LstmParams {
            hidden_size: 8,
            epochs: 40,
            learning_rate: 0.01,
            ..LstmParams::default()
        }
    }

    #[test]
    fn test_training_reduces_loss() {
        let w = windows(60, 5, |_| 0.5);
        let one_epoch = LstmModel::fit(
            &w,
            &LstmParams {
                epochs: 1,
                ..small()
            },
        )
        .unwrap();
        let trained = LstmModel::fit(&w, &small()).unwrap();
        assert!(
            trained.final_loss() < one_epoch.final_loss(),
            "{} !< {}",
            trained.final_loss(),
            one_epoch.final_loss()
        );
    }

    #[test]
    fn test_deterministic_with_seed() {
        let w = windows(40, 4, |r| r as f64 * 0.01);
        let a = LstmModel::fit(&w, &small()).unwrap();
        let b = LstmModel::fit(&w, &small()).unwrap();
        let last = w.last().unwrap();
        assert_eq!(
            a.predict_window(last).unwrap(),
            b.predict_window(last).unwrap()
        );
    }

    #[test]
    fn test_rejects_wrong_window_length() {
        let w = windows(30, 5, |_| 1.0);
        let model = LstmModel::fit(&w, &small()).unwrap();
        let short = Array2::zeros((3, 3));
        assert!(model.predict_window(short.view()).is_err());
    }

    #[test]
    fn test_empty_windows_rejected() {
        let w = windows(5, 10, |_| 1.0);
        assert!(LstmModel::fit(&w, &small()).is_err());
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        // Single layer, no dropout: compare analytic dW[0,0] against a
        // central difference of the loss.
        let mut rng = StdRng::seed_from_u64(7);
        let layer = LstmLayer::new(2, 3, &mut rng);
        let xs: Vec<Array2<f64>> = (0..4)
            .map(|t| Array2::from_shape_fn((2, 2), |(b, f)| (t + b + f) as f64 * 0.1 - 0.2))
            .collect();

        let loss_of = |layer: &LstmLayer| -> f64 {
            let (outs, _) = layer.forward(&xs);
            outs.last().map(|h| h.sum()).unwrap_or(0.0)
        };

        let (_, caches) = layer.forward(&xs);
        let mut dh_out = vec![Array2::zeros((2, 3)); 4];
        dh_out[3] = Array2::ones((2, 3));
        let (grads, _) = layer.backward(&caches, &dh_out);

        let eps = 1e-6;
        let mut plus = LstmLayer {
            w: layer.w.clone(),
            u: layer.u.clone(),
            b: layer.b.clone(),
        };
        plus.w[[0, 0]] += eps;
        let mut minus = LstmLayer {
            w: layer.w.clone(),
            u: layer.u.clone(),
            b: layer.b.clone(),
        };
        minus.w[[0, 0]] -= eps;
        let numeric = (loss_of(&plus) - loss_of(&minus)) / (2.0 * eps);

        assert!(
            (numeric - grads.w[[0, 0]]).abs() < 1e-6,
            "numeric {} vs analytic {}",
            numeric,
            grads.w[[0, 0]]
        );
    }
}
