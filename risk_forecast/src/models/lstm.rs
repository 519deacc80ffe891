//! Stacked LSTM regressor
//!
//! Each window is fed one value per time step through `recurrent_layers`
//! LSTM layers. Inverted dropout is applied to every layer's output during
//! training, and a dense head projects the final hidden state to a single
//! normalised prediction. Gradients come from full backpropagation through
//! time and are applied with Adam.

use super::optimizer::Adam;
use super::SequenceRegressor;
use crate::config::ForecastConfig;
use ndarray::{s, Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use trade_math::Window;

/// Bias added to the forget gate at initialisation
const FORGET_GATE_BIAS: f64 = 1.0;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    a.view()
        .insert_axis(Axis(1))
        .dot(&b.view().insert_axis(Axis(0)))
}

/// Gate weights of one LSTM layer, stacked in the order input, forget, cell, output.
#[derive(Debug, Clone)]
struct LstmLayer {
    /// Input weights, `4H x input_size`
    w: Array2<f64>,
    /// Recurrent weights, `4H x H`
    u: Array2<f64>,
    b: Array1<f64>,
}

/// Activations kept from the forward pass for backpropagation
#[derive(Debug)]
struct StepCache {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    tanh_c: Array1<f64>,
}

impl LstmLayer {
    fn zeros(input_size: usize, hidden: usize) -> Self {
        Self {
            w: Array2::zeros((4 * hidden, input_size)),
            u: Array2::zeros((4 * hidden, hidden)),
            b: Array1::zeros(4 * hidden),
        }
    }

    fn random(input_size: usize, hidden: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (hidden as f64).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);

        let mut b: Array1<f64> = Array1::zeros(4 * hidden);
        b.slice_mut(s![hidden..2 * hidden]).fill(FORGET_GATE_BIAS);

        Self {
            w: Array2::from_shape_fn((4 * hidden, input_size), |_| dist.sample(rng)),
            u: Array2::from_shape_fn((4 * hidden, hidden), |_| dist.sample(rng)),
            b,
        }
    }

    fn hidden(&self) -> usize {
        self.b.len() / 4
    }

    fn forward(&self, inputs: &[Array1<f64>]) -> (Vec<Array1<f64>>, Vec<StepCache>) {
        let hs = self.hidden();
        let mut h: Array1<f64> = Array1::zeros(hs);
        let mut c: Array1<f64> = Array1::zeros(hs);
        let mut outputs = Vec::with_capacity(inputs.len());
        let mut caches = Vec::with_capacity(inputs.len());

        for x in inputs {
            let z = self.w.dot(x) + self.u.dot(&h) + &self.b;
            let i = z.slice(s![0..hs]).mapv(sigmoid);
            let f = z.slice(s![hs..2 * hs]).mapv(sigmoid);
            let g = z.slice(s![2 * hs..3 * hs]).mapv(f64::tanh);
            let o = z.slice(s![3 * hs..]).mapv(sigmoid);

            let c_next = &f * &c + &i * &g;
            let tanh_c = c_next.mapv(f64::tanh);
            let h_next = &o * &tanh_c;

            outputs.push(h_next.clone());
            caches.push(StepCache {
                x: x.clone(),
                h_prev: std::mem::replace(&mut h, h_next),
                c_prev: std::mem::replace(&mut c, c_next),
                i,
                f,
                g,
                o,
                tanh_c,
            });
        }

        (outputs, caches)
    }

    /// Backpropagate `dh_out` (loss gradient w.r.t. each step's output) through time.
    /// Parameter gradients are accumulated into `grads`; returns the gradient w.r.t. each input.
    fn backward(
        &self,
        caches: &[StepCache],
        dh_out: &[Array1<f64>],
        grads: &mut LstmLayer,
    ) -> Vec<Array1<f64>> {
        let hs = self.hidden();
        let mut dh_next: Array1<f64> = Array1::zeros(hs);
        let mut dc_next: Array1<f64> = Array1::zeros(hs);
        let mut dx: Vec<Array1<f64>> = vec![Array1::zeros(self.w.ncols()); caches.len()];

        for t in (0..caches.len()).rev() {
            let cache = &caches[t];
            let dh = &dh_out[t] + &dh_next;

            let d_o = &dh * &cache.tanh_c * &cache.o.mapv(|v| v * (1.0 - v));
            let dc = &dh * &cache.o * &cache.tanh_c.mapv(|v| 1.0 - v * v) + &dc_next;
            let d_i = &dc * &cache.g * &cache.i.mapv(|v| v * (1.0 - v));
            let d_f = &dc * &cache.c_prev * &cache.f.mapv(|v| v * (1.0 - v));
            let d_g = &dc * &cache.i * &cache.g.mapv(|v| 1.0 - v * v);

            let mut dz: Array1<f64> = Array1::zeros(4 * hs);
            dz.slice_mut(s![0..hs]).assign(&d_i);
            dz.slice_mut(s![hs..2 * hs]).assign(&d_f);
            dz.slice_mut(s![2 * hs..3 * hs]).assign(&d_g);
            dz.slice_mut(s![3 * hs..]).assign(&d_o);

            grads.w += &outer(&dz, &cache.x);
            grads.u += &outer(&dz, &cache.h_prev);
            grads.b += &dz;

            dx[t] = self.w.t().dot(&dz);
            dh_next = self.u.t().dot(&dz);
            dc_next = &dc * &cache.f;
        }

        dx
    }
}

/// Network parameters. The same shape doubles as the gradient and Adam moment containers.
#[derive(Debug, Clone)]
struct LstmNetwork {
    layers: Vec<LstmLayer>,
    head_w: Array1<f64>,
    head_b: Array1<f64>,
}

struct ForwardPass {
    caches: Vec<Vec<StepCache>>,
    /// Dropout masks per layer and step; `None` when dropout was not applied
    masks: Vec<Option<Vec<Array1<f64>>>>,
    last_hidden: Array1<f64>,
    prediction: f64,
}

impl LstmNetwork {
    fn zeros(hidden: usize, layers: usize) -> Self {
        Self {
            layers: (0..layers)
                .map(|l| LstmLayer::zeros(if l == 0 { 1 } else { hidden }, hidden))
                .collect(),
            head_w: Array1::zeros(hidden),
            head_b: Array1::zeros(1),
        }
    }

    fn random(hidden: usize, layers: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (hidden as f64).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);

        Self {
            layers: (0..layers)
                .map(|l| LstmLayer::random(if l == 0 { 1 } else { hidden }, hidden, rng))
                .collect(),
            head_w: Array1::from_shape_fn(hidden, |_| dist.sample(rng)),
            head_b: Array1::zeros(1),
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            layers: self
                .layers
                .iter()
                .map(|layer| LstmLayer::zeros(layer.w.ncols(), layer.hidden()))
                .collect(),
            head_w: Array1::zeros(self.head_w.len()),
            head_b: Array1::zeros(1),
        }
    }

    fn forward(&self, input: &[f64], dropout: f64, mut rng: Option<&mut StdRng>) -> ForwardPass {
        let mut sequence: Vec<Array1<f64>> = input.iter().map(|&v| Array1::from_elem(1, v)).collect();
        let mut caches = Vec::with_capacity(self.layers.len());
        let mut masks = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            let (mut outputs, layer_caches) = layer.forward(&sequence);

            let layer_masks = match rng.as_deref_mut() {
                Some(rng) if dropout > 0.0 => {
                    let keep_scale = 1.0 / (1.0 - dropout);
                    let layer_masks: Vec<Array1<f64>> = outputs
                        .iter()
                        .map(|out| {
                            Array1::from_shape_fn(out.len(), |_| {
                                if rng.gen_bool(dropout) {
                                    0.0
                                } else {
                                    keep_scale
                                }
                            })
                        })
                        .collect();
                    for (out, mask) in outputs.iter_mut().zip(&layer_masks) {
                        *out *= mask;
                    }
                    Some(layer_masks)
                }
                _ => None,
            };

            caches.push(layer_caches);
            masks.push(layer_masks);
            sequence = outputs;
        }

        let last_hidden = sequence
            .pop()
            .unwrap_or_else(|| Array1::zeros(self.head_w.len()));
        let prediction = self.head_w.dot(&last_hidden) + self.head_b[0];

        ForwardPass {
            caches,
            masks,
            last_hidden,
            prediction,
        }
    }

    /// Squared error of one window and the gradients of that error w.r.t. every parameter
    fn backprop(&self, window: &Window, dropout: f64, rng: Option<&mut StdRng>) -> (f64, LstmNetwork) {
        let pass = self.forward(&window.input, dropout, rng);
        let error = pass.prediction - window.target;
        let d_prediction = 2.0 * error;

        let mut grads = self.zeros_like();
        grads.head_w = &pass.last_hidden * d_prediction;
        grads.head_b[0] = d_prediction;

        let steps = window.input.len();
        if steps == 0 {
            return (error * error, grads);
        }

        let hidden = self.head_w.len();
        let mut d_sequence: Vec<Array1<f64>> = vec![Array1::zeros(hidden); steps];
        d_sequence[steps - 1] = &self.head_w * d_prediction;

        for l in (0..self.layers.len()).rev() {
            if let Some(layer_masks) = &pass.masks[l] {
                for (d, mask) in d_sequence.iter_mut().zip(layer_masks) {
                    *d *= mask;
                }
            }
            d_sequence = self.layers[l].backward(&pass.caches[l], &d_sequence, &mut grads.layers[l]);
        }

        (error * error, grads)
    }

    fn accumulate(&mut self, other: &LstmNetwork, scale: f64) {
        for (acc, g) in self.layers.iter_mut().zip(&other.layers) {
            acc.w.scaled_add(scale, &g.w);
            acc.u.scaled_add(scale, &g.u);
            acc.b.scaled_add(scale, &g.b);
        }
        self.head_w.scaled_add(scale, &other.head_w);
        self.head_b.scaled_add(scale, &other.head_b);
    }
}

/// LSTM sequence regressor
#[derive(Debug, Clone)]
pub struct LstmRegressor {
    hidden_units: usize,
    recurrent_layers: usize,
    dropout: f64,
    network: LstmNetwork,
    first_moment: LstmNetwork,
    second_moment: LstmNetwork,
    optimizer: Adam,
}

impl LstmRegressor {
    /// Create an untrained regressor. Parameters stay at zero until `initialize` is called.
    pub fn new(hidden_units: usize, recurrent_layers: usize, dropout: f64) -> Self {
        let network = LstmNetwork::zeros(hidden_units, recurrent_layers);
        Self {
            hidden_units,
            recurrent_layers,
            dropout,
            first_moment: network.zeros_like(),
            second_moment: network.zeros_like(),
            network,
            optimizer: Adam::default(),
        }
    }

    pub fn from_config(config: &ForecastConfig) -> Self {
        Self::new(config.hidden_units, config.recurrent_layers, config.dropout)
    }

    pub fn hidden_units(&self) -> usize {
        self.hidden_units
    }

    pub fn recurrent_layers(&self) -> usize {
        self.recurrent_layers
    }

    pub fn dropout(&self) -> f64 {
        self.dropout
    }

    fn apply_gradients(&mut self, grads: &LstmNetwork, learning_rate: f64) {
        self.optimizer.next_step();
        let adam = &self.optimizer;

        let layers = self
            .network
            .layers
            .iter_mut()
            .zip(&grads.layers)
            .zip(self.first_moment.layers.iter_mut())
            .zip(self.second_moment.layers.iter_mut());
        for (((param, grad), m), v) in layers {
            adam.update(&mut param.w, &grad.w, &mut m.w, &mut v.w, learning_rate);
            adam.update(&mut param.u, &grad.u, &mut m.u, &mut v.u, learning_rate);
            adam.update(&mut param.b, &grad.b, &mut m.b, &mut v.b, learning_rate);
        }

        adam.update(
            &mut self.network.head_w,
            &grads.head_w,
            &mut self.first_moment.head_w,
            &mut self.second_moment.head_w,
            learning_rate,
        );
        adam.update(
            &mut self.network.head_b,
            &grads.head_b,
            &mut self.first_moment.head_b,
            &mut self.second_moment.head_b,
            learning_rate,
        );
    }
}

impl SequenceRegressor for LstmRegressor {
    fn kind(&self) -> &'static str {
        "lstm"
    }

    fn initialize(&mut self, _window_size: usize, rng: &mut StdRng) {
        self.network = LstmNetwork::random(self.hidden_units, self.recurrent_layers, rng);
        self.first_moment = self.network.zeros_like();
        self.second_moment = self.network.zeros_like();
        self.optimizer.reset();
    }

    fn train_batch(&mut self, batch: &[&Window], learning_rate: f64, rng: &mut StdRng) -> f64 {
        if batch.is_empty() {
            return 0.0;
        }

        let scale = 1.0 / batch.len() as f64;
        let mut grads = self.network.zeros_like();
        let mut loss = 0.0;

        for window in batch {
            let (squared_error, sample_grads) = self.network.backprop(window, self.dropout, Some(&mut *rng));
            loss += squared_error;
            grads.accumulate(&sample_grads, scale);
        }

        let loss = loss * scale;
        if loss.is_finite() {
            self.apply_gradients(&grads, learning_rate);
        }
        loss
    }

    fn predict(&self, input: &[f64]) -> f64 {
        self.network.forward(input, 0.0, None).prediction
    }
}
