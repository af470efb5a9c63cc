use rand::Rng;

use crate::activation::{activate, derivative_from_output};
use crate::error::{RnaError, Result};
use crate::loss::SquaredError;
use crate::math::sum_weights;
use crate::optim::Sgd;

/// Range every freshly initialized weight and bias is drawn from.
pub const INIT_WEIGHT_RANGE: (f64, f64) = (-0.5, 0.5);

/// `neurons * (inputs + 1)`, or `None` when the table could not be allocated.
fn weight_count(neuron_count: usize, input_count: usize) -> Option<usize> {
    let count = input_count.checked_add(1)?.checked_mul(neuron_count)?;
    let bytes = count.checked_mul(std::mem::size_of::<f64>())?;
    (bytes <= isize::MAX as usize).then_some(count)
}

/// A fully-connected layer.
///
/// All weights live in one buffer with a stride of `input_count + 1`:
/// neuron `n` owns `weights[n * stride .. (n + 1) * stride]`, bias last.
/// `activations` and `errors` hold the per-sample state of the last forward
/// and backward pass; they are never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    neuron_count: usize,
    input_count: usize,
    weights: Vec<f64>,
    activations: Vec<f64>,
    errors: Vec<f64>,
}

impl Layer {
    /// Allocates a layer with every weight, bias included, drawn uniformly
    /// from [`INIT_WEIGHT_RANGE`].
    ///
    /// # Errors
    /// [`RnaError::InvalidConfig`] if the weight table would not fit in memory.
    pub fn random<R: Rng + ?Sized>(neuron_count: usize, input_count: usize, rng: &mut R) -> Result<Layer> {
        let count = weight_count(neuron_count, input_count).ok_or_else(|| {
            RnaError::invalid_config(format!(
                "a layer of {neuron_count} neurons with {input_count} inputs is too large"
            ))
        })?;
        let (lo, hi) = INIT_WEIGHT_RANGE;
        let weights = (0..count).map(|_| rng.gen_range(lo..=hi)).collect();
        Ok(Layer::with_weights(neuron_count, input_count, weights))
    }

    /// Builds a layer around an existing weight table.
    pub fn from_weights(neuron_count: usize, input_count: usize, weights: Vec<f64>) -> Result<Layer> {
        let expected = weight_count(neuron_count, input_count)
            .ok_or_else(|| RnaError::format("layer weight count overflows"))?;
        if weights.len() != expected {
            return Err(RnaError::ShapeMismatch { expected, actual: weights.len() });
        }
        Ok(Layer::with_weights(neuron_count, input_count, weights))
    }

    fn with_weights(neuron_count: usize, input_count: usize, weights: Vec<f64>) -> Layer {
        Layer {
            neuron_count,
            input_count,
            weights,
            activations: vec![0.0; neuron_count],
            errors: vec![0.0; neuron_count],
        }
    }

    pub fn neuron_count(&self) -> usize {
        self.neuron_count
    }

    /// Inputs per neuron, bias excluded.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Distance between consecutive neurons in the weight buffer.
    pub fn stride(&self) -> usize {
        self.input_count + 1
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    pub fn neuron_weights(&self, neuron: usize) -> &[f64] {
        let stride = self.stride();
        &self.weights[neuron * stride..(neuron + 1) * stride]
    }

    pub fn neuron_weights_mut(&mut self, neuron: usize) -> &mut [f64] {
        let stride = self.stride();
        &mut self.weights[neuron * stride..(neuron + 1) * stride]
    }

    /// Outputs of the last forward pass.
    pub fn activations(&self) -> &[f64] {
        &self.activations
    }

    /// Error signals of the last training step.
    pub fn errors(&self) -> &[f64] {
        &self.errors
    }

    /// Computes every neuron's output for `inputs` into the activation buffer.
    pub fn feed_from(&mut self, inputs: &[f64]) {
        debug_assert_eq!(inputs.len(), self.input_count);
        let stride = self.stride();
        for (activation, weights) in self.activations.iter_mut().zip(self.weights.chunks_exact(stride)) {
            *activation = activate(sum_weights(weights, inputs));
        }
    }

    /// Output-layer training step for one sample.
    ///
    /// For each neuron `k`: `e_k = (d_k - y_k) * y_k * (1 - y_k)` with a one-hot
    /// target, then the neuron's weights are updated right away. Returns the
    /// sample's half squared error.
    pub fn train_as_output(&mut self, inputs: &[f64], label: usize, sgd: &Sgd) -> f64 {
        let stride = self.stride();
        let mut squared = 0.0;
        for (k, weights) in self.weights.chunks_exact_mut(stride).enumerate() {
            let y = self.activations[k];
            let diff = SquaredError::target(k, label) - y;
            let error = diff * derivative_from_output(y);
            squared += diff * diff;
            sgd.step(weights, inputs, error);
            self.errors[k] = error;
        }
        0.5 * squared
    }

    /// Hidden-layer training step for one sample.
    ///
    /// Each neuron's error is the sum of `next`'s errors weighted by the
    /// connection from this neuron, scaled by `y * (1 - y)`. `next` must already
    /// hold this sample's errors (and its updated weights).
    pub fn train_as_hidden(&mut self, inputs: &[f64], next: &Layer, sgd: &Sgd) {
        debug_assert_eq!(next.input_count, self.neuron_count);
        let stride = self.stride();
        let next_stride = next.stride();
        for (n, weights) in self.weights.chunks_exact_mut(stride).enumerate() {
            let error_sum: f64 = next.errors
                .iter()
                .zip(next.weights.chunks_exact(next_stride))
                .map(|(e, w)| e * w[n])
                .sum();
            let error = error_sum * derivative_from_output(self.activations[n]);
            sgd.step(weights, inputs, error);
            self.errors[n] = error;
        }
    }
}
