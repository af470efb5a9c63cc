/// Plain stochastic gradient descent with a fixed learning rate.
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }

    /// Applies the delta rule to one neuron.
    ///
    /// `weights` is the neuron's slice (one weight per input, bias last);
    /// every input weight moves by `lr * error * input` and the bias by
    /// `lr * error`.
    pub fn step(&self, weights: &mut [f64], inputs: &[f64], error: f64) {
        let scale = self.learning_rate * error;
        let (input_weights, bias) = weights.split_at_mut(inputs.len());
        for (w, x) in input_weights.iter_mut().zip(inputs) {
            *w += scale * x;
        }
        bias[0] += scale;
    }
}
