use rand::Rng;

use crate::error::{RnaError, Result};
use crate::layers::dense::Layer;
use crate::math::argmax_first;
use crate::network::spec::NetworkSpec;

/// A stack of fully-connected layers.
///
/// Inference takes `&mut self` because every forward pass overwrites the
/// layers' activation buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    /// Allocates a network for images of `input_count` pixels with every
    /// weight drawn uniformly from [-0.5, 0.5].
    pub fn random<R: Rng + ?Sized>(spec: &NetworkSpec, input_count: usize, rng: &mut R) -> Result<Network> {
        spec.validate()?;
        if input_count == 0 {
            return Err(RnaError::invalid_config("input count must be at least 1"));
        }

        let mut layers = Vec::with_capacity(spec.layers.len());
        let mut inputs = input_count;
        for &neurons in &spec.layers {
            layers.push(Layer::random(neurons, inputs, rng)?);
            inputs = neurons;
        }
        Ok(Network { layers })
    }

    /// Assembles a network from existing layers, checking that each layer's
    /// input count matches the previous layer's neuron count.
    pub fn from_layers(layers: Vec<Layer>) -> Result<Network> {
        if layers.is_empty() {
            return Err(RnaError::format("a network needs at least one layer"));
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[1].input_count() != pair[0].neuron_count() {
                return Err(RnaError::format(format!(
                    "layer {} takes {} inputs but layer {} has {} neurons",
                    i + 1,
                    pair[1].input_count(),
                    i,
                    pair[0].neuron_count()
                )));
            }
        }
        Ok(Network { layers })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Pixels expected per image.
    pub fn input_count(&self) -> usize {
        self.layers[0].input_count()
    }

    /// Number of output classes.
    pub fn output_count(&self) -> usize {
        self.last_layer().neuron_count()
    }

    fn last_layer(&self) -> &Layer {
        &self.layers[self.layers.len() - 1]
    }

    /// Activations of the output layer from the last forward pass.
    pub fn output(&self) -> &[f64] {
        self.last_layer().activations()
    }

    /// Layer-size schedule of this network.
    pub fn spec(&self) -> NetworkSpec {
        NetworkSpec::new(self.layers.iter().map(Layer::neuron_count).collect())
    }

    /// Forward pass without shape checks; fills every activation buffer.
    pub(crate) fn forward(&mut self, image: &[f64]) {
        self.layers[0].feed_from(image);
        for l in 1..self.layers.len() {
            let (done, todo) = self.layers.split_at_mut(l);
            todo[0].feed_from(done[l - 1].activations());
        }
    }

    /// Classifies one normalized image.
    ///
    /// Returns the index of the strongest output neuron; on exact ties the
    /// lowest index wins.
    pub fn find_label(&mut self, image: &[f64]) -> Result<usize> {
        let expected = self.input_count();
        if image.len() != expected {
            return Err(RnaError::ShapeMismatch { expected, actual: image.len() });
        }
        self.forward(image);
        Ok(argmax_first(self.output()).unwrap_or(0))
    }
}
