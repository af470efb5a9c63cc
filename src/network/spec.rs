use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{RnaError, Result};
use crate::network::network::Network;

/// Layer-size schedule of a network, input to output.
///
/// Input counts are not part of the schedule: layer 0 takes the image pixel
/// count, every later layer takes the previous layer's neuron count. The last
/// entry is the number of classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub layers: Vec<usize>,
}

impl Default for NetworkSpec {
    /// Two hidden layers and one output per digit.
    fn default() -> Self {
        NetworkSpec { layers: vec![64, 32, 10] }
    }
}

impl NetworkSpec {
    pub fn new(layers: Vec<usize>) -> NetworkSpec {
        NetworkSpec { layers }
    }

    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(RnaError::invalid_config("a network needs at least one layer"));
        }
        if let Some(i) = self.layers.iter().position(|&n| n == 0) {
            return Err(RnaError::invalid_config(format!("layer {i} has no neurons")));
        }
        Ok(())
    }

    /// Number of output classes.
    pub fn class_count(&self) -> usize {
        self.layers.last().copied().unwrap_or(0)
    }

    /// Allocates a randomly initialized network for images of `input_count` pixels.
    pub fn build<R: Rng + ?Sized>(&self, input_count: usize, rng: &mut R) -> Result<Network> {
        Network::random(self, input_count, rng)
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Parses a comma-separated schedule such as `64,32,10`.
impl FromStr for NetworkSpec {
    type Err = RnaError;

    fn from_str(s: &str) -> Result<Self> {
        let layers = s
            .split(',')
            .map(|part| {
                part.trim().parse::<usize>().map_err(|e| {
                    RnaError::invalid_config(format!("bad layer size '{}': {e}", part.trim()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let spec = NetworkSpec { layers };
        spec.validate()?;
        Ok(spec)
    }
}

impl fmt::Display for NetworkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes: Vec<String> = self.layers.iter().map(usize::to_string).collect();
        write!(f, "{}", sizes.join(","))
    }
}
