use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RnaError, Result};

/// Parameters of one training run.
///
/// # Fields
/// - `learning_rate`      : step size of every delta-rule update
/// - `tolerance`          : the run stops as soon as a checkpoint's averaged
///                         error drops below this value
/// - `max_iterations`     : maximum number of full passes over the dataset
/// - `checkpoint_interval`: samples between two error-history entries
/// - `output_path`        : model file name; derived from the parameters when absent
/// - `output_dir`         : directory the model file is placed in
///
/// Missing fields in a JSON file take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub learning_rate: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub checkpoint_interval: usize,
    pub output_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            learning_rate: 0.5,
            tolerance: 0.02,
            max_iterations: 50,
            checkpoint_interval: 2500,
            output_path: None,
            output_dir: None,
        }
    }
}

impl TrainConfig {
    /// Creates a config with the given hyperparameters and no output location.
    pub fn new(learning_rate: f64, tolerance: f64, max_iterations: usize) -> Self {
        TrainConfig {
            learning_rate,
            tolerance,
            max_iterations,
            ..TrainConfig::default()
        }
    }

    pub fn with_checkpoint_interval(mut self, samples: usize) -> Self {
        self.checkpoint_interval = samples;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(RnaError::invalid_config(format!(
                "learning rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(RnaError::invalid_config(format!(
                "tolerance must be a positive number, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(RnaError::invalid_config("max iterations must be at least 1"));
        }
        if self.checkpoint_interval == 0 {
            return Err(RnaError::invalid_config("checkpoint interval must be at least 1"));
        }
        Ok(())
    }

    /// File name used when `output_path` is not set, e.g.
    /// `lr_0.5000-tl_0.0200-itrs_50.model`.
    pub fn default_file_name(&self) -> String {
        format!(
            "lr_{:.4}-tl_{:.4}-itrs_{}.model",
            self.learning_rate, self.tolerance, self.max_iterations
        )
    }

    /// Where the trained model is written: `output_path` (or the default file
    /// name) inside `output_dir` when one is set.
    pub fn model_path(&self) -> PathBuf {
        let file = self
            .output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.default_file_name()));
        match &self.output_dir {
            Some(dir) => dir.join(file),
            None => file,
        }
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: TrainConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
