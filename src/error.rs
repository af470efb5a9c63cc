use std::io;

use thiserror::Error;

/// Errors produced by model I/O, dataset handling and training.
#[derive(Debug, Error)]
pub enum RnaError {
    /// The model file could not be created or a write came up short.
    #[error("could not write model: {0}")]
    Write(#[source] io::Error),

    /// The model file could not be opened or ended before all fields were read.
    #[error("could not read model: {0}")]
    Read(#[source] io::Error),

    /// The bytes are not a model file, or its layer table is inconsistent.
    #[error("not a recognized model file: {0}")]
    Format(String),

    /// Declared dataset metadata disagrees with the actual buffers.
    #[error("dataset contract violated: {0}")]
    Dataset(String),

    /// An input buffer does not match the size the network expects.
    #[error("shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("a training run is already in progress")]
    TrainingInProgress,

    #[error("no training run has been started")]
    NoActiveRun,

    #[error("training thread panicked")]
    TrainingPanicked,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RnaError {
    pub fn format(reason: impl Into<String>) -> Self {
        Self::Format(reason.into())
    }

    pub fn dataset(reason: impl Into<String>) -> Self {
        Self::Dataset(reason.into())
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// True for the failures that mean "this is not a model file", as opposed
    /// to a disk problem.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}

pub type Result<T> = std::result::Result<T, RnaError>;
