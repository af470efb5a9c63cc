pub mod activation;
pub mod data;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod network;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use activation::{activate, derivative_from_output};
pub use data::{load_idx_pair, parse_idx_pair, Dataset};
pub use error::{Result, RnaError};
pub use layers::dense::Layer;
pub use loss::squared::SquaredError;
pub use network::{Network, NetworkSpec};
pub use optim::sgd::Sgd;
pub use train::{
    evaluate, train_and_save, train_loop, train_model, ErrorHistory, ErrorSample, EvalReport,
    StopReason, TrainConfig, TrainOutcome, Trainer, TrainingReport,
};
