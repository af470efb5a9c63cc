pub mod error_history;
pub mod evaluate;
pub mod loop_fn;
pub mod train_config;
pub mod trainer;

pub use error_history::{ErrorHistory, ErrorSample};
pub use evaluate::{evaluate, EvalReport};
pub use loop_fn::{train_loop, StopReason, TrainOutcome};
pub use train_config::TrainConfig;
pub use trainer::{train_and_save, train_model, Trainer, TrainingReport};
