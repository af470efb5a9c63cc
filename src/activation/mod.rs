pub mod activation;

pub use activation::{activate, derivative_from_output};
