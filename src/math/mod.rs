pub mod weighted_sum;

pub use weighted_sum::{argmax_first, dot_product, sum_weights};
