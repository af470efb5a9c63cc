/// Half squared error against a one-hot class target.
pub struct SquaredError;

impl SquaredError {
    /// Desired output of neuron `k` when the sample's class is `label`.
    pub fn target(k: usize, label: usize) -> f64 {
        if k == label { 1.0 } else { 0.0 }
    }

    /// Scalar loss: `0.5 * Σ (d_k - y_k)²`
    pub fn loss(outputs: &[f64], label: usize) -> f64 {
        0.5 * outputs.iter()
            .enumerate()
            .map(|(k, y)| (Self::target(k, label) - y).powi(2))
            .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_is_one_hot() {
        assert_eq!(SquaredError::target(3, 3), 1.0);
        assert_eq!(SquaredError::target(2, 3), 0.0);
    }

    #[test]
    fn perfect_output_has_zero_loss() {
        assert_eq!(SquaredError::loss(&[0.0, 1.0, 0.0], 1), 0.0);
    }

    #[test]
    fn loss_is_half_sum_of_squares() {
        // (1 - 0.5)² + (0 - 0.5)² = 0.5, halved
        assert_eq!(SquaredError::loss(&[0.5, 0.5], 0), 0.25);
    }
}
