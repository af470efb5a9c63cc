/// Fast sigmoid-like squashing function, `0.5 * (s / (1 + |s|) + 1)`.
///
/// Output lies in (0, 1) and is monotonic in `sum`.
pub fn activate(sum: f64) -> f64 {
    0.5 * (sum / (1.0 + sum.abs()) + 1.0)
}

/// Derivative used during backpropagation, expressed in terms of the neuron
/// *output* `y = activate(s)`: `y * (1 - y)`.
///
/// This is the logistic-sigmoid identity, not the exact derivative of
/// [`activate`]. Existing model files were trained with this pairing.
pub fn derivative_from_output(y: f64) -> f64 {
    y * (1.0 - y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activate_is_centered_at_half() {
        assert_eq!(activate(0.0), 0.5);
    }

    #[test]
    fn activate_matches_closed_form() {
        assert!((activate(1.0) - 0.75).abs() < 1e-15);
        assert!((activate(-1.0) - 0.25).abs() < 1e-15);
        assert!((activate(3.0) - 0.875).abs() < 1e-15);
    }

    #[test]
    fn activate_stays_in_open_unit_interval() {
        for s in [-1e6, -50.0, -1.0, 0.0, 1.0, 50.0, 1e6] {
            let y = activate(s);
            assert!(y > 0.0 && y < 1.0, "activate({s}) = {y}");
        }
    }

    #[test]
    fn activate_is_monotonic() {
        let mut prev = activate(-20.0);
        let mut s = -20.0;
        while s < 20.0 {
            s += 0.25;
            let y = activate(s);
            assert!(y > prev);
            prev = y;
        }
    }

    #[test]
    fn derivative_uses_output_form() {
        assert_eq!(derivative_from_output(0.5), 0.25);
        assert_eq!(derivative_from_output(0.0), 0.0);
        assert_eq!(derivative_from_output(1.0), 0.0);
        let y = activate(2.0);
        assert_eq!(derivative_from_output(y), y * (1.0 - y));
    }
}
