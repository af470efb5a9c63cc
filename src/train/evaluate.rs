use std::fmt;

use log::info;

use crate::data::dataset::Dataset;
use crate::error::Result;
use crate::network::network::Network;

/// Classification results over a labeled dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalReport {
    pub total: usize,
    pub correct: usize,
}

impl EvalReport {
    pub fn incorrect(&self) -> usize {
        self.total - self.correct
    }

    /// Fraction of correct predictions in `[0, 1]`; 0 for an empty dataset.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let acc = self.accuracy() * 100.0;
        let err = if self.total == 0 { 0.0 } else { 100.0 - acc };
        writeln!(f, "+----------------------------------+")?;
        writeln!(f, "| Model Statistics                 |")?;
        writeln!(f, "+------------------------+---------+")?;
        writeln!(f, "| Correct Predictions    |  {:04}   |", self.correct)?;
        writeln!(f, "| Incorrect Predictions  |  {:04}   |", self.incorrect())?;
        writeln!(f, "| Accuracy               |  {acc:05.2}% |")?;
        writeln!(f, "| Error                  |  {err:05.2}% |")?;
        write!(f, "+------------------------+---------+")
    }
}

/// Classifies every image in `dataset` and counts the matches.
///
/// # Errors
/// [`crate::RnaError::ShapeMismatch`] if the images do not have
/// `network.input_count()` pixels.
pub fn evaluate(network: &mut Network, dataset: &Dataset) -> Result<EvalReport> {
    let mut correct = 0;
    for (image, label) in dataset.iter() {
        if network.find_label(image)? == label as usize {
            correct += 1;
        }
    }
    let report = EvalReport { total: dataset.size(), correct };
    info!(
        "evaluated {} samples: {} correct ({:.2}%)",
        report.total,
        report.correct,
        report.accuracy() * 100.0
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RnaError;
    use crate::layers::dense::Layer;

    /// One input, two outputs: neuron 1 follows the pixel, neuron 0 opposes it.
    fn threshold_network() -> Network {
        let out = Layer::from_weights(2, 1, vec![-4.0, 2.0, 4.0, -2.0]).unwrap();
        Network::from_layers(vec![out]).unwrap()
    }

    #[test]
    fn counts_correct_predictions() {
        let dataset = Dataset::new(1, 1, vec![0.0, 1.0, 0.0, 1.0], vec![0, 1, 1, 1]).unwrap();
        let report = evaluate(&mut threshold_network(), &dataset).unwrap();
        assert_eq!(report, EvalReport { total: 4, correct: 3 });
        assert_eq!(report.incorrect(), 1);
        assert_eq!(report.accuracy(), 0.75);
    }

    #[test]
    fn rejects_wrong_image_size() {
        let dataset = Dataset::new(1, 2, vec![0.0, 1.0], vec![0]).unwrap();
        let err = evaluate(&mut threshold_network(), &dataset).unwrap_err();
        assert!(matches!(err, RnaError::ShapeMismatch { expected: 1, actual: 2 }));
    }

    #[test]
    fn empty_dataset_has_zero_accuracy() {
        let report = EvalReport { total: 0, correct: 0 };
        assert_eq!(report.accuracy(), 0.0);
    }

    #[test]
    fn table_layout() {
        let table = EvalReport { total: 10000, correct: 8905 }.to_string();
        let expected = "\
+----------------------------------+
| Model Statistics                 |
+------------------------+---------+
| Correct Predictions    |  8905   |
| Incorrect Predictions  |  1095   |
| Accuracy               |  89.05% |
| Error                  |  10.95% |
+------------------------+---------+";
        assert_eq!(table, expected);
    }
}
