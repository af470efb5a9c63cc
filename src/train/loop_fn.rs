use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

use crate::data::dataset::Dataset;
use crate::error::{RnaError, Result};
use crate::network::network::Network;
use crate::optim::sgd::Sgd;
use crate::train::error_history::{ErrorHistory, ErrorSample};
use crate::train::train_config::TrainConfig;

/// Why a training run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A checkpoint's averaged error fell below the tolerance.
    Converged,
    /// Every epoch ran without converging.
    MaxIterations,
    /// The stop flag was raised.
    Cancelled,
}

/// Summary of a finished `train_loop` run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainOutcome {
    pub stop_reason: StopReason,
    /// Epochs started, including a partially completed last one.
    pub epochs_run: usize,
    /// Samples processed across all epochs.
    pub samples_seen: usize,
    /// Averaged error of the most recent checkpoint.
    pub last_error: Option<f64>,
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `network` in place with online (per-sample) backpropagation.
///
/// Samples are visited in dataset order for up to `config.max_iterations`
/// epochs. Every `config.checkpoint_interval` samples the error accumulated
/// since the previous checkpoint is averaged and appended to `history`; if
/// it is below `config.tolerance` training stops right there. Entries left in
/// `history` by an earlier run are dropped first.
///
/// # Early termination
/// Besides convergence, the loop ends when `stop_flag` is raised. The flag is
/// checked at the start of each epoch and after each checkpoint.
///
/// # Errors
/// Fails before touching the network if the config is invalid, the dataset
/// is empty, its image size differs from the network's input count, or a
/// label has no matching output neuron.
pub fn train_loop(
    network: &mut Network,
    dataset: &Dataset,
    config: &TrainConfig,
    history: &ErrorHistory,
    stop_flag: Option<&AtomicBool>,
) -> Result<TrainOutcome> {
    check_preconditions(network, dataset, config)?;
    history.clear();

    let sgd = Sgd::new(config.learning_rate);
    let size = dataset.size();
    let interval = config.checkpoint_interval;

    info!(
        "training {} network on {} samples (lr={}, tolerance={}, max_iterations={})",
        network.spec(),
        size,
        config.learning_rate,
        config.tolerance,
        config.max_iterations
    );

    let mut outcome = TrainOutcome {
        stop_reason: StopReason::MaxIterations,
        epochs_run: 0,
        samples_seen: 0,
        last_error: None,
    };
    let mut window_error = 0.0;

    'epochs: for epoch in 0..config.max_iterations {
        if is_raised(stop_flag) {
            outcome.stop_reason = StopReason::Cancelled;
            break;
        }
        outcome.epochs_run = epoch + 1;

        for (i, (image, label)) in dataset.iter().enumerate() {
            window_error += train_sample(network, image, label as usize, &sgd);

            let iteration = size * epoch + i + 1;
            outcome.samples_seen = iteration;
            if iteration % interval != 0 {
                continue;
            }

            let error = window_error / interval as f64;
            history.push(ErrorSample { iteration, error });
            outcome.last_error = Some(error);
            debug!("epoch {epoch}, iteration {iteration}: error {error:.6}");

            if error < config.tolerance {
                info!("converged at iteration {iteration} with error {error:.6}");
                outcome.stop_reason = StopReason::Converged;
                break 'epochs;
            }
            window_error = 0.0;

            if is_raised(stop_flag) {
                outcome.stop_reason = StopReason::Cancelled;
                break 'epochs;
            }
        }
    }

    if outcome.stop_reason == StopReason::Cancelled {
        info!("training cancelled after {} samples", outcome.samples_seen);
    }
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn is_raised(flag: Option<&AtomicBool>) -> bool {
    flag.is_some_and(|f| f.load(Ordering::Relaxed))
}

pub(crate) fn check_preconditions(network: &Network, dataset: &Dataset, config: &TrainConfig) -> Result<()> {
    config.validate()?;

    if dataset.is_empty() {
        return Err(RnaError::dataset("training dataset is empty"));
    }
    if dataset.pixel_count() != network.input_count() {
        return Err(RnaError::ShapeMismatch {
            expected: network.input_count(),
            actual: dataset.pixel_count(),
        });
    }
    if let Some(max) = dataset.max_label() {
        if max as usize >= network.output_count() {
            return Err(RnaError::dataset(format!(
                "label {max} has no output neuron (network has {} outputs)",
                network.output_count()
            )));
        }
    }
    Ok(())
}

/// One forward/backward pass for a single sample; returns its half squared error.
fn train_sample(network: &mut Network, image: &[f64], label: usize, sgd: &Sgd) -> f64 {
    network.forward(image);

    let layers = network.layers_mut();
    let out = layers.len() - 1;

    // Output layer: error against the one-hot target, weights updated at once.
    let (hidden, output) = layers.split_at_mut(out);
    let inputs = hidden.last().map_or(image, |prev| prev.activations());
    let loss = output[0].train_as_output(inputs, label, sgd);

    // Hidden layers, last to first: each consumes the errors (and the freshly
    // updated weights) of the layer above it.
    for l in (0..out).rev() {
        let (below, above) = layers.split_at_mut(l + 1);
        let (before, current) = below.split_at_mut(l);
        let inputs = before.last().map_or(image, |prev| prev.activations());
        current[0].train_as_hidden(inputs, &above[0], sgd);
    }

    loss
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::spec::NetworkSpec;
    use rand::{rngs::StdRng, SeedableRng};

    /// Single-pixel images: a dark pixel is class 0, a bright one class 1.
    fn single_pixel_dataset() -> Dataset {
        let mut images = Vec::new();
        let mut labels = Vec::new();
        for _ in 0..5 {
            images.extend_from_slice(&[0.0, 1.0]);
            labels.extend_from_slice(&[0, 1]);
        }
        Dataset::new(1, 1, images, labels).unwrap()
    }

    fn network(spec: &[usize], inputs: usize, seed: u64) -> Network {
        let mut rng = StdRng::seed_from_u64(seed);
        Network::random(&NetworkSpec::new(spec.to_vec()), inputs, &mut rng).unwrap()
    }

    #[test]
    fn converges_on_separable_pixels() {
        let dataset = single_pixel_dataset();
        let config = TrainConfig::new(0.5, 0.05, 1_000).with_checkpoint_interval(10);
        let history = ErrorHistory::new();

        for seed in 0..3 {
            let mut net = network(&[2], 1, seed);
            let outcome = train_loop(&mut net, &dataset, &config, &history, None).unwrap();

            assert_eq!(outcome.stop_reason, StopReason::Converged);
            assert!(outcome.epochs_run < config.max_iterations);
            let last = history.last().unwrap();
            assert!(last.error < config.tolerance);
            assert_eq!(outcome.last_error, Some(last.error));
            assert_eq!(net.find_label(&[0.0]).unwrap(), 0);
            assert_eq!(net.find_label(&[1.0]).unwrap(), 1);
        }
    }

    #[test]
    fn hidden_layers_also_converge() {
        let dataset = single_pixel_dataset();
        let config = TrainConfig::new(0.5, 0.05, 5_000).with_checkpoint_interval(10);
        let history = ErrorHistory::new();
        let mut net = network(&[4, 2], 1, 5);

        let outcome = train_loop(&mut net, &dataset, &config, &history, None).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::Converged);
        assert_eq!(net.find_label(&[0.0]).unwrap(), 0);
        assert_eq!(net.find_label(&[1.0]).unwrap(), 1);
    }

    #[test]
    fn history_iterations_strictly_increase() {
        let dataset = single_pixel_dataset();
        // Unreachable tolerance: every epoch runs.
        let config = TrainConfig::new(0.5, 1e-12, 7).with_checkpoint_interval(4);
        let history = ErrorHistory::new();
        let mut net = network(&[3, 2], 1, 1);

        let outcome = train_loop(&mut net, &dataset, &config, &history, None).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::MaxIterations);
        assert_eq!(outcome.epochs_run, 7);
        assert_eq!(outcome.samples_seen, 70);

        let samples = history.snapshot();
        // 70 samples, a checkpoint every 4 (the window spans epoch boundaries)
        assert_eq!(samples.len(), 17);
        assert!(samples.windows(2).all(|w| w[0].iteration < w[1].iteration));
        assert!(samples.iter().all(|s| s.iteration % 4 == 0));
    }

    #[test]
    fn checkpoint_error_is_window_average() {
        // One zero-weight output neuron always outputs 0.5, so every sample
        // contributes 0.5 * 0.5² = 0.125 before its first update. With lr tiny
        // the average stays close to that.
        let dataset = Dataset::new(1, 1, vec![0.0; 4], vec![0; 4]).unwrap();
        let mut net = Network::from_layers(vec![
            crate::layers::dense::Layer::from_weights(1, 1, vec![0.0, 0.0]).unwrap(),
        ])
        .unwrap();
        let config = TrainConfig::new(1e-9, 1e-12, 1).with_checkpoint_interval(2);
        let history = ErrorHistory::new();

        train_loop(&mut net, &dataset, &config, &history, None).unwrap();
        let samples = history.snapshot();
        assert_eq!(samples.iter().map(|s| s.iteration).collect::<Vec<_>>(), vec![2, 4]);
        for s in samples {
            assert!((s.error - 0.125).abs() < 1e-6);
        }
    }

    #[test]
    fn raised_stop_flag_cancels_before_work() {
        let dataset = single_pixel_dataset();
        let config = TrainConfig::new(0.5, 0.05, 100).with_checkpoint_interval(10);
        let mut net = network(&[2], 1, 2);
        let before = net.clone();
        let flag = AtomicBool::new(true);

        let outcome =
            train_loop(&mut net, &dataset, &config, &ErrorHistory::new(), Some(&flag)).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::Cancelled);
        assert_eq!(outcome.samples_seen, 0);
        assert_eq!(net, before);
    }

    #[test]
    fn rejects_mismatched_image_size() {
        let dataset = single_pixel_dataset();
        let mut net = network(&[2], 3, 0);
        let err = train_loop(&mut net, &dataset, &TrainConfig::default(), &ErrorHistory::new(), None)
            .unwrap_err();
        assert!(matches!(err, RnaError::ShapeMismatch { expected: 3, actual: 1 }));
    }

    #[test]
    fn rejects_label_without_output() {
        let dataset = Dataset::new(1, 1, vec![0.0, 1.0], vec![0, 5]).unwrap();
        let mut net = network(&[2], 1, 0);
        let err = train_loop(&mut net, &dataset, &TrainConfig::default(), &ErrorHistory::new(), None)
            .unwrap_err();
        assert!(matches!(err, RnaError::Dataset(_)));
    }

    #[test]
    fn rejects_empty_dataset() {
        let dataset = Dataset::new(1, 1, vec![], vec![]).unwrap();
        let mut net = network(&[2], 1, 0);
        assert!(train_loop(&mut net, &dataset, &TrainConfig::default(), &ErrorHistory::new(), None).is_err());
    }
}
