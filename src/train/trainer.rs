use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::data::dataset::Dataset;
use crate::error::{RnaError, Result};
use crate::network::network::Network;
use crate::train::error_history::ErrorHistory;
use crate::train::loop_fn::{check_preconditions, train_loop, StopReason, TrainOutcome};
use crate::train::train_config::TrainConfig;

/// Runs [`train_loop`] on the calling thread and logs how long it took.
pub fn train_model(
    network: &mut Network,
    dataset: &Dataset,
    config: &TrainConfig,
    history: &ErrorHistory,
    stop_flag: Option<&AtomicBool>,
) -> Result<TrainOutcome> {
    let start = Instant::now();
    let outcome = train_loop(network, dataset, config, history, stop_flag)?;
    log_outcome(&outcome, start.elapsed());
    Ok(outcome)
}

/// [`train_model`] followed by writing the network to `config.model_path()`.
pub fn train_and_save(
    network: &mut Network,
    dataset: &Dataset,
    config: &TrainConfig,
    history: &ErrorHistory,
) -> Result<(TrainOutcome, PathBuf)> {
    let outcome = train_model(network, dataset, config, history, None)?;
    let path = save_model(network, config)?;
    Ok((outcome, path))
}

fn save_model(network: &Network, config: &TrainConfig) -> Result<PathBuf> {
    if let Some(dir) = &config.output_dir {
        fs::create_dir_all(dir).map_err(RnaError::Write)?;
    }
    let path = config.model_path();
    network.save(&path)?;
    Ok(path)
}

fn log_outcome(outcome: &TrainOutcome, elapsed: Duration) {
    match outcome.stop_reason {
        StopReason::Converged => info!("training converged after {} epochs", outcome.epochs_run),
        StopReason::MaxIterations => {
            info!("training stopped after exhausting {} epochs", outcome.epochs_run)
        }
        StopReason::Cancelled => info!("training cancelled during epoch {}", outcome.epochs_run),
    }
    info!("Total training time: {:.3}s", elapsed.as_secs_f64());
}

/// Everything a finished background run hands back.
#[derive(Debug)]
pub struct TrainingReport {
    /// The trained network; kept even when saving it failed.
    pub network: Network,
    pub outcome: TrainOutcome,
    /// Where the model was written, or why it could not be.
    pub saved: Result<PathBuf>,
    pub elapsed: Duration,
}

/// Lowers the training flag when the worker thread exits, panics included.
struct LowerOnDrop(Arc<AtomicBool>);

impl Drop for LowerOnDrop {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs one training session at a time on a background thread.
///
/// The worker owns the network for the duration of the run. Progress is
/// observed through [`Trainer::history`] and [`Trainer::is_training`]; the
/// trained network comes back from [`Trainer::join`].
#[derive(Debug, Default)]
pub struct Trainer {
    history: ErrorHistory,
    training: Arc<AtomicBool>,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<TrainingReport>>>,
}

impl Trainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts training `network` on `dataset` in the background and saves
    /// the result to `config.model_path()` when the loop ends.
    ///
    /// Input problems (bad config, image size, labels) are reported here
    /// rather than from `join`. A finished run that was never joined is
    /// discarded.
    ///
    /// # Errors
    /// [`RnaError::TrainingInProgress`] while a previous run is still active.
    pub fn start(&mut self, network: Network, dataset: Arc<Dataset>, config: TrainConfig) -> Result<()> {
        if self.is_training() {
            return Err(RnaError::TrainingInProgress);
        }
        check_preconditions(&network, &dataset, &config)?;

        self.history.clear();
        self.stop_flag.store(false, Ordering::Relaxed);
        self.training.store(true, Ordering::Release);

        let history = self.history.clone();
        let stop_flag = Arc::clone(&self.stop_flag);
        let guard = LowerOnDrop(Arc::clone(&self.training));

        let spawned = thread::Builder::new()
            .name("rna-trainer".into())
            .spawn(move || {
                let _guard = guard;
                let mut network = network;
                let start = Instant::now();

                let outcome = train_loop(&mut network, &dataset, &config, &history, Some(&stop_flag))?;
                let saved = save_model(&network, &config);
                if let Err(e) = &saved {
                    warn!("could not save trained model: {e}");
                }

                let elapsed = start.elapsed();
                log_outcome(&outcome, elapsed);
                Ok(TrainingReport { network, outcome, saved, elapsed })
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.training.store(false, Ordering::Release);
                Err(RnaError::Io(e))
            }
        }
    }

    /// `true` from a successful `start` until the worker has saved the model.
    pub fn is_training(&self) -> bool {
        self.training.load(Ordering::Acquire)
    }

    /// Shared handle on the current run's error history.
    pub fn history(&self) -> ErrorHistory {
        self.history.clone()
    }

    /// Asks the running loop to finish at its next epoch start or checkpoint.
    /// The partially trained model is still saved.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// Waits for the current run and returns its report.
    pub fn join(&mut self) -> Result<TrainingReport> {
        let handle = self.handle.take().ok_or(RnaError::NoActiveRun)?;
        handle.join().map_err(|_| RnaError::TrainingPanicked)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::spec::NetworkSpec;
    use rand::{rngs::StdRng, SeedableRng};

    fn pixels() -> Dataset {
        let images = [0.0, 1.0].repeat(5);
        let labels = [0u8, 1].repeat(5);
        Dataset::new(1, 1, images, labels).unwrap()
    }

    fn network(seed: u64) -> Network {
        let mut rng = StdRng::seed_from_u64(seed);
        Network::random(&NetworkSpec::new(vec![2]), 1, &mut rng).unwrap()
    }

    #[test]
    fn train_and_save_writes_loadable_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainConfig::new(0.5, 0.05, 1_000)
            .with_checkpoint_interval(10)
            .with_output_dir(dir.path().join("models"));
        let mut net = network(4);

        let (outcome, path) = train_and_save(&mut net, &pixels(), &config, &ErrorHistory::new()).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::Converged);
        assert_eq!(path, dir.path().join("models").join(config.default_file_name()));
        let loaded = Network::load(&path).unwrap();
        for (a, b) in net.layers().iter().zip(loaded.layers()) {
            assert_eq!(a.weights(), b.weights());
        }
    }

    fn iterations(history: &ErrorHistory) -> Vec<usize> {
        history.snapshot().iter().map(|s| s.iteration).collect()
    }

    #[test]
    fn repeated_sync_runs_restart_the_history() {
        // Unreachable tolerance: two full epochs of 10 samples each time.
        let config = TrainConfig::new(0.5, 1e-12, 2).with_checkpoint_interval(10);
        let history = ErrorHistory::new();

        let mut net = network(3);
        train_model(&mut net, &pixels(), &config, &history, None).unwrap();
        assert_eq!(iterations(&history), vec![10, 20]);

        train_model(&mut net, &pixels(), &config, &history, None).unwrap();
        assert_eq!(iterations(&history), vec![10, 20]);
    }

    #[test]
    fn restart_clears_previous_run_history() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Arc::new(pixels());
        let first = TrainConfig::new(0.5, 1e-12, 3)
            .with_checkpoint_interval(5)
            .with_output_dir(dir.path());
        let second = first.clone().with_checkpoint_interval(10);

        let mut trainer = Trainer::new();
        trainer.start(network(1), Arc::clone(&dataset), first).unwrap();
        trainer.join().unwrap();
        assert_eq!(iterations(&trainer.history()), vec![5, 10, 15, 20, 25, 30]);

        trainer.start(network(2), dataset, second).unwrap();
        let early = iterations(&trainer.history());
        trainer.join().unwrap();

        let finished = iterations(&trainer.history());
        assert_eq!(finished, vec![10, 20, 30]);
        assert_eq!(early, finished[..early.len()]);
    }

    #[test]
    fn join_without_start_is_an_error() {
        let mut trainer = Trainer::new();
        assert!(!trainer.is_training());
        assert!(matches!(trainer.join(), Err(RnaError::NoActiveRun)));
    }

    #[test]
    fn start_reports_bad_inputs_immediately() {
        let mut trainer = Trainer::new();
        let mut rng = StdRng::seed_from_u64(0);
        let wide = Network::random(&NetworkSpec::new(vec![2]), 3, &mut rng).unwrap();
        let err = trainer
            .start(wide, Arc::new(pixels()), TrainConfig::default())
            .unwrap_err();
        assert!(matches!(err, RnaError::ShapeMismatch { .. }));
        assert!(!trainer.is_training());
    }

    #[test]
    fn failed_save_keeps_trained_network() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"").unwrap();
        let config = TrainConfig::new(0.5, 0.05, 1_000)
            .with_checkpoint_interval(10)
            .with_output_dir(blocker.join("models"));

        let mut trainer = Trainer::new();
        trainer.start(network(6), Arc::new(pixels()), config).unwrap();
        let report = trainer.join().unwrap();

        assert!(matches!(report.saved, Err(RnaError::Write(_))));
        assert_eq!(report.outcome.stop_reason, StopReason::Converged);
        assert_eq!(report.network.clone().find_label(&[1.0]).unwrap(), 1);
        assert!(!trainer.is_training());
    }
}
