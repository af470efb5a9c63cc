//! `rna-digits` command-line front end.
//!
//! - `rna-digits train` trains a network on IDX images in the background,
//!   printing each error checkpoint as it lands, and saves the model.
//! - `rna-digits test --model F` evaluates a saved model on a labeled set.
//!
//! Logging goes through `env_logger`; set `RUST_LOG=debug` for per-checkpoint
//! detail from the library.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use rand::{rngs::StdRng, SeedableRng};

use rna_digits::{evaluate, load_idx_pair, Network, NetworkSpec, TrainConfig, Trainer};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "rna-digits")]
#[command(about = "Train and evaluate a feed-forward digit classifier", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new network and save it as a model file
    Train {
        /// IDX image file
        #[arg(long, default_value = "data/train-images.idx3-ubyte")]
        images: PathBuf,

        /// IDX label file
        #[arg(long, default_value = "data/train-labels.idx1-ubyte")]
        labels: PathBuf,

        /// JSON training config; flags below override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Learning rate
        #[arg(long)]
        lr: Option<f64>,

        /// Stop once a checkpoint's averaged error is below this value
        #[arg(long)]
        tolerance: Option<f64>,

        /// Maximum number of epochs
        #[arg(long)]
        max_iters: Option<usize>,

        /// Samples between two error checkpoints
        #[arg(long)]
        checkpoint: Option<usize>,

        /// Comma-separated layer sizes, output layer last
        #[arg(long, default_value = "64,32,10")]
        layers: NetworkSpec,

        /// Model file name (derived from the parameters when absent)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Directory for the model file
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Write the error history to this JSON file
        #[arg(long)]
        history: Option<PathBuf>,

        /// Seed for the initial weights
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Evaluate a saved model on a labeled dataset
    Test {
        /// Model file to load
        #[arg(long)]
        model: PathBuf,

        /// IDX image file
        #[arg(long, default_value = "data/t10k-images.idx3-ubyte")]
        images: PathBuf,

        /// IDX label file
        #[arg(long, default_value = "data/t10k-labels.idx1-ubyte")]
        labels: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Train {
            images,
            labels,
            config,
            lr,
            tolerance,
            max_iters,
            checkpoint,
            layers,
            out,
            out_dir,
            history,
            seed,
        } => {
            let mut train_config = match &config {
                Some(path) => TrainConfig::load_json(path)
                    .with_context(|| format!("loading training config {}", path.display()))?,
                None => TrainConfig::default(),
            };
            if let Some(lr) = lr {
                train_config.learning_rate = lr;
            }
            if let Some(tolerance) = tolerance {
                train_config.tolerance = tolerance;
            }
            if let Some(max_iters) = max_iters {
                train_config.max_iterations = max_iters;
            }
            if let Some(checkpoint) = checkpoint {
                train_config.checkpoint_interval = checkpoint;
            }
            if out.is_some() {
                train_config.output_path = out;
            }
            if out_dir.is_some() {
                train_config.output_dir = out_dir;
            }
            train_config.validate()?;

            run_train(&images, &labels, &layers, train_config, history, seed)
        }
        Commands::Test { model, images, labels } => run_test(&model, &images, &labels),
    }
}

fn run_train(
    images: &Path,
    labels: &Path,
    spec: &NetworkSpec,
    config: TrainConfig,
    history_path: Option<PathBuf>,
    seed: Option<u64>,
) -> Result<()> {
    let dataset = load_idx_pair(images, labels)
        .with_context(|| format!("loading training set {}", images.display()))?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let network = spec.build(dataset.pixel_count(), &mut rng)?;

    println!("Network:             {spec}");
    println!("Training samples:    {}", dataset.size());
    println!("Learning rate:       {}", config.learning_rate);
    println!("Tolerance:           {}", config.tolerance);
    println!("Max iterations:      {}", config.max_iterations);
    println!("Checkpoint interval: {}", config.checkpoint_interval);
    println!("Model file:          {}", config.model_path().display());

    let mut trainer = Trainer::new();
    trainer.start(network, Arc::new(dataset), config)?;

    let history = trainer.history();
    let mut seen = 0;
    loop {
        let running = trainer.is_training();
        for sample in history.since(seen) {
            println!("iteration {:>9}  error {:.6}", sample.iteration, sample.error);
            seen += 1;
        }
        if !running {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    let report = trainer.join()?;
    let path = report.saved.context("saving trained model")?;
    println!("Model saved to {}", path.display());
    info!("stopped: {:?} after {} samples", report.outcome.stop_reason, report.outcome.samples_seen);

    if let Some(history_path) = history_path {
        history
            .save_json(&history_path)
            .with_context(|| format!("writing error history {}", history_path.display()))?;
        println!("Error history written to {}", history_path.display());
    }
    Ok(())
}

fn run_test(model: &Path, images: &Path, labels: &Path) -> Result<()> {
    let mut network =
        Network::load(model).with_context(|| format!("loading model {}", model.display()))?;
    let dataset = load_idx_pair(images, labels)
        .with_context(|| format!("loading test set {}", images.display()))?;

    let report = evaluate(&mut network, &dataset)?;
    println!("{report}");
    Ok(())
}
