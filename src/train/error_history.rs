use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One convergence checkpoint: the averaged error over the samples processed
/// since the previous checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorSample {
    /// 1-based count of samples processed across all epochs.
    pub iteration: usize,
    /// Mean half squared error over the checkpoint window.
    pub error: f64,
}

/// Append-only, shareable log of [`ErrorSample`]s.
///
/// Clones share the same buffer, so the training side appends while any
/// number of observers poll `len()` and read the new tail with `since()`.
/// Entries are never modified once appended; a reader always sees a prefix
/// of the final sequence.
#[derive(Debug, Clone, Default)]
pub struct ErrorHistory {
    samples: Arc<RwLock<Vec<ErrorSample>>>,
}

impl ErrorHistory {
    pub fn new() -> Self {
        Self::default()
    }

    // The buffer is only ever pushed to, so a writer that panicked mid-push
    // still leaves a valid prefix behind.
    fn read(&self) -> RwLockReadGuard<'_, Vec<ErrorSample>> {
        self.samples.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<ErrorSample>> {
        self.samples.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a checkpoint. Iterations must be strictly increasing.
    pub(crate) fn push(&self, sample: ErrorSample) {
        let mut samples = self.write();
        debug_assert!(
            samples.last().map_or(true, |last| last.iteration < sample.iteration),
            "error history iterations must increase"
        );
        samples.push(sample);
    }

    /// Drops every entry; only done when a new run starts.
    pub(crate) fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn last(&self) -> Option<ErrorSample> {
        self.read().last().copied()
    }

    /// Entries appended after the first `offset` ones.
    pub fn since(&self, offset: usize) -> Vec<ErrorSample> {
        let samples = self.read();
        samples.get(offset..).map(<[ErrorSample]>::to_vec).unwrap_or_default()
    }

    /// Copy of the whole history.
    pub fn snapshot(&self) -> Vec<ErrorSample> {
        self.read().clone()
    }

    /// Writes the current history as a JSON array of `{iteration, error}`.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &*self.read())?;
        Ok(())
    }
}
