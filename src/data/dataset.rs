use crate::error::{RnaError, Result};

/// Labeled grayscale images stored contiguously.
///
/// Images are row-major with `rows * cols` intensities each, normalized to
/// `[0, 1]`. Labels are class ids. The constructor rejects buffers whose
/// lengths disagree with the declared shape, so every accessor can index
/// without further checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    rows: usize,
    cols: usize,
    images: Vec<f64>,
    labels: Vec<u8>,
}

impl Dataset {
    pub fn new(rows: usize, cols: usize, images: Vec<f64>, labels: Vec<u8>) -> Result<Dataset> {
        let pixel_count = rows.checked_mul(cols).ok_or_else(|| {
            RnaError::dataset(format!("rows * cols overflows (rows={rows}, cols={cols})"))
        })?;
        if pixel_count == 0 {
            return Err(RnaError::dataset(format!(
                "images must have at least one pixel, got {rows}x{cols}"
            )));
        }
        let expected = labels.len().checked_mul(pixel_count).ok_or_else(|| {
            RnaError::dataset("size * rows * cols overflows")
        })?;
        if images.len() != expected {
            return Err(RnaError::dataset(format!(
                "{} labels of {rows}x{cols} images need {expected} pixels, got {}",
                labels.len(),
                images.len()
            )));
        }
        Ok(Dataset { rows, cols, images, labels })
    }

    /// Number of samples.
    pub fn size(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// The `index`-th image.
    ///
    /// # Panics
    /// Panics if `index >= self.size()`.
    pub fn image(&self, index: usize) -> &[f64] {
        let n = self.pixel_count();
        &self.images[index * n..(index + 1) * n]
    }

    pub fn label(&self, index: usize) -> u8 {
        self.labels[index]
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Largest label present, if any.
    pub fn max_label(&self) -> Option<u8> {
        self.labels.iter().copied().max()
    }

    /// Iterates `(image, label)` pairs in dataset order.
    pub fn iter(&self) -> impl Iterator<Item = (&[f64], u8)> + '_ {
        self.images
            .chunks_exact(self.pixel_count())
            .zip(self.labels.iter().copied())
    }
}
