//! Reader for the IDX binary format used by MNIST and its derivatives.
//!
//! # IDX3 image file layout
//! ```text
//! bytes  0-3:   0x00000803  (magic, big-endian; uint8 data, 3 dimensions)
//! bytes  4-7:   N           (number of images, big-endian u32)
//! bytes  8-11:  rows        (image height in pixels, big-endian u32)
//! bytes 12-15:  cols        (image width in pixels, big-endian u32)
//! bytes 16..:   N * rows * cols bytes, row-major, uint8
//! ```
//!
//! # IDX1 label file layout
//! ```text
//! bytes  0-3:   0x00000801  (magic, big-endian; uint8 data, 1 dimension)
//! bytes  4-7:   N           (number of labels, big-endian u32)
//! bytes  8..:   N bytes, each a class index
//! ```

use std::fs;
use std::path::Path;

use log::debug;

use crate::data::dataset::Dataset;
use crate::error::{RnaError, Result};

pub const IMAGE_MAGIC: u32 = 0x0000_0803;
pub const LABEL_MAGIC: u32 = 0x0000_0801;

const IMAGE_HEADER_LEN: usize = 16;
const LABEL_HEADER_LEN: usize = 8;

fn be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

/// Parses an image/label IDX pair into a [`Dataset`] with pixels divided by 255.
pub fn parse_idx_pair(image_bytes: &[u8], label_bytes: &[u8]) -> Result<Dataset> {
    // ── Image header ────────────────────────────────────────────────────────

    if image_bytes.len() < IMAGE_HEADER_LEN {
        return Err(RnaError::dataset(format!(
            "IDX image file too short: expected at least {IMAGE_HEADER_LEN} header bytes, got {}",
            image_bytes.len()
        )));
    }

    let magic = be_u32(image_bytes, 0);
    if magic != IMAGE_MAGIC {
        return Err(RnaError::dataset(format!(
            "IDX image file has magic {magic:#010x}, expected {IMAGE_MAGIC:#010x}"
        )));
    }

    let n_items = be_u32(image_bytes, 4) as usize;
    let rows = be_u32(image_bytes, 8) as usize;
    let cols = be_u32(image_bytes, 12) as usize;

    let n_pixels = rows.checked_mul(cols).ok_or_else(|| {
        RnaError::dataset(format!("IDX image file: rows * cols overflows (rows={rows}, cols={cols})"))
    })?;
    let data_len = n_items.checked_mul(n_pixels).ok_or_else(|| {
        RnaError::dataset(format!(
            "IDX image file: n_items * n_pixels overflows (n_items={n_items}, n_pixels={n_pixels})"
        ))
    })?;

    if image_bytes.len() - IMAGE_HEADER_LEN < data_len {
        return Err(RnaError::dataset(format!(
            "IDX image file too short: header declares {n_items} items of {rows}x{cols} pixels \
             ({data_len} data bytes needed after header), but file is only {} bytes total",
            image_bytes.len()
        )));
    }

    // ── Label header ────────────────────────────────────────────────────────

    if label_bytes.len() < LABEL_HEADER_LEN {
        return Err(RnaError::dataset(format!(
            "IDX label file too short: expected at least {LABEL_HEADER_LEN} header bytes, got {}",
            label_bytes.len()
        )));
    }

    let magic = be_u32(label_bytes, 0);
    if magic != LABEL_MAGIC {
        return Err(RnaError::dataset(format!(
            "IDX label file has magic {magic:#010x}, expected {LABEL_MAGIC:#010x}"
        )));
    }

    let label_count = be_u32(label_bytes, 4) as usize;
    if label_count != n_items {
        return Err(RnaError::dataset(format!(
            "IDX file mismatch: image file declares {n_items} items but label file declares {label_count}"
        )));
    }

    if label_bytes.len() - LABEL_HEADER_LEN < n_items {
        return Err(RnaError::dataset(format!(
            "IDX label file too short: header declares {n_items} labels but file is only {} bytes",
            label_bytes.len()
        )));
    }

    // ── Payload ─────────────────────────────────────────────────────────────

    let images = image_bytes[IMAGE_HEADER_LEN..IMAGE_HEADER_LEN + data_len]
        .iter()
        .map(|&px| px as f64 / 255.0)
        .collect();
    let labels = label_bytes[LABEL_HEADER_LEN..LABEL_HEADER_LEN + n_items].to_vec();

    Dataset::new(rows, cols, images, labels)
}

/// Reads and parses an IDX image file and its matching label file.
pub fn load_idx_pair(images_path: impl AsRef<Path>, labels_path: impl AsRef<Path>) -> Result<Dataset> {
    let images_path = images_path.as_ref();
    let labels_path = labels_path.as_ref();

    let image_bytes = fs::read(images_path).map_err(|e| {
        RnaError::Io(std::io::Error::new(e.kind(), format!("{}: {e}", images_path.display())))
    })?;
    let label_bytes = fs::read(labels_path).map_err(|e| {
        RnaError::Io(std::io::Error::new(e.kind(), format!("{}: {e}", labels_path.display())))
    })?;

    let dataset = parse_idx_pair(&image_bytes, &label_bytes)?;
    debug!(
        "loaded {} samples of {}x{} from {}",
        dataset.size(),
        dataset.rows(),
        dataset.cols(),
        images_path.display()
    );
    Ok(dataset)
}
