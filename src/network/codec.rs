//! Binary model file format.
//!
//! ```text
//! magic         4 bytes   "JRNA"
//! layer_count   u32 LE
//! per layer:
//!   neuron_count  u32 LE
//!   input_count   u32 LE   (weights per neuron, bias excluded)
//!   weights       neuron_count * (input_count + 1) f64 LE,
//!                 neuron-major, bias last in each neuron
//! ```
//!
//! Activation and error buffers are not stored.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::info;

use crate::error::{RnaError, Result};
use crate::layers::dense::Layer;
use crate::network::network::Network;

pub const MAGIC: &[u8; 4] = b"JRNA";

const F64_LEN: usize = std::mem::size_of::<f64>();

fn with_path(path: &Path, e: io::Error) -> io::Error {
    io::Error::new(e.kind(), format!("{}: {e}", path.display()))
}

fn write_u32<W: Write>(w: &mut W, value: usize, what: &str) -> Result<()> {
    let value = u32::try_from(value)
        .map_err(|_| RnaError::format(format!("{what} {value} does not fit in a u32")))?;
    w.write_all(&value.to_le_bytes()).map_err(RnaError::Write)
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(RnaError::Read)?;
    Ok(u32::from_le_bytes(buf))
}

impl Network {
    /// Writes the model in the binary format described in the module docs.
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<()> {
        w.write_all(MAGIC).map_err(RnaError::Write)?;
        write_u32(&mut w, self.layer_count(), "layer count")?;

        for layer in self.layers() {
            write_u32(&mut w, layer.neuron_count(), "neuron count")?;
            write_u32(&mut w, layer.input_count(), "input count")?;
            for weight in layer.weights() {
                w.write_all(&weight.to_le_bytes()).map_err(RnaError::Write)?;
            }
        }

        w.flush().map_err(RnaError::Write)
    }

    /// Reads a model written by [`Network::write_to`].
    ///
    /// A magic or layer-table problem is a [`RnaError::Format`]; running out of
    /// bytes is a [`RnaError::Read`].
    pub fn read_from<R: Read>(mut r: R) -> Result<Network> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic).map_err(RnaError::Read)?;
        if &magic != MAGIC {
            return Err(RnaError::format(format!(
                "first 4 bytes {magic:02x?} do not match magic {:?}",
                std::str::from_utf8(MAGIC).unwrap_or("JRNA")
            )));
        }

        let layer_count = read_u32(&mut r)? as usize;
        if layer_count == 0 {
            return Err(RnaError::format("layer count is 0"));
        }

        let mut layers: Vec<Layer> = Vec::new();
        for l in 0..layer_count {
            let neuron_count = read_u32(&mut r)? as usize;
            let input_count = read_u32(&mut r)? as usize;

            if neuron_count == 0 {
                return Err(RnaError::format(format!("layer {l} has no neurons")));
            }
            if let Some(prev) = layers.last() {
                if input_count != prev.neuron_count() {
                    return Err(RnaError::format(format!(
                        "layer {l} takes {input_count} inputs but layer {} has {} neurons",
                        l - 1,
                        prev.neuron_count()
                    )));
                }
            }

            let byte_len = neuron_count
                .checked_mul(input_count + 1)
                .and_then(|n| n.checked_mul(F64_LEN))
                .ok_or_else(|| RnaError::format(format!("layer {l} weight count overflows")))?;

            // Bounded read: a lying header cannot make us allocate more than
            // the stream actually holds.
            let mut bytes = Vec::new();
            (&mut r)
                .take(byte_len as u64)
                .read_to_end(&mut bytes)
                .map_err(RnaError::Read)?;
            if bytes.len() != byte_len {
                return Err(RnaError::Read(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("layer {l} weights: expected {byte_len} bytes, got {}", bytes.len()),
                )));
            }

            let weights = bytes
                .chunks_exact(F64_LEN)
                .map(|chunk| {
                    let mut buf = [0u8; F64_LEN];
                    buf.copy_from_slice(chunk);
                    f64::from_le_bytes(buf)
                })
                .collect();
            layers.push(Layer::from_weights(neuron_count, input_count, weights)?);
        }

        Network::from_layers(layers)
    }

    /// Writes the model to `path`, creating or truncating the file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| RnaError::Write(with_path(path, e)))?;
        self.write_to(BufWriter::new(file)).map_err(|e| match e {
            RnaError::Write(io) => RnaError::Write(with_path(path, io)),
            other => other,
        })?;
        info!("saved model to file {}", path.display());
        Ok(())
    }

    /// Loads a model from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Network> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RnaError::Read(with_path(path, e)))?;
        Network::read_from(BufReader::new(file)).map_err(|e| match e {
            RnaError::Read(io) => RnaError::Read(with_path(path, io)),
            other => other,
        })
    }
}
