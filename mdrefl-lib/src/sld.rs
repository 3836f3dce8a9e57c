//! Scattering length density profiles from binned atom positions.

use mdrefl_data::{Frame, SldLayer};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{MdReflError, Result};
use crate::job::Job;
use crate::scatlen::ScatteringTable;
use crate::stats::column_stats;

/// SLD profile of one analysed frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameProfile {
    pub time: f64,
    pub layers: Vec<SldLayer>,
}

/// Time-averaged profile with the per-layer standard error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AveragedProfile {
    pub layers: Vec<SldLayer>,
    /// Standard errors of `real` and `imag`; `thickness` mirrors `layers`.
    pub errors: Vec<SldLayer>,
}

impl AveragedProfile {
    /// Depth of the far edge of each layer, measured from z = 0.
    pub fn depths(&self) -> Vec<f64> {
        self.layers
            .iter()
            .scan(0.0, |z, l| {
                *z += l.thickness;
                Some(*z)
            })
            .collect()
    }
}

/// Number of whole layers that fit below `cell_z - cutoff`; zero or negative
/// means the frame has no usable depth range.
pub fn layer_count(cell_z: f64, layer_thickness: f64, cutoff: f64) -> usize {
    let n = ((cell_z - cutoff) / layer_thickness).floor();
    if n > 0.0 { n as usize } else { 0 }
}

/// Bin one frame's atoms into layers of `layer_thickness` and convert the
/// summed scattering lengths into densities.
///
/// Atoms at or beyond `n * layer_thickness` fall in the cutoff region and
/// are skipped, as are atoms with negative depth.
pub fn frame_profile(
    frame: &Frame,
    table: &ScatteringTable,
    layer_thickness: f64,
    cutoff: f64,
) -> Result<Vec<SldLayer>> {
    if !(layer_thickness.is_finite() && layer_thickness > 0.0) {
        return Err(MdReflError::InvalidInput(format!(
            "layer thickness must be positive, got {layer_thickness}"
        )));
    }

    let n = layer_count(frame.cell.z, layer_thickness, cutoff);
    let mut layers = vec![SldLayer::new(layer_thickness, 0.0, 0.0); n];
    if n == 0 {
        return Ok(layers);
    }

    let limit = n as f64 * layer_thickness;
    let mut skipped = 0usize;
    for atom in &frame.atoms {
        if !(atom.depth >= 0.0 && atom.depth < limit) {
            skipped += 1;
            continue;
        }
        let bin = ((atom.depth / layer_thickness).floor() as usize).min(n - 1);
        let (re, im) = table.lookup(&atom.atom_type)?;
        layers[bin].real += re;
        layers[bin].imag += im;
    }

    let volume = frame.cell.area() * layer_thickness;
    for layer in &mut layers {
        layer.real /= volume;
        layer.imag /= volume;
    }

    debug!(
        time = frame.time,
        layers = n,
        skipped,
        "binned frame"
    );
    Ok(layers)
}

/// Per-layer mean and standard error over frames.
///
/// Every profile must have the same number of layers.
pub fn average_profiles(profiles: &[FrameProfile]) -> Result<AveragedProfile> {
    let first = profiles.first().ok_or(MdReflError::EmptyEnsemble)?;
    let width = first.layers.len();
    for p in profiles {
        if p.layers.len() != width {
            return Err(MdReflError::LayerCountMismatch {
                expected: width,
                found: p.layers.len(),
            });
        }
    }

    let real: Vec<Vec<f64>> = profiles
        .iter()
        .map(|p| p.layers.iter().map(|l| l.real).collect())
        .collect();
    let imag: Vec<Vec<f64>> = profiles
        .iter()
        .map(|p| p.layers.iter().map(|l| l.imag).collect())
        .collect();
    let mismatch = |found| MdReflError::LayerCountMismatch {
        expected: width,
        found,
    };
    let real = column_stats(real.iter().map(Vec::as_slice), width, mismatch)?;
    let imag = column_stats(imag.iter().map(Vec::as_slice), width, mismatch)?;

    let (layers, errors) = first
        .layers
        .iter()
        .zip(real.into_iter().zip(imag))
        .map(|(l, ((re, dre), (im, dim)))| {
            (
                SldLayer::new(l.thickness, re, im),
                SldLayer::new(l.thickness, dre, dim),
            )
        })
        .unzip();

    Ok(AveragedProfile { layers, errors })
}

impl Job {
    /// SLD profile of every selected frame, in trajectory order.
    pub fn sld_profiles(&self) -> Result<Vec<FrameProfile>> {
        let config = self.config();
        let frames: Vec<&Frame> = self.selected_frames().collect();
        info!(
            frames = frames.len(),
            layer_thickness = config.layer_thickness,
            cutoff = config.cutoff,
            "building SLD profiles"
        );

        frames
            .par_iter()
            .map(|frame| {
                frame_profile(
                    frame,
                    self.scattering_table(),
                    config.layer_thickness,
                    config.cutoff,
                )
                .map(|layers| FrameProfile {
                    time: frame.time,
                    layers,
                })
            })
            .collect()
    }
}
