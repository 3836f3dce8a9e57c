#![no_std]

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

/// Current layout version of [`TrajectorySnapshot`].
pub const SNAPSHOT_FORMAT_VERSION: u16 = 1;

/// A parsed trajectory stored as a compact binary blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySnapshot {
    pub format_version: u16,
    /// Name of the file the trajectory was parsed from.
    pub source: String,
    pub trajectory: Trajectory,
}

/// All frames of a trajectory, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub frames: Vec<Frame>,
}

impl Trajectory {
    pub fn times(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.time).collect()
    }

    /// Distinct atom type labels over every frame, sorted.
    pub fn atom_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .frames
            .iter()
            .flat_map(|f| f.atoms.iter().map(|a| a.atom_type.as_str()))
            .collect();
        types.sort_unstable();
        types.dedup();
        types
    }
}

/// One simulation timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub time: f64,
    pub cell: CellDimensions,
    pub atoms: Vec<AtomSample>,
}

/// Orthorhombic box lengths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellDimensions {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CellDimensions {
    /// Cross-sectional area normal to the depth axis.
    pub fn area(&self) -> f64 {
        self.x * self.y
    }
}

/// Atom type and position along the surface normal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomSample {
    pub atom_type: String,
    pub depth: f64,
}

/// Scattering length of one atom type, already multiplied by the table unit
/// scale (table values are 1e5 larger).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatteringLength {
    pub atom_type: String,
    pub real: f64,
    pub imag: f64,
}

/// Scattering length density of one depth slab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SldLayer {
    pub thickness: f64,
    pub real: f64,
    pub imag: f64,
}

impl SldLayer {
    pub fn new(thickness: f64, real: f64, imag: f64) -> Self {
        SldLayer {
            thickness,
            real,
            imag,
        }
    }
}

/// A momentum-transfer point, optionally carrying measured intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QPoint {
    /// Momentum transfer (Å⁻¹)
    pub q: f64,
    pub intensity: Option<f64>,
    pub intensity_error: Option<f64>,
    /// Resolution width (Å⁻¹)
    pub q_resolution: f64,
}
