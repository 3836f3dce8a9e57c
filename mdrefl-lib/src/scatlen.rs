use std::collections::HashMap;

use mdrefl_data::{ScatteringLength, Trajectory};

use crate::constants::SCATTERING_LENGTH_SCALE;
use crate::error::{MdReflError, Result};

/// Scattering lengths keyed by atom type.
///
/// Insertion order is remembered so that a table written back to disk keeps
/// the layout it was read with.
#[derive(Debug, Clone, Default)]
pub struct ScatteringTable {
    entries: Vec<ScatteringLength>,
    index: HashMap<String, usize>,
}

impl ScatteringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry given in table units (1e5 larger than the internal scale).
    ///
    /// Returns `false` and leaves the table untouched if the atom type is
    /// already present.
    pub fn insert_table_units(&mut self, atom_type: &str, real: f64, imag: f64) -> bool {
        self.insert(ScatteringLength {
            atom_type: atom_type.to_string(),
            real: real * SCATTERING_LENGTH_SCALE,
            imag: imag * SCATTERING_LENGTH_SCALE,
        })
    }

    /// Add an already scaled entry. Duplicates are ignored, the first one wins.
    pub fn insert(&mut self, entry: ScatteringLength) -> bool {
        if self.index.contains_key(&entry.atom_type) {
            return false;
        }
        self.index.insert(entry.atom_type.clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn get(&self, atom_type: &str) -> Option<&ScatteringLength> {
        self.index.get(atom_type).map(|&i| &self.entries[i])
    }

    /// Scaled (real, imag) scattering length of an atom type.
    pub fn lookup(&self, atom_type: &str) -> Result<(f64, f64)> {
        self.get(atom_type)
            .map(|s| (s.real, s.imag))
            .ok_or_else(|| MdReflError::MissingScatteringLength(atom_type.to_string()))
    }

    pub fn contains(&self, atom_type: &str) -> bool {
        self.index.contains_key(atom_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScatteringLength> {
        self.entries.iter()
    }

    /// Atom types present in the trajectory but absent from the table, sorted.
    pub fn missing_types<'a>(&self, trajectory: &'a Trajectory) -> Vec<&'a str> {
        trajectory
            .atom_types()
            .into_iter()
            .filter(|t| !self.contains(t))
            .collect()
    }

    /// Fail on the first atom type the table cannot resolve.
    pub fn ensure_covers(&self, trajectory: &Trajectory) -> Result<()> {
        match self.missing_types(trajectory).first() {
            Some(t) => Err(MdReflError::MissingScatteringLength(t.to_string())),
            None => Ok(()),
        }
    }
}

impl FromIterator<ScatteringLength> for ScatteringTable {
    fn from_iter<I: IntoIterator<Item = ScatteringLength>>(iter: I) -> Self {
        let mut table = ScatteringTable::new();
        for entry in iter {
            table.insert(entry);
        }
        table
    }
}
