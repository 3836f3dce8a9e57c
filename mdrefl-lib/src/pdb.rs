//! Multi-frame PDB trajectories.
//!
//! Only the records the analysis needs are read: `TITLE` starts a frame and
//! carries its time as the last token, `CRYST1` gives the orthorhombic box,
//! and `ATOM`/`HETATM` give the atom name (columns 13-16) and z (47-54).

use std::path::Path;

use mdrefl_data::{AtomSample, CellDimensions, Frame, Trajectory};
use tracing::info;

use crate::error::{MdReflError, Result};

#[derive(Default)]
struct FrameBuilder {
    time: f64,
    cell: Option<CellDimensions>,
    atoms: Vec<AtomSample>,
    started_at: usize,
}

impl FrameBuilder {
    fn finish(self) -> Result<Option<Frame>> {
        match self.cell {
            Some(cell) => Ok(Some(Frame {
                time: self.time,
                cell,
                atoms: self.atoms,
            })),
            None if self.atoms.is_empty() => Ok(None),
            None => Err(MdReflError::parse(
                self.started_at,
                "frame has atoms but no CRYST1 record",
            )),
        }
    }
}

fn column<'a>(line: &'a str, lineno: usize, start: usize, end: usize) -> Result<&'a str> {
    let end = end.min(line.len());
    line.get(start..end)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            MdReflError::parse(lineno, format!("missing field in columns {}-{}", start + 1, end))
        })
}

fn float_column(line: &str, lineno: usize, start: usize, end: usize) -> Result<f64> {
    let field = column(line, lineno, start, end)?;
    field
        .parse()
        .map_err(|_| MdReflError::parse(lineno, format!("invalid number '{field}'")))
}

/// Parse PDB text into frames.
///
/// With `flip`, depths are mirrored through the cell: `z' = |cell_z - z|`.
pub fn parse_pdb(content: &str, flip: bool) -> Result<Trajectory> {
    let mut frames = Vec::new();
    let mut current = FrameBuilder::default();
    let mut seen_title = false;

    for (i, line) in content.lines().enumerate() {
        let lineno = i + 1;
        if line.starts_with("TITLE") {
            if seen_title || !current.atoms.is_empty() {
                let done = std::mem::take(&mut current);
                frames.extend(done.finish()?);
            }
            seen_title = true;
            let token = line.split_whitespace().last().unwrap_or_default();
            current.time = token
                .parse()
                .map_err(|_| MdReflError::parse(lineno, format!("invalid time '{token}'")))?;
            current.started_at = lineno;
        } else if line.starts_with("CRYST1") {
            current.cell = Some(CellDimensions {
                x: float_column(line, lineno, 6, 15)?,
                y: float_column(line, lineno, 15, 24)?,
                z: float_column(line, lineno, 24, 33)?,
            });
        } else if line.starts_with("ATOM  ") || line.starts_with("HETATM") {
            let atom_type = column(line, lineno, 12, 16)?.to_string();
            let z = float_column(line, lineno, 46, 54)?;
            let depth = if flip {
                let cell = current.cell.ok_or_else(|| {
                    MdReflError::parse(lineno, "cannot flip an atom before the CRYST1 record")
                })?;
                (cell.z - z).abs()
            } else {
                z
            };
            if current.atoms.is_empty() && current.started_at == 0 {
                current.started_at = lineno;
            }
            current.atoms.push(AtomSample { atom_type, depth });
        }
    }
    frames.extend(current.finish()?);

    if !seen_title {
        // Untitled single-frame files are labelled by frame index.
        for (i, frame) in frames.iter_mut().enumerate() {
            frame.time = i as f64;
        }
    }
    Ok(Trajectory { frames })
}

pub fn read_pdb(path: &Path, flip: bool) -> Result<Trajectory> {
    let content = std::fs::read_to_string(path).map_err(|e| MdReflError::io(path, e))?;
    let trajectory = parse_pdb(&content, flip).map_err(|e| e.in_file(path))?;
    info!(
        path = %path.display(),
        frames = trajectory.frames.len(),
        "read trajectory"
    );
    Ok(trajectory)
}
