//! Compressed binary trajectory snapshots.
//!
//! A snapshot is a postcard-serialized [`TrajectorySnapshot`] wrapped in a
//! zstd frame. Writing lives in the command-line tool; the library only
//! decodes.

use std::io::Read;
use std::path::Path;

use mdrefl_data::{SNAPSHOT_FORMAT_VERSION, Trajectory, TrajectorySnapshot};
use tracing::info;

use crate::error::{MdReflError, Result};

/// Decompress and deserialize a snapshot blob.
pub fn decode_snapshot(compressed: &[u8]) -> Result<TrajectorySnapshot> {
    let mut decoder = ruzstd::decoding::StreamingDecoder::new(compressed)
        .map_err(|e| MdReflError::Snapshot(format!("failed to create zstd decoder: {e}")))?;
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| MdReflError::Snapshot(format!("failed to decompress: {e}")))?;

    let snapshot: TrajectorySnapshot = postcard::from_bytes(&decompressed)
        .map_err(|e| MdReflError::Snapshot(format!("failed to deserialize: {e}")))?;

    if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(MdReflError::Snapshot(format!(
            "unsupported snapshot version {} (expected {})",
            snapshot.format_version, SNAPSHOT_FORMAT_VERSION
        )));
    }
    Ok(snapshot)
}

pub fn read_snapshot(path: &Path) -> Result<Trajectory> {
    let bytes = std::fs::read(path).map_err(|e| MdReflError::io(path, e))?;
    let snapshot = decode_snapshot(&bytes)?;
    info!(
        path = %path.display(),
        source = %snapshot.source,
        frames = snapshot.trajectory.frames.len(),
        "read trajectory snapshot"
    );
    Ok(snapshot.trajectory)
}
