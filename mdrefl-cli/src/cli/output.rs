use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use mdrefl::{AveragedProfile, AveragedReflectivity, FitResult, JobConfig};
use serde::Serialize;

pub(super) const SLD_FILE: &str = "sld_profile.dat";
pub(super) const REFLECTIVITY_FILE: &str = "reflectivity.dat";
pub(super) const FITTED_FILE: &str = "fitted.dat";
pub(super) const SUMMARY_FILE: &str = "summary.json";

fn write_columns<I>(path: &Path, header: &str, rows: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = Vec<f64>>,
{
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "# {header}")?;
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| format!("{v:.8e}")).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    out.flush()
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Depth is the far edge of each layer.
pub(super) fn write_profile(path: &Path, profile: &AveragedProfile) -> anyhow::Result<()> {
    write_columns(
        path,
        "depth real real_err imag imag_err",
        profile
            .depths()
            .into_iter()
            .zip(profile.layers.iter().zip(&profile.errors))
            .map(|(z, (l, e))| vec![z, l.real, e.real, l.imag, e.imag]),
    )
}

pub(super) fn write_reflectivity(path: &Path, curve: &AveragedReflectivity) -> anyhow::Result<()> {
    write_columns(
        path,
        "q R dR dq",
        curve
            .points
            .iter()
            .map(|p| vec![p.q, p.intensity, p.intensity_error, p.q_resolution]),
    )
}

#[derive(Serialize)]
pub(super) struct Summary<'a> {
    pub(super) trajectory: String,
    pub(super) scattering_lengths: String,
    pub(super) frame_times: Vec<f64>,
    pub(super) layers: usize,
    pub(super) q_points: usize,
    pub(super) config: &'a JobConfig,
    pub(super) fit: Option<FitResult>,
    pub(super) files: Vec<&'static str>,
}

pub(super) fn write_summary(path: &Path, summary: &Summary<'_>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary).context("failed to encode summary")?;
    std::fs::write(path, json + "\n").with_context(|| format!("failed to write {}", path.display()))
}
