//! q-point sets: experimental `.dat` files and synthetic grids.

use std::path::Path;

use mdrefl_data::QPoint;
use tracing::info;

use crate::constants::{DEFAULT_INTENSITY_ERROR_PERCENT, DEFAULT_RESOLUTION_PERCENT};
use crate::error::{MdReflError, Result};

/// Percentages used to fill columns a `.dat` file does not provide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatOptions {
    /// q-resolution as a percentage of q (used for 2 and 3 column files)
    pub resolution_percent: f64,
    /// Intensity error as a percentage of intensity (used for 2 column files)
    pub intensity_error_percent: f64,
}

impl Default for DatOptions {
    fn default() -> Self {
        DatOptions {
            resolution_percent: DEFAULT_RESOLUTION_PERCENT,
            intensity_error_percent: DEFAULT_INTENSITY_ERROR_PERCENT,
        }
    }
}

/// Ordered q-points at which reflectivity is evaluated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QSet {
    points: Vec<QPoint>,
}

impl QSet {
    pub fn new(points: Vec<QPoint>) -> Self {
        QSet { points }
    }

    /// `count` evenly spaced q values from `start` to `end` inclusive.
    pub fn linear(start: f64, end: f64, count: usize, resolution_percent: f64) -> Result<Self> {
        check_grid(start, end, count)?;
        let step = if count > 1 {
            (end - start) / (count - 1) as f64
        } else {
            0.0
        };
        Ok(Self::from_q((0..count).map(|i| start + i as f64 * step), resolution_percent))
    }

    /// `count` q values evenly spaced in log10 from `start` to `end` inclusive.
    pub fn logarithmic(start: f64, end: f64, count: usize, resolution_percent: f64) -> Result<Self> {
        check_grid(start, end, count)?;
        if start <= 0.0 {
            return Err(MdReflError::InvalidInput(format!(
                "a logarithmic q grid needs a positive start, got {start}"
            )));
        }
        let (lo, hi) = (start.log10(), end.log10());
        let step = if count > 1 {
            (hi - lo) / (count - 1) as f64
        } else {
            0.0
        };
        Ok(Self::from_q(
            (0..count).map(|i| 10f64.powf(lo + i as f64 * step)),
            resolution_percent,
        ))
    }

    fn from_q(q: impl Iterator<Item = f64>, resolution_percent: f64) -> Self {
        QSet {
            points: q
                .map(|q| QPoint {
                    q,
                    intensity: None,
                    intensity_error: None,
                    q_resolution: q * resolution_percent / 100.0,
                })
                .collect(),
        }
    }

    pub fn points(&self) -> &[QPoint] {
        &self.points
    }

    pub fn q_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.q).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// dq/q of the first point; the whole set is smeared with this ratio.
    pub fn resolution_ratio(&self) -> Option<f64> {
        self.points.first().map(|p| p.q_resolution / p.q)
    }

    /// True when every point carries a measured intensity.
    pub fn has_intensities(&self) -> bool {
        !self.points.is_empty() && self.points.iter().all(|p| p.intensity.is_some())
    }
}

fn check_grid(start: f64, end: f64, count: usize) -> Result<()> {
    if count == 0 {
        return Err(MdReflError::InvalidInput(
            "a q grid needs at least one point".to_string(),
        ));
    }
    if !(start.is_finite() && end.is_finite()) || end < start {
        return Err(MdReflError::InvalidInput(format!(
            "invalid q range {start} to {end}"
        )));
    }
    Ok(())
}

/// Parse whitespace separated `q I [dI [dq]]` columns.
///
/// Lines starting with `#` and blank lines are skipped.
pub fn parse_dat(content: &str, options: &DatOptions) -> Result<QSet> {
    let mut points = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let lineno = i + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || line.starts_with('#') {
            continue;
        }
        let values = trimmed
            .split_whitespace()
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|_| MdReflError::parse(lineno, format!("invalid number '{v}'")))
            })
            .collect::<Result<Vec<f64>>>()?;

        let point = match values[..] {
            [q, r] => QPoint {
                q,
                intensity: Some(r),
                intensity_error: Some(r * options.intensity_error_percent / 100.0),
                q_resolution: q * options.resolution_percent / 100.0,
            },
            [q, r, dr] => QPoint {
                q,
                intensity: Some(r),
                intensity_error: Some(dr),
                q_resolution: q * options.resolution_percent / 100.0,
            },
            [q, r, dr, dq] => QPoint {
                q,
                intensity: Some(r),
                intensity_error: Some(dr),
                q_resolution: dq,
            },
            _ => {
                return Err(MdReflError::parse(
                    lineno,
                    format!("expected 2 to 4 columns, found {}", values.len()),
                ));
            }
        };
        points.push(point);
    }
    Ok(QSet::new(points))
}

pub fn read_dat(path: &Path, options: &DatOptions) -> Result<QSet> {
    let content = std::fs::read_to_string(path).map_err(|e| MdReflError::io(path, e))?;
    let qset = parse_dat(&content, options).map_err(|e| e.in_file(path))?;
    info!(path = %path.display(), points = qset.len(), "read experimental data");
    Ok(qset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_two_column_defaults() {
        let qs = parse_dat("# q R\n0.1 1e-3\n0.2 2e-4\n", &DatOptions::default()).unwrap();
        assert_eq!(qs.len(), 2);
        let p = qs.points()[0];
        assert_eq!(p.intensity, Some(1e-3));
        assert_relative_eq!(p.intensity_error.unwrap(), 5e-5);
        assert_relative_eq!(p.q_resolution, 0.005);
    }

    #[test]
    fn test_three_and_four_columns() {
        let opts = DatOptions {
            resolution_percent: 3.0,
            intensity_error_percent: 10.0,
        };
        let qs = parse_dat("0.1 1e-3 4e-5\n0.2 2e-4 1e-5 0.01\n", &opts).unwrap();
        assert_eq!(qs.points()[0].intensity_error, Some(4e-5));
        assert_relative_eq!(qs.points()[0].q_resolution, 0.003);
        assert_eq!(qs.points()[1].q_resolution, 0.01);
        assert!(qs.has_intensities());
    }

    #[test]
    fn test_bad_column_count() {
        let err = parse_dat("0.1\n", &DatOptions::default()).unwrap_err();
        assert!(matches!(err, MdReflError::Parse { line: 1, .. }));
        let err = parse_dat("0.1 2 3 4 5\n", &DatOptions::default()).unwrap_err();
        assert!(matches!(err, MdReflError::Parse { .. }));
    }

    #[test]
    fn test_linear_grid() {
        let qs = QSet::linear(0.005, 0.5, 50, 5.0).unwrap();
        assert_eq!(qs.len(), 50);
        assert_relative_eq!(qs.points()[0].q, 0.005);
        assert_relative_eq!(qs.points()[49].q, 0.5, max_relative = 1e-12);
        assert_relative_eq!(qs.resolution_ratio().unwrap(), 0.05, max_relative = 1e-12);
        assert!(!qs.has_intensities());
    }

    #[test]
    fn test_log_grid() {
        let qs = QSet::logarithmic(0.001, 0.1, 3, 5.0).unwrap();
        let q = qs.q_values();
        assert_relative_eq!(q[1], 0.01, max_relative = 1e-12);
        assert!(QSet::logarithmic(0.0, 0.1, 3, 5.0).is_err());
        assert!(QSet::linear(0.1, 0.01, 3, 5.0).is_err());
        assert!(QSet::linear(0.0, 0.1, 0, 5.0).is_err());
    }
}
