//! Analysis parameters.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_INTENSITY_ERROR_PERCENT, DEFAULT_RESOLUTION_PERCENT, TIME_MATCH_TOLERANCE,
};
use crate::error::{MdReflError, Result};

/// Which trajectory frames take part in the analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSelection {
    #[default]
    All,
    /// `start, start + step, ...` up to and including `stop`.
    Range { start: f64, stop: f64, step: f64 },
    List(Vec<f64>),
}

impl TimeSelection {
    /// Number of requested timesteps. `All` has no fixed count.
    pub fn count(&self) -> Option<usize> {
        match self {
            Self::All => None,
            Self::Range { start, stop, step } => {
                if !(step.is_finite() && *step > 0.0) {
                    return Some(1);
                }
                if *start > stop + step * TIME_MATCH_TOLERANCE {
                    return Some(0);
                }
                Some(((stop - start) / step + TIME_MATCH_TOLERANCE).floor() as usize + 1)
            }
            Self::List(times) => Some(times.len()),
        }
    }

    /// Expand the selection into explicit timesteps. `All` has no explicit form.
    pub fn times(&self) -> Option<Vec<f64>> {
        match self {
            Self::All => None,
            Self::Range { start, step, .. } => {
                let n = self.count().unwrap_or_default();
                Some((0..n).map(|k| start + k as f64 * step).collect())
            }
            Self::List(times) => Some(times.clone()),
        }
    }

    /// Index of `time` among the requested timesteps, if it was requested.
    /// Always `None` for `All`.
    pub fn position(&self, time: f64) -> Option<usize> {
        match self {
            Self::All => None,
            Self::Range { start, step, .. } => {
                if !(step.is_finite() && *step > 0.0) {
                    return same_time(*start, time).then_some(0);
                }
                let k = ((time - start) / step).round();
                if k < 0.0 || k >= self.count().unwrap_or_default() as f64 {
                    return None;
                }
                same_time(start + k * step, time).then_some(k as usize)
            }
            Self::List(times) => times.iter().position(|&t| same_time(t, time)),
        }
    }

    pub fn contains(&self, time: f64) -> bool {
        matches!(self, Self::All) || self.position(time).is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if let Self::Range { start, stop, step } = self {
            if !(step.is_finite() && *step > 0.0) {
                return Err(MdReflError::InvalidInput(format!(
                    "time interval must be positive, got {step}"
                )));
            }
            if stop < start {
                return Err(MdReflError::InvalidInput(format!(
                    "last time {stop} precedes first time {start}"
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn same_time(a: f64, b: f64) -> bool {
    (a - b).abs() <= TIME_MATCH_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Parameters of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Thickness of each depth slab (Å).
    pub layer_thickness: f64,
    /// Length at the far end of the cell left out of the profile (Å).
    pub cutoff: f64,
    pub times: TimeSelection,
    /// q-resolution as a percentage of q, used when the data has no dq column.
    pub resolution_percent: f64,
    /// Intensity error as a percentage of intensity, used when the data has no dI column.
    pub intensity_error_percent: f64,
    /// Mirror depths through the cell at parse time.
    pub flip: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            layer_thickness: 1.0,
            cutoff: 0.0,
            times: TimeSelection::All,
            resolution_percent: DEFAULT_RESOLUTION_PERCENT,
            intensity_error_percent: DEFAULT_INTENSITY_ERROR_PERCENT,
            flip: false,
        }
    }
}

impl JobConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.layer_thickness.is_finite() && self.layer_thickness > 0.0) {
            return Err(MdReflError::InvalidInput(format!(
                "layer thickness must be positive, got {}",
                self.layer_thickness
            )));
        }
        if !(self.cutoff.is_finite() && self.cutoff >= 0.0) {
            return Err(MdReflError::InvalidInput(format!(
                "cutoff must be non-negative, got {}",
                self.cutoff
            )));
        }
        if self.resolution_percent < 0.0 || self.intensity_error_percent < 0.0 {
            return Err(MdReflError::InvalidInput(
                "percentages must be non-negative".to_string(),
            ));
        }
        self.times.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_expansion() {
        let sel = TimeSelection::Range {
            start: 0.0,
            stop: 20000.0,
            step: 10000.0,
        };
        assert_eq!(sel.times().unwrap(), vec![0.0, 10000.0, 20000.0]);
        assert!(sel.contains(10000.0));
        assert!(!sel.contains(30000.0));
        assert!(!sel.contains(5000.0));
    }

    #[test]
    fn test_fractional_range_matches() {
        let sel = TimeSelection::Range {
            start: 0.1,
            stop: 0.3,
            step: 0.1,
        };
        assert!(sel.contains(0.3));
        assert_eq!(sel.times().unwrap().len(), 3);
    }

    #[test]
    fn test_dense_range_matches_by_index() {
        let sel = TimeSelection::Range {
            start: 0.0,
            stop: 1_000_000.0,
            step: 1.0,
        };
        assert_eq!(sel.count(), Some(1_000_001));
        assert_eq!(sel.position(0.0), Some(0));
        assert_eq!(sel.position(2000.0), Some(2000));
        assert_eq!(sel.position(1_000_000.0), Some(1_000_000));
        assert_eq!(sel.position(1_000_001.0), None);
        assert_eq!(sel.position(-1.0), None);
        assert!(!sel.contains(2000.5));
    }

    #[test]
    fn test_count_agrees_with_times() {
        let sel = TimeSelection::Range {
            start: 0.1,
            stop: 0.7,
            step: 0.2,
        };
        assert_eq!(sel.count(), Some(4));
        assert_eq!(sel.times().unwrap().len(), 4);
        let empty = TimeSelection::Range {
            start: 5.0,
            stop: 1.0,
            step: 1.0,
        };
        assert_eq!(empty.count(), Some(0));
        assert!(!empty.contains(5.0));
    }

    #[test]
    fn test_all_contains_everything() {
        assert!(TimeSelection::All.contains(123.0));
        assert!(TimeSelection::All.times().is_none());
    }

    #[test]
    fn test_validate() {
        assert!(JobConfig::default().validate().is_ok());
        let bad = JobConfig {
            layer_thickness: 0.0,
            ..JobConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = JobConfig {
            cutoff: -1.0,
            ..JobConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = JobConfig {
            times: TimeSelection::Range {
                start: 0.0,
                stop: 10.0,
                step: 0.0,
            },
            ..JobConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let cfg: JobConfig = serde_json::from_str(
            r#"{ "layer_thickness": 2.0, "times": { "range": { "start": 0, "stop": 10, "step": 5 } } }"#,
        )
        .unwrap();
        assert_eq!(cfg.layer_thickness, 2.0);
        assert_eq!(cfg.cutoff, 0.0);
        assert_eq!(cfg.resolution_percent, DEFAULT_RESOLUTION_PERCENT);
        assert_eq!(cfg.times.times().unwrap(), vec![0.0, 5.0, 10.0]);
    }
}
