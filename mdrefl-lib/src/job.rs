//! A trajectory, its scattering lengths and the analysis parameters, bundled
//! for the profile and reflectivity stages.

use std::collections::HashSet;

use mdrefl_data::{Frame, Trajectory};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::JobConfig;
use crate::error::{MdReflError, Result};
use crate::qdata::QSet;
use crate::reflect::{AveragedReflectivity, ReflectivityCurve, average_ref, calc_ref};
use crate::scatlen::ScatteringTable;
use crate::sld::{AveragedProfile, FrameProfile, average_profiles};

#[derive(Debug, Clone)]
pub struct Job {
    trajectory: Trajectory,
    scattering: ScatteringTable,
    config: JobConfig,
}

/// Everything one pass over the trajectory produces.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutput {
    pub profiles: Vec<FrameProfile>,
    pub averaged_profile: AveragedProfile,
    pub curves: Vec<ReflectivityCurve>,
    pub averaged: AveragedReflectivity,
}

impl Job {
    /// Validate the parameters and check that every atom type in the
    /// trajectory has a scattering length.
    pub fn new(trajectory: Trajectory, scattering: ScatteringTable, config: JobConfig) -> Result<Self> {
        config.validate()?;
        scattering.ensure_covers(&trajectory)?;
        Ok(Job {
            trajectory,
            scattering,
            config,
        })
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn scattering_table(&self) -> &ScatteringTable {
        &self.scattering
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Frames whose timestep is part of the configured selection.
    pub fn selected_frames(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.trajectory
            .frames
            .iter()
            .filter(|f| self.config.times.contains(f.time))
    }

    /// Number of requested timesteps that no frame carries.
    pub fn unmatched_count(&self) -> usize {
        let Some(requested) = self.config.times.count() else {
            return 0;
        };
        let matched: HashSet<usize> = self
            .trajectory
            .frames
            .iter()
            .filter_map(|f| self.config.times.position(f.time))
            .collect();
        requested - matched.len()
    }

    pub fn reflectivity(&self, profiles: &[FrameProfile], qset: &QSet) -> Result<Vec<ReflectivityCurve>> {
        calc_ref(profiles, qset)
    }

    /// Profiles, per-frame reflectivity and both averages in one go.
    pub fn run(&self, qset: &QSet) -> Result<JobOutput> {
        let missing = self.unmatched_count();
        if missing > 0 {
            warn!(missing, "requested times with no matching frame");
        }

        let profiles = self.sld_profiles()?;
        if profiles.is_empty() {
            return Err(MdReflError::EmptyEnsemble);
        }
        let averaged_profile = average_profiles(&profiles)?;
        let curves = self.reflectivity(&profiles, qset)?;
        let averaged = average_ref(&curves, qset)?;

        info!(
            frames = profiles.len(),
            layers = averaged_profile.layers.len(),
            q_points = averaged.points.len(),
            "analysis complete"
        );
        Ok(JobOutput {
            profiles,
            averaged_profile,
            curves,
            averaged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeSelection;
    use mdrefl_data::{AtomSample, CellDimensions};

    fn trajectory() -> Trajectory {
        let frame = |time: f64, depth: f64| Frame {
            time,
            cell: CellDimensions {
                x: 10.0,
                y: 10.0,
                z: 20.0,
            },
            atoms: vec![
                AtomSample {
                    atom_type: "B".to_string(),
                    depth,
                },
                AtomSample {
                    atom_type: "B".to_string(),
                    depth: depth + 1.0,
                },
            ],
        };
        Trajectory {
            frames: vec![frame(0.0, 5.0), frame(10.0, 6.0), frame(20.0, 7.0)],
        }
    }

    fn table() -> ScatteringTable {
        let mut t = ScatteringTable::new();
        t.insert_table_units("B", 5.30, 0.213);
        t
    }

    #[test]
    fn test_missing_atom_type_rejected() {
        let err = Job::new(trajectory(), ScatteringTable::new(), JobConfig::default()).unwrap_err();
        assert!(matches!(err, MdReflError::MissingScatteringLength(t) if t == "B"));
    }

    #[test]
    fn test_time_selection_filters_frames() {
        let config = JobConfig {
            times: TimeSelection::Range {
                start: 10.0,
                stop: 30.0,
                step: 10.0,
            },
            ..JobConfig::default()
        };
        let job = Job::new(trajectory(), table(), config).unwrap();
        let times: Vec<f64> = job.selected_frames().map(|f| f.time).collect();
        assert_eq!(times, vec![10.0, 20.0]);
        assert_eq!(job.unmatched_count(), 1);
    }

    #[test]
    fn test_unmatched_count_over_dense_range() {
        let config = JobConfig {
            times: TimeSelection::Range {
                start: 0.0,
                stop: 1_000_000.0,
                step: 1.0,
            },
            ..JobConfig::default()
        };
        let job = Job::new(trajectory(), table(), config).unwrap();
        assert_eq!(job.selected_frames().count(), 3);
        assert_eq!(job.unmatched_count(), 1_000_001 - 3);
    }

    #[test]
    fn test_repeated_frame_time_counts_once() {
        let mut traj = trajectory();
        traj.frames[1].time = 0.0;
        let config = JobConfig {
            times: TimeSelection::List(vec![0.0, 20.0, 40.0]),
            ..JobConfig::default()
        };
        let job = Job::new(traj, table(), config).unwrap();
        assert_eq!(job.unmatched_count(), 1);
    }

    #[test]
    fn test_run_produces_consistent_shapes() {
        let job = Job::new(trajectory(), table(), JobConfig::default()).unwrap();
        let qset = QSet::linear(0.01, 0.3, 12, 5.0).unwrap();
        let out = job.run(&qset).unwrap();
        assert_eq!(out.profiles.len(), 3);
        assert_eq!(out.averaged_profile.layers.len(), 20);
        assert_eq!(out.curves.len(), 3);
        assert_eq!(out.averaged.points.len(), 12);
        assert!(out.averaged.points.iter().all(|p| p.intensity >= 0.0));
    }

    #[test]
    fn test_empty_selection_is_an_error() {
        let config = JobConfig {
            times: TimeSelection::List(vec![99.0]),
            ..JobConfig::default()
        };
        let job = Job::new(trajectory(), table(), config).unwrap();
        let qset = QSet::linear(0.01, 0.3, 5, 5.0).unwrap();
        assert!(matches!(job.run(&qset), Err(MdReflError::EmptyEnsemble)));
    }
}
