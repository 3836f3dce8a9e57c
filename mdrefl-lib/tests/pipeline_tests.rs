use approx::assert_relative_eq;
use mdrefl::mdrefl_data::{AtomSample, CellDimensions, Frame, QPoint, Trajectory};
use mdrefl::{
    Comparison, Job, JobConfig, QSet, ScatteringTable, TimeSelection, average_profiles,
    frame_profile,
};

fn water_slab(time: f64, shift: f64) -> Frame {
    // Oxygen spread over the lower half of the box, deuterium over the same range.
    let mut atoms = Vec::new();
    for i in 0..200 {
        let depth = 0.1 + (i as f64) * 0.1 + shift;
        atoms.push(AtomSample {
            atom_type: "OW".to_string(),
            depth,
        });
        atoms.push(AtomSample {
            atom_type: "DW".to_string(),
            depth: depth + 0.05,
        });
    }
    Frame {
        time,
        cell: CellDimensions {
            x: 5.0,
            y: 5.0,
            z: 50.0,
        },
        atoms,
    }
}

fn table() -> ScatteringTable {
    let mut t = ScatteringTable::new();
    t.insert_table_units("OW", 5.803, 0.0);
    t.insert_table_units("DW", 6.671, 0.0);
    t
}

fn trajectory() -> Trajectory {
    Trajectory {
        frames: (0..4)
            .map(|i| water_slab(i as f64 * 100.0, i as f64 * 0.02))
            .collect(),
    }
}

#[test]
fn test_empty_frame_profile_is_zero() {
    let frame = Frame {
        time: 0.0,
        cell: CellDimensions {
            x: 3.0,
            y: 4.0,
            z: 12.0,
        },
        atoms: vec![],
    };
    for dz in [0.25, 1.0, 3.3] {
        let layers = frame_profile(&frame, &table(), dz, 0.0).unwrap();
        assert!(!layers.is_empty());
        assert!(layers.iter().all(|l| l.real == 0.0 && l.imag == 0.0));
    }
}

#[test]
fn test_profile_thickness_matches_cutoff() {
    let frame = water_slab(0.0, 0.0);
    let layers = frame_profile(&frame, &table(), 0.7, 3.0).unwrap();
    let total: f64 = layers.iter().map(|l| l.thickness).sum();
    let expected = ((50.0_f64 - 3.0) / 0.7).floor() * 0.7;
    assert_relative_eq!(total, expected, max_relative = 1e-12);

    // Every atom lies below 21 Å, so the full scattering length is retained.
    let volume = 5.0 * 5.0 * 0.7;
    let sum: f64 = layers.iter().map(|l| l.real * volume).sum();
    assert_relative_eq!(sum, 200.0 * (5.803e-5 + 6.671e-5), max_relative = 1e-10);
}

#[test]
fn test_cutoff_past_cell_gives_empty_profile() {
    let layers = frame_profile(&water_slab(0.0, 0.0), &table(), 1.0, 60.0).unwrap();
    assert!(layers.is_empty());
}

#[test]
fn test_full_run() {
    let config = JobConfig {
        layer_thickness: 1.0,
        cutoff: 10.0,
        times: TimeSelection::Range {
            start: 0.0,
            stop: 200.0,
            step: 100.0,
        },
        ..JobConfig::default()
    };
    let job = Job::new(trajectory(), table(), config).unwrap();
    let qs = QSet::linear(0.005, 0.5, 50, 5.0).unwrap();
    let out = job.run(&qs).unwrap();

    assert_eq!(out.profiles.len(), 3);
    assert_eq!(
        out.profiles.iter().map(|p| p.time).collect::<Vec<_>>(),
        vec![0.0, 100.0, 200.0]
    );
    assert_eq!(out.averaged_profile.layers.len(), 40);
    assert_eq!(out.averaged_profile, average_profiles(&out.profiles).unwrap());
    assert_eq!(out.curves.len(), 3);
    assert_eq!(out.averaged.points.len(), 50);
    for p in &out.averaged.points {
        assert!(p.intensity >= 0.0 && p.intensity.is_finite());
        assert!(p.intensity_error >= 0.0);
    }
    // A bulk-water slab reflects strongly below its critical edge.
    assert!(out.averaged.points[0].intensity > out.averaged.points[49].intensity);
}

#[test]
fn test_fit_recovers_scale_and_background() {
    let job = Job::new(trajectory(), table(), JobConfig::default()).unwrap();
    let grid = QSet::logarithmic(0.01, 0.3, 40, 5.0).unwrap();
    let sim = job.run(&grid).unwrap().averaged;

    let (scale, background) = (0.8, 2e-5);
    let exp = QSet::new(
        sim.points
            .iter()
            .map(|p| {
                let intensity = p.intensity * scale + background;
                QPoint {
                    q: p.q,
                    intensity: Some(intensity),
                    intensity_error: Some(0.05 * intensity),
                    q_resolution: p.q_resolution,
                }
            })
            .collect(),
    );

    let mut cmp = Comparison::new(&exp, &sim, 1.0, 0.0).unwrap();
    let fit = cmp.fit().unwrap();
    assert_relative_eq!(fit.scale, scale, max_relative = 1e-3);
    assert_relative_eq!(fit.background, background, max_relative = 1e-2);
    assert!(fit.chi_squared < 1e-6, "chi2 = {}", fit.chi_squared);

    let fitted = cmp.fitted();
    for (f, e) in fitted.points.iter().zip(exp.points()) {
        assert_relative_eq!(f.intensity, e.intensity.unwrap(), max_relative = 1e-3);
    }
}
