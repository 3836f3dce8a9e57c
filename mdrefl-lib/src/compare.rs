//! Scale and background fitting of simulated against measured reflectivity.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{MdReflError, Result};
use crate::qdata::QSet;
use crate::reflect::{AveragedPoint, AveragedReflectivity};

/// Allowed range of the scale factor.
pub const SCALE_BOUNDS: (f64, f64) = (1e-6, 10.0);

/// Allowed range of the uniform background.
pub const BACKGROUND_BOUNDS: (f64, f64) = (0.0, 1e-3);

const MAX_ITERATIONS: usize = 500;
const TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitResult {
    pub scale: f64,
    pub background: f64,
    /// Weighted sum of squared log residuals at the solution.
    pub chi_squared: f64,
    pub iterations: usize,
}

/// Simulated curve paired with the experimental data it was computed for.
#[derive(Debug, Clone)]
pub struct Comparison<'a> {
    experiment: &'a QSet,
    simulation: &'a AveragedReflectivity,
    pub scale: f64,
    pub background: f64,
}

impl<'a> Comparison<'a> {
    pub fn new(
        experiment: &'a QSet,
        simulation: &'a AveragedReflectivity,
        scale: f64,
        background: f64,
    ) -> Result<Self> {
        if experiment.is_empty() {
            return Err(MdReflError::NoQPoints);
        }
        if experiment.len() != simulation.points.len() {
            return Err(MdReflError::CurveLengthMismatch {
                expected: experiment.len(),
                found: simulation.points.len(),
            });
        }
        Ok(Comparison {
            experiment,
            simulation,
            scale,
            background,
        })
    }

    /// Fit scale and background by least squares on `ln(scale * R + background)`.
    ///
    /// Residuals are weighted by `dI / (I ln 10)`; both parameters stay
    /// inside [`SCALE_BOUNDS`] and [`BACKGROUND_BOUNDS`]. On success the fitted
    /// values replace `scale` and `background`.
    pub fn fit(&mut self) -> Result<FitResult> {
        if !self.experiment.has_intensities() {
            return Err(MdReflError::NoExperimentalIntensity);
        }

        let mut data = Vec::with_capacity(self.experiment.len());
        for (p, sim) in self.experiment.points().iter().zip(&self.simulation.points) {
            let (intensity, error) = match (p.intensity, p.intensity_error) {
                (Some(i), Some(e)) => (i, e),
                (Some(i), None) => (i, 0.0),
                _ => return Err(MdReflError::NoExperimentalIntensity),
            };
            if intensity <= 0.0 {
                return Err(MdReflError::FitFailed(format!(
                    "non-positive experimental intensity {intensity} at q = {}",
                    p.q
                )));
            }
            let sigma = error / (intensity * std::f64::consts::LN_10);
            data.push(Observation {
                sim: sim.intensity,
                log_exp: intensity.ln(),
                weight: if sigma > 0.0 { 1.0 / sigma } else { 1.0 },
            });
        }

        let result = levenberg_marquardt(&data)?;
        info!(
            scale = result.scale,
            background = result.background,
            chi_squared = result.chi_squared,
            iterations = result.iterations,
            "fitted scale and background"
        );
        self.scale = result.scale;
        self.background = result.background;
        Ok(result)
    }

    /// The simulated curve with the current scale and background applied.
    pub fn fitted(&self) -> AveragedReflectivity {
        AveragedReflectivity {
            points: self
                .simulation
                .points
                .iter()
                .map(|p| AveragedPoint {
                    q: p.q,
                    intensity: p.intensity * self.scale + self.background,
                    intensity_error: p.intensity_error * self.scale,
                    q_resolution: p.q_resolution,
                })
                .collect(),
        }
    }
}

struct Observation {
    sim: f64,
    log_exp: f64,
    weight: f64,
}

fn clamp_params(p: [f64; 2]) -> [f64; 2] {
    [
        p[0].clamp(SCALE_BOUNDS.0, SCALE_BOUNDS.1),
        p[1].clamp(BACKGROUND_BOUNDS.0, BACKGROUND_BOUNDS.1),
    ]
}

fn cost(data: &[Observation], p: [f64; 2]) -> Option<f64> {
    let mut total = 0.0;
    for o in data {
        let model = p[0] * o.sim + p[1];
        if model <= 0.0 {
            return None;
        }
        let r = (model.ln() - o.log_exp) * o.weight;
        total += r * r;
    }
    Some(total)
}

/// Bounded Levenberg-Marquardt over (scale, background), starting from the
/// midpoint of the bounds. Steps are projected back into the box.
fn levenberg_marquardt(data: &[Observation]) -> Result<FitResult> {
    let mut p = [
        0.5 * (SCALE_BOUNDS.0 + SCALE_BOUNDS.1),
        0.5 * (BACKGROUND_BOUNDS.0 + BACKGROUND_BOUNDS.1),
    ];
    let mut current = cost(data, p).ok_or_else(|| {
        MdReflError::FitFailed("model is non-positive at the starting point".to_string())
    })?;
    let mut lambda = 1e-3;
    let mut iterations = 0;

    while iterations < MAX_ITERATIONS {
        iterations += 1;

        // Normal equations J^T J and J^T r.
        let mut jtj = [[0.0; 2]; 2];
        let mut jtr = [0.0; 2];
        for o in data {
            let model = p[0] * o.sim + p[1];
            let r = (model.ln() - o.log_exp) * o.weight;
            let j = [o.sim / model * o.weight, o.weight / model];
            for a in 0..2 {
                jtr[a] += j[a] * r;
                for b in 0..2 {
                    jtj[a][b] += j[a] * j[b];
                }
            }
        }

        let mut improved = false;
        while lambda < 1e16 {
            let a00 = jtj[0][0] * (1.0 + lambda);
            let a11 = jtj[1][1] * (1.0 + lambda);
            let a01 = jtj[0][1];
            let det = a00 * a11 - a01 * a01;
            if det.abs() < f64::MIN_POSITIVE {
                lambda *= 10.0;
                continue;
            }
            let step = [
                -(a11 * jtr[0] - a01 * jtr[1]) / det,
                -(a00 * jtr[1] - a01 * jtr[0]) / det,
            ];
            let trial = clamp_params([p[0] + step[0], p[1] + step[1]]);
            match cost(data, trial) {
                Some(c) if c < current => {
                    let change = (current - c) / current.max(f64::MIN_POSITIVE);
                    p = trial;
                    current = c;
                    lambda = (lambda / 10.0).max(1e-12);
                    improved = true;
                    if change < TOLERANCE {
                        return Ok(finish(p, current, iterations));
                    }
                    break;
                }
                _ => lambda *= 10.0,
            }
        }

        if !improved {
            debug!(iterations, "no downhill step left");
            return Ok(finish(p, current, iterations));
        }
    }
    Ok(finish(p, current, iterations))
}

fn finish(p: [f64; 2], chi_squared: f64, iterations: usize) -> FitResult {
    FitResult {
        scale: p[0],
        background: p[1],
        chi_squared,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdrefl_data::QPoint;

    fn experiment(sim: &[f64], scale: f64, background: f64) -> QSet {
        QSet::new(
            sim.iter()
                .enumerate()
                .map(|(i, &r)| {
                    let intensity = r * scale + background;
                    QPoint {
                        q: 0.01 * (i + 1) as f64,
                        intensity: Some(intensity),
                        intensity_error: Some(0.05 * intensity),
                        q_resolution: 0.0005 * (i + 1) as f64,
                    }
                })
                .collect(),
        )
    }

    fn simulation(sim: &[f64]) -> AveragedReflectivity {
        AveragedReflectivity {
            points: sim
                .iter()
                .enumerate()
                .map(|(i, &r)| AveragedPoint {
                    q: 0.01 * (i + 1) as f64,
                    intensity: r,
                    intensity_error: 0.1 * r,
                    q_resolution: 0.0005 * (i + 1) as f64,
                })
                .collect(),
        }
    }

    #[test]
    fn test_fitted_applies_scale_and_background() {
        let sim = simulation(&[1.0, 0.1]);
        let exp = experiment(&[1.0, 0.1], 1.0, 0.0);
        let cmp = Comparison::new(&exp, &sim, 2.0, 1e-4).unwrap();
        let fitted = cmp.fitted();
        assert!((fitted.points[0].intensity - 2.0001).abs() < 1e-12);
        assert!((fitted.points[1].intensity_error - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch() {
        let sim = simulation(&[1.0, 0.1]);
        let exp = experiment(&[1.0], 1.0, 0.0);
        assert!(matches!(
            Comparison::new(&exp, &sim, 1.0, 0.0),
            Err(MdReflError::CurveLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_fit_needs_intensities() {
        let sim = simulation(&[1.0, 0.1]);
        let exp = QSet::linear(0.01, 0.02, 2, 5.0).unwrap();
        let mut cmp = Comparison::new(&exp, &sim, 1.0, 0.0).unwrap();
        assert!(matches!(cmp.fit(), Err(MdReflError::NoExperimentalIntensity)));
    }
}
