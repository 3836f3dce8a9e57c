//! Reflectivity of a layered SLD profile.
//!
//! Raw curves come from the Abeles optical-matrix method; instrument
//! resolution is applied as a constant-width Gaussian in log-q.

use mdrefl_data::SldLayer;
use num_complex::Complex64;
use rayon::prelude::*;
use serde::Serialize;
use std::f64::consts::PI;
use std::ops::Mul;
use tracing::{debug, info};

use crate::constants::{
    AUX_AXIS_SPAN, FWHM_TO_SIGMA, KERNEL_HALF_WIDTH, KERNEL_POINTS, SMEARING_THRESHOLD,
};
use crate::error::{MdReflError, Result};
use crate::qdata::QSet;
use crate::sld::FrameProfile;
use crate::spline::cubic_spline;
use crate::stats::column_stats;

/// Calculated intensity at one q.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReflectivityPoint {
    pub q: f64,
    pub intensity: f64,
}

/// Reflectivity of one frame, aligned with the q-set it was computed on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReflectivityCurve {
    pub time: f64,
    pub points: Vec<ReflectivityPoint>,
}

impl ReflectivityCurve {
    pub fn intensities(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.intensity).collect()
    }
}

/// Frame-averaged reflectivity at one q.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AveragedPoint {
    pub q: f64,
    pub intensity: f64,
    pub intensity_error: f64,
    pub q_resolution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AveragedReflectivity {
    pub points: Vec<AveragedPoint>,
}

impl AveragedReflectivity {
    pub fn q_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.q).collect()
    }

    pub fn intensities(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.intensity).collect()
    }
}

/// Convert f64 to Complex64 (real part only).
#[inline]
fn c(re: f64) -> Complex64 {
    Complex64::new(re, 0.0)
}

#[derive(Debug, Clone, Copy)]
struct Matrix2([[Complex64; 2]; 2]);

impl Matrix2 {
    fn identity() -> Self {
        Matrix2([[c(1.0), c(0.0)], [c(0.0), c(1.0)]])
    }
}

impl Mul for Matrix2 {
    type Output = Matrix2;

    fn mul(self, rhs: Matrix2) -> Matrix2 {
        let a = &self.0;
        let b = &rhs.0;
        Matrix2([
            [
                a[0][0] * b[0][0] + a[0][1] * b[1][0],
                a[0][0] * b[0][1] + a[0][1] * b[1][1],
            ],
            [
                a[1][0] * b[0][0] + a[1][1] * b[1][0],
                a[1][0] * b[0][1] + a[1][1] * b[1][1],
            ],
        ])
    }
}

/// Discrete convolution with 'same' output size (centered).
fn convolve_same(a: &[f64], b: &[f64]) -> Vec<f64> {
    let na = a.len();
    let nb = b.len();
    let full_len = na + nb - 1;
    let mut full = vec![0.0; full_len];
    for i in 0..na {
        let ai = a[i];
        if ai == 0.0 {
            continue;
        }
        for j in 0..nb {
            full[i + j] += ai * b[j];
        }
    }
    let start = (full_len - na) / 2;
    full[start..start + na].to_vec()
}

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (stop - start) / (n - 1) as f64;
    (0..n).map(|i| start + i as f64 * step).collect()
}

fn gaussian(x: f64, sigma: f64) -> f64 {
    (-0.5 * x * x / (sigma * sigma)).exp() / (sigma * (2.0 * PI).sqrt())
}

/// Unsmeared reflectivity by the Abeles optical-matrix method.
///
/// `layers[0]` is the incident medium and the last layer the substrate; the
/// thickness of the incident medium is ignored. Interfaces are sharp.
///
/// # Arguments
/// * `layers` - SLD profile ordered by depth, at least two layers
/// * `q` - Momentum transfer values (Å⁻¹)
pub fn abeles(layers: &[SldLayer], q: &[f64]) -> Result<Vec<f64>> {
    if layers.len() < 2 {
        return Err(MdReflError::InvalidInput(format!(
            "an SLD profile needs at least two layers to form an interface, got {}",
            layers.len()
        )));
    }

    let sld0 = Complex64::new(layers[0].real, layers[0].imag);
    // 4π(SLD_j - SLD_0) for each layer
    let contrast: Vec<Complex64> = layers
        .iter()
        .map(|l| c(4.0 * PI) * (Complex64::new(l.real, l.imag) - sld0))
        .collect();

    Ok(q.iter()
        .map(|&qv| abeles_point(layers, &contrast, qv))
        .collect())
}

fn abeles_point(layers: &[SldLayer], contrast: &[Complex64], q: f64) -> f64 {
    let one = c(1.0);
    let i = Complex64::i();
    let q2 = c(q * q / 4.0);

    let mut k = (q2 - contrast[0]).sqrt();
    let mut total = Matrix2::identity();

    for idx in 1..layers.len() {
        let k_next = (q2 - contrast[idx]).sqrt();
        let r = (k - k_next) / (k + k_next);

        let (e_pos, e_neg) = if idx == 1 {
            (one, one)
        } else {
            let phase = i * k * c(layers[idx - 1].thickness.abs());
            (phase.exp(), (-phase).exp())
        };

        let characteristic = Matrix2([[e_pos, r * e_neg], [r * e_pos, e_neg]]);
        total = characteristic * total;
        k = k_next;
    }

    let m = total.0;
    m[0][1].norm_sqr() / m[0][0].norm_sqr()
}

/// Reflectivity at the q-set's points with Gaussian resolution smearing.
///
/// The resolution is taken as the dq/q ratio of the first point. Ratios
/// below 0.05 % skip smearing. Otherwise the raw curve is evaluated on a
/// log-spaced auxiliary axis, convolved with a 51-point Gaussian and
/// interpolated back with a cubic spline.
pub fn smeared(layers: &[SldLayer], qset: &QSet) -> Result<Vec<f64>> {
    let q = qset.q_values();
    if q.is_empty() {
        return Err(MdReflError::NoQPoints);
    }
    if let Some(bad) = q.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
        return Err(MdReflError::InvalidInput(format!(
            "q values must be positive and finite, got {bad}"
        )));
    }

    let res = qset.resolution_ratio().unwrap_or(0.0);
    if !(res.is_finite() && res >= 0.0) {
        return Err(MdReflError::InvalidInput(format!(
            "q resolution ratio must be non-negative, got {res}"
        )));
    }
    if res < SMEARING_THRESHOLD {
        return abeles(layers, &q);
    }

    let sigma = res / FWHM_TO_SIGMA;
    let half_kernel = ((KERNEL_POINTS - 1) / 2) as f64;

    let low_q = q.iter().copied().fold(f64::INFINITY, f64::min);
    let high_q = q.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let start = low_q.log10() - AUX_AXIS_SPAN * sigma;
    let finish = (high_q * (1.0 + AUX_AXIS_SPAN * sigma)).log10();
    let n_aux = ((finish - start).abs() / (KERNEL_HALF_WIDTH * sigma / half_kernel)).round() as usize;
    let n_aux = n_aux.max(KERNEL_POINTS);

    let aux_q: Vec<f64> = linspace(start, finish, n_aux)
        .into_iter()
        .map(|x| 10f64.powf(x))
        .collect();

    let kernel_x = linspace(-KERNEL_HALF_WIDTH * res, KERNEL_HALF_WIDTH * res, KERNEL_POINTS);
    let kernel: Vec<f64> = kernel_x.iter().map(|&x| gaussian(x, sigma)).collect();
    let spacing = kernel_x[1] - kernel_x[0];

    let raw = abeles(layers, &aux_q)?;
    let blurred = convolve_same(&raw, &kernel);

    debug!(res, n_aux, "smeared reflectivity on auxiliary axis");

    Ok(cubic_spline(&aux_q, &blurred, &q)
        .into_iter()
        .map(|v| (v * spacing).max(0.0))
        .collect())
}

/// Smeared reflectivity for every frame profile.
pub fn calc_ref(profiles: &[FrameProfile], qset: &QSet) -> Result<Vec<ReflectivityCurve>> {
    if qset.is_empty() {
        return Err(MdReflError::NoQPoints);
    }
    info!(
        frames = profiles.len(),
        q_points = qset.len(),
        "calculating reflectivity"
    );

    let q = qset.q_values();
    profiles
        .par_iter()
        .map(|profile| -> Result<ReflectivityCurve> {
            let intensity = smeared(&profile.layers, qset)?;
            Ok(ReflectivityCurve {
                time: profile.time,
                points: q
                    .iter()
                    .zip(intensity)
                    .map(|(&q, intensity)| ReflectivityPoint { q, intensity })
                    .collect(),
            })
        })
        .collect()
}

/// Mean reflectivity and its standard error across frames.
pub fn average_ref(curves: &[ReflectivityCurve], qset: &QSet) -> Result<AveragedReflectivity> {
    if qset.is_empty() {
        return Err(MdReflError::NoQPoints);
    }
    if curves.is_empty() {
        return Err(MdReflError::EmptyEnsemble);
    }

    let width = qset.len();
    let rows: Vec<Vec<f64>> = curves.iter().map(ReflectivityCurve::intensities).collect();
    let stats = column_stats(rows.iter().map(Vec::as_slice), width, |found| {
        MdReflError::CurveLengthMismatch {
            expected: width,
            found,
        }
    })?;

    Ok(AveragedReflectivity {
        points: qset
            .points()
            .iter()
            .zip(stats)
            .map(|(p, (intensity, intensity_error))| AveragedPoint {
                q: p.q,
                intensity,
                intensity_error,
                q_resolution: p.q_resolution,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_convolve_same_is_centered() {
        let out = convolve_same(&[0.0, 0.0, 1.0, 0.0, 0.0], &[0.25, 0.5, 0.25]);
        assert_eq!(out, vec![0.0, 0.25, 0.5, 0.25, 0.0]);
    }

    #[test]
    fn test_linspace_endpoints() {
        let v = linspace(-1.0, 1.0, 5);
        assert_eq!(v, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_matrix_identity() {
        let m = Matrix2([[c(1.0), c(2.0)], [c(3.0), c(4.0)]]);
        let p = Matrix2::identity() * m;
        assert_eq!(p.0, m.0);
    }

    #[test]
    fn test_matrix_product_order() {
        let a = Matrix2([[c(1.0), c(2.0)], [c(3.0), c(4.0)]]);
        let b = Matrix2([[c(0.0), c(1.0)], [c(1.0), c(0.0)]]);
        assert_eq!((a * b).0, [[c(2.0), c(1.0)], [c(4.0), c(3.0)]]);
        assert_eq!((b * a).0, [[c(3.0), c(4.0)], [c(1.0), c(2.0)]]);
    }

    #[test]
    fn test_single_interface_matches_fresnel() {
        let layers = [SldLayer::new(0.0, 0.0, 0.0), SldLayer::new(0.0, 2.07e-6, 0.0)];
        let q = 0.05;
        let r = abeles(&layers, &[q]).unwrap()[0];

        let k0 = q / 2.0;
        let k1 = (k0 * k0 - 4.0 * PI * 2.07e-6).sqrt();
        let expected = ((k0 - k1) / (k0 + k1)).powi(2);
        assert_relative_eq!(r, expected, max_relative = 1e-10);
    }

    #[test]
    fn test_total_reflection_below_critical_edge() {
        let layers = [SldLayer::new(0.0, 0.0, 0.0), SldLayer::new(0.0, 2.07e-6, 0.0)];
        // q_c = sqrt(16π·ρ) ≈ 0.0102
        let r = abeles(&layers, &[0.005]).unwrap()[0];
        assert_relative_eq!(r, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gaussian_kernel_sums_to_one() {
        let res = 0.05;
        let sigma = res / FWHM_TO_SIGMA;
        let x = linspace(-KERNEL_HALF_WIDTH * res, KERNEL_HALF_WIDTH * res, KERNEL_POINTS);
        let dx = x[1] - x[0];
        let total: f64 = x.iter().map(|&v| gaussian(v, sigma) * dx).sum();
        assert!(total < 1.0 && total > 0.999, "kernel mass = {total}");
    }

    #[test]
    fn test_too_few_layers() {
        let layers = [SldLayer::new(1.0, 0.0, 0.0)];
        assert!(matches!(abeles(&layers, &[0.1]), Err(MdReflError::InvalidInput(_))));
    }
}
