//! Sample statistics shared by profile and reflectivity averaging.

use crate::error::{MdReflError, Result};

/// Sample mean and standard error, `sqrt(Σ(x - mean)² / (N - 1))`.
///
/// A single sample has no spread to estimate; it is returned with an error
/// of zero. An empty slice is an error. The mean is accumulated as an offset
/// from the first sample, so identical samples give back exactly that value
/// with an error of exactly zero.
pub fn mean_stderr(samples: &[f64]) -> Result<(f64, f64)> {
    let Some(&x0) = samples.first() else {
        return Err(MdReflError::EmptyEnsemble);
    };
    let n = samples.len();
    let mean = x0 + samples.iter().map(|&x| x - x0).sum::<f64>() / n as f64;
    if n == 1 {
        return Ok((mean, 0.0));
    }
    let ss: f64 = samples.iter().map(|&x| (x - mean) * (x - mean)).sum();
    Ok((mean, (ss / (n - 1) as f64).sqrt()))
}

/// Column-wise [`mean_stderr`] over equally long rows.
///
/// `width` reports the length of a row so that callers can surface their own
/// mismatch error.
pub(crate) fn column_stats<'a, I>(
    rows: I,
    width: usize,
    mismatch: impl Fn(usize) -> MdReflError,
) -> Result<Vec<(f64, f64)>>
where
    I: Iterator<Item = &'a [f64]> + Clone,
{
    for row in rows.clone() {
        if row.len() != width {
            return Err(mismatch(row.len()));
        }
    }
    let mut column = Vec::new();
    (0..width)
        .map(|j| {
            column.clear();
            column.extend(rows.clone().map(|row| row[j]));
            mean_stderr(&column)
        })
        .collect()
}
