/// Second derivatives of the natural cubic spline through `(x, y)`.
///
/// `x` must be strictly increasing. The end second derivatives are zero.
/// Solved with the Thomas algorithm on the tridiagonal continuity system.
pub fn natural_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut y2 = vec![0.0; n];
    if n < 3 {
        return y2;
    }

    // Forward sweep, storing the modified super-diagonal in `u`.
    let mut u = vec![0.0; n];
    for i in 1..n - 1 {
        let sig = (x[i] - x[i - 1]) / (x[i + 1] - x[i - 1]);
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let slope = (y[i + 1] - y[i]) / (x[i + 1] - x[i]) - (y[i] - y[i - 1]) / (x[i] - x[i - 1]);
        u[i] = (6.0 * slope / (x[i + 1] - x[i - 1]) - sig * u[i - 1]) / p;
    }

    y2[n - 1] = 0.0;
    for k in (0..n - 1).rev() {
        y2[k] = y2[k] * y2[k + 1] + u[k];
    }
    y2
}

/// Evaluate a cubic spline given its knots and second derivatives.
///
/// Points outside `[xin[0], xin[last]]` are extrapolated from the end
/// intervals.
///
/// # Arguments
/// * `xin` - Knot positions (strictly increasing, at least two)
/// * `yin` - Knot values
/// * `y2` - Second derivatives at the knots
/// * `xout` - Positions to evaluate at
pub fn spline_eval(xin: &[f64], yin: &[f64], y2: &[f64], xout: &[f64]) -> Vec<f64> {
    xout.iter()
        .map(|&x| {
            let hi = match xin.partition_point(|&v| v < x) {
                i if i >= xin.len() => xin.len() - 1,
                0 => 1.min(xin.len() - 1),
                i => i,
            };
            let lo = hi - 1;

            let h = xin[hi] - xin[lo];
            debug_assert!(h > 0.0, "xin must be strictly increasing");

            let a = (xin[hi] - x) / h;
            let b = (x - xin[lo]) / h;

            a * yin[lo]
                + b * yin[hi]
                + (h * h / 6.0) * ((a * a - 1.0) * a * y2[lo] + (b * b - 1.0) * b * y2[hi])
        })
        .collect()
}

/// Interpolate `(xin, yin)` at `xout` with a natural cubic spline.
pub fn cubic_spline(xin: &[f64], yin: &[f64], xout: &[f64]) -> Vec<f64> {
    let y2 = natural_second_derivatives(xin, yin);
    spline_eval(xin, yin, &y2, xout)
}
