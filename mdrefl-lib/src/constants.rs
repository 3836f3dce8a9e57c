/// Multiplier applied to `.lgt` table values to obtain internal scattering lengths.
pub const SCATTERING_LENGTH_SCALE: f64 = 1e-5;

/// Ratio between a Gaussian FWHM and its standard deviation, 2·sqrt(2·ln 2).
pub const FWHM_TO_SIGMA: f64 = 2.354_820_045_030_949_3;

/// Below this dq/q ratio the curve is returned unsmeared.
pub const SMEARING_THRESHOLD: f64 = 0.0005;

/// Number of points in the discretized resolution kernel.
pub const KERNEL_POINTS: usize = 51;

/// Half-width of the resolution kernel in units of the dq/q ratio.
pub const KERNEL_HALF_WIDTH: f64 = 1.7;

/// Extent of the auxiliary log-q axis beyond the requested range, in σ.
pub const AUX_AXIS_SPAN: f64 = 6.0;

/// Default q-resolution as a percentage of q.
pub const DEFAULT_RESOLUTION_PERCENT: f64 = 5.0;

/// Default intensity uncertainty as a percentage of intensity.
pub const DEFAULT_INTENSITY_ERROR_PERCENT: f64 = 5.0;

/// Relative tolerance used to match frame timesteps against requested times.
pub const TIME_MATCH_TOLERANCE: f64 = 1e-9;
