//! Fallback sequences used when the first encode is over budget.
//!
//! Kept as plain constants so the order, the termination bound and the
//! parameter values can be read (and tested) without running an encoder.
//! The pipeline walks them in this order:
//!
//! ```text
//! quality ladder    JPEG/WebP: QUALITY_STEPS      PNG: PNG_EFFORT_STEPS
//! dimension ladder  SCALE_STEPS at DOWNSCALE_QUALITY / DOWNSCALE_PNG_EFFORT
//! floor             fitted size at FLOOR_QUALITY / FLOOR_PNG_EFFORT
//! ```

/// Lossy qualities tried in order (strictly decreasing).
pub const QUALITY_STEPS: &[u8] = &[95, 92, 88, 85, 82, 78, 75, 72, 68, 65, 60, 55, 50];

/// PNG compression efforts tried in order (strictly increasing).
pub const PNG_EFFORT_STEPS: &[u8] = &[2, 3, 4, 5, 6];

/// Scale factors applied to the fitted dimensions (strictly decreasing).
pub const SCALE_STEPS: &[f64] = &[0.95, 0.9, 0.85, 0.8, 0.75, 0.7];

/// Quality used for every rung of the dimension ladder.
pub const DOWNSCALE_QUALITY: u8 = 85;
pub const DOWNSCALE_PNG_EFFORT: u8 = 3;

/// Last-resort parameters; the result is returned whatever its size.
pub const FLOOR_QUALITY: u8 = 65;
pub const FLOOR_PNG_EFFORT: u8 = 6;

/// Upper bound on encoder invocations for one request, first pass included.
pub fn max_attempts() -> usize {
    1 + QUALITY_STEPS.len().max(PNG_EFFORT_STEPS.len()) + SCALE_STEPS.len() + 1
}
