//! Physical corrections and Q resolution.

pub mod absorption;
pub mod footprint;
pub mod resolution;

pub use absorption::absorption_correction;
pub use footprint::footprint_correction;
pub use resolution::{angular_divergence, q_with_resolution, theta_to_q};

use ndarray::{Array1, ArrayView1, Zip};

/// Denominators smaller than this are replaced by its inverse.
pub const SAFE_DIV_EPSILON: f64 = 1e-12;

/// Element-wise `numerator / denominator`, replacing near-zero
/// denominators by `1 / SAFE_DIV_EPSILON` instead of dividing by zero.
pub fn safe_div(numerator: ArrayView1<f64>, denominator: ArrayView1<f64>) -> Array1<f64> {
    Zip::from(numerator)
        .and(denominator)
        .map_collect(|&n, &d| {
            let d = if d.abs() < SAFE_DIV_EPSILON {
                1.0 / SAFE_DIV_EPSILON
            } else {
                d
            };
            n / d
        })
}
