//! Momentum transfer and its resolution from slit geometry.

use crate::data::{QResolution, SlitData};
use ndarray::{Array1, ArrayView1, Zip};
use std::f64::consts::PI;

/// Convert incident angles (degrees) and wavelength (Å) to Q (1/Å).
pub fn theta_to_q(angles_deg: ArrayView1<f64>, wavelength: f64) -> Array1<f64> {
    angles_deg.mapv(|deg| 4.0 * PI / wavelength * deg.to_radians().sin())
}

/// Angular divergence `(S1 + S2) / (2 * L12)` in radians.
pub fn angular_divergence(slits: &SlitData) -> f64 {
    (slits.slit1_width + slits.slit2_width) / (2.0 * slits.separation())
}

/// Q and dQ using slit-defined divergence and a relative wavelength spread.
///
/// `dQ = Q * sqrt((dλ/λ)² + (dθ / tan θ)²)`. Angles close to zero make
/// the angular term diverge.
pub fn q_with_resolution(
    angles_deg: ArrayView1<f64>,
    wavelength: f64,
    slits: &SlitData,
    wavelength_resolution: f64,
) -> QResolution {
    let q = theta_to_q(angles_deg, wavelength);
    let dtheta = angular_divergence(slits);

    let dq = Zip::from(&q).and(angles_deg).map_collect(|&q, &deg| {
        let rel_dtheta = dtheta / deg.to_radians().tan();
        q * (wavelength_resolution.powi(2) + rel_dtheta.powi(2)).sqrt()
    });

    QResolution { q, dq }
}
