//! Absorption of the beam along its path through the sample.

use crate::data::SampleData;
use ndarray::{Array1, ArrayView1};

/// Smallest value trigonometric denominators are clamped to.
const MIN_TRIG: f64 = 1e-6;

/// Beam transmission `exp(-mu * lambda * path)` through the sample.
///
/// Below the critical angle `atan(2 * thickness / length)` the beam runs
/// along the sample (`length / cos(theta)`); above it the path is set by
/// the thickness (`2 * thickness / sin(theta)`).
///
/// # Arguments
/// * `angles_deg` - Incident angles in degrees
/// * `wavelength` - Wavelength in Å
/// * `mu` - Linear absorption coefficient (1/mm/Å)
/// * `sample` - Sample with `length` and `thickness` in mm
///
/// # Returns
/// Factors in `(0, 1]` for non-negative `mu`.
pub fn absorption_correction(
    angles_deg: ArrayView1<f64>,
    wavelength: f64,
    mu: f64,
    sample: &SampleData,
) -> Array1<f64> {
    let critical = (sample.thickness / sample.length * 2.0).atan();

    angles_deg.mapv(|deg| {
        let theta = deg.to_radians();
        let path = if theta < critical {
            sample.length / theta.cos().max(MIN_TRIG)
        } else {
            2.0 * sample.thickness / theta.sin().max(MIN_TRIG)
        };
        (-mu * wavelength * path).exp()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> SampleData {
        SampleData::new("glass").with_dimensions(20.0, 0.5, 10.0)
    }

    #[test]
    fn test_zero_mu_is_transparent() {
        let corr = absorption_correction(array![0.1, 1.0, 5.0].view(), 4.7, 0.0, &sample());
        assert_eq!(corr.to_vec(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_grazing_path_uses_length() {
        // critical angle = atan(0.05) ~ 2.86 deg
        let theta = 1.0f64;
        let corr = absorption_correction(array![theta].view(), 4.0, 1e-4, &sample());
        let expected = (-1e-4 * 4.0 * 20.0 / theta.to_radians().cos()).exp();
        assert!((corr[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_steep_path_uses_thickness() {
        let theta = 10.0f64;
        let corr = absorption_correction(array![theta].view(), 4.0, 1e-4, &sample());
        let expected = (-1e-4 * 4.0 * 1.0 / theta.to_radians().sin()).exp();
        assert!((corr[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_in_unit_interval_and_monotonic() {
        let angles = array![0.2, 0.8, 2.0, 4.0];
        let weak = absorption_correction(angles.view(), 4.7, 1e-5, &sample());
        let strong = absorption_correction(angles.view(), 4.7, 1e-3, &sample());
        let long_wl = absorption_correction(angles.view(), 9.4, 1e-5, &sample());

        for i in 0..angles.len() {
            assert!(weak[i] > 0.0 && weak[i] <= 1.0);
            assert!(strong[i] <= weak[i]);
            assert!(long_wl[i] <= weak[i]);
        }
    }

    #[test]
    fn test_zero_angle_is_finite() {
        let thin = SampleData::new("thin").with_dimensions(20.0, 0.0, 10.0);
        let corr = absorption_correction(array![0.0, 0.5].view(), 4.7, 1e-4, &thin);
        assert!(corr.iter().all(|c| c.is_finite() && *c > 0.0));
    }
}
