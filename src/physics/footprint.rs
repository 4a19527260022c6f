//! Footprint correction for two-slit collimation.

use crate::data::SlitData;
use ndarray::{Array1, ArrayView1};

/// Footprint correction factor for a trapezoidal beam.
///
/// The beam has a flat top of width `beam_center` and linearly falling
/// edges out to `beam_size`. Below the angle where the flat top just fits
/// on the sample the illuminated fraction grows linearly with the angle;
/// between that and the angle where the whole beam fits it follows the
/// quadratic edge profile; above it the sample is fully illuminated.
///
/// # Arguments
/// * `angles_deg` - Incident angles in degrees
/// * `slits` - Slit widths and positions (same unit as `sample_length`)
/// * `sample_length` - Sample length along the beam
///
/// # Returns
/// The inverse of the illuminated fraction (>= 1), to multiply counts with.
/// Degenerate geometry gives the neutral factor 1 everywhere.
pub fn footprint_correction(
    angles_deg: ArrayView1<f64>,
    slits: &SlitData,
    sample_length: f64,
) -> Array1<f64> {
    match thresholds(slits, sample_length) {
        Some(t) => angles_deg.mapv(|deg| 1.0 / t.illuminated_fraction(deg.to_radians())),
        None => {
            log::warn!(
                "degenerate footprint geometry (slits {:?}, sample length {}), no footprint correction applied",
                slits,
                sample_length
            );
            Array1::ones(angles_deg.len())
        }
    }
}

/// Angles bounding the partially illuminated regime.
#[derive(Clone, Copy, Debug)]
struct Thresholds {
    /// Flat top of the beam fits on the sample.
    inner: f64,
    /// Whole beam fits on the sample.
    outer: f64,
    /// Share of the beam intensity carried by the sloped edges.
    edge_share: f64,
}

impl Thresholds {
    fn illuminated_fraction(&self, theta: f64) -> f64 {
        if theta >= self.outer {
            1.0
        } else if theta < self.inner {
            (1.0 - self.edge_share) * theta / self.inner
        } else {
            let edge = (theta - self.outer).powi(2) / (self.outer - self.inner).powi(2);
            (1.0 - self.edge_share) + (1.0 - edge) * self.edge_share
        }
    }
}

fn thresholds(slits: &SlitData, sample_length: f64) -> Option<Thresholds> {
    let s1 = slits.slit1_width;
    let s2 = slits.slit2_width;
    let l1 = slits.slit1_position.abs();
    let l2 = slits.slit2_position.abs();

    if sample_length <= 0.0 || l1 == l2 || l1 + l2 == 0.0 {
        return None;
    }

    let beam_center = s2 - (s1 - s2) * l2 / (l1 + l2);
    let beam_size = (s1 + s2) * (l1 + l2) / (l1 - l2) - s1;

    let inner = (beam_center / sample_length).asin();
    let outer = (beam_size / sample_length).asin();

    let full_beam = beam_center + (beam_size - beam_center) / 2.0;
    let edge_share = (beam_size - beam_center) / 2.0 / full_beam;

    let valid = inner.is_finite()
        && outer.is_finite()
        && edge_share.is_finite()
        && inner > 0.0
        && outer > inner;
    valid.then_some(Thresholds {
        inner,
        outer,
        edge_share,
    })
}
