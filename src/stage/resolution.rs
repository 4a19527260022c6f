//! Resolution stage: Q and dQ from incident angles.

use super::traits::{Stage, StageId};
use crate::data::{Channel, Extracted, Resolved};
use crate::error::ReductionError;
use crate::physics::q_with_resolution;

pub struct ResolutionStage {
    wavelength_resolution: f64,
}

impl ResolutionStage {
    /// Create with the relative wavelength spread `dλ/λ`.
    pub fn new(wavelength_resolution: f64) -> Self {
        Self {
            wavelength_resolution,
        }
    }
}

impl Stage for ResolutionStage {
    type Input = Channel<Extracted>;
    type Output = Channel<Resolved>;

    fn id(&self) -> StageId {
        StageId::Resolution
    }

    fn process(&self, channel: Channel<Extracted>) -> Result<Self::Output, ReductionError> {
        let dataset = &channel.dataset;
        let resolution = q_with_resolution(
            dataset.theta.view(),
            dataset.wavelength(),
            dataset.slits(),
            self.wavelength_resolution,
        );

        log::debug!("{}: channel {}", self.name(), dataset.polarization());
        Ok(channel.advance(Resolved { resolution }))
    }
}
