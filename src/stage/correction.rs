//! Correction stage: footprint and absorption coefficients.

use super::traits::{Stage, StageId};
use crate::config::ReductionConfig;
use crate::data::{Channel, Corrected, Resolved};
use crate::error::{Feature, ReductionError};
use crate::physics::{absorption_correction, footprint_correction};
use ndarray::Array1;

/// Builds the per-point correction coefficient.
///
/// Starts from 1 and multiplies in the footprint factor, then the
/// absorption transmission, for whichever corrections are enabled.
pub struct CorrectionStage<'a> {
    config: &'a ReductionConfig,
}

impl<'a> CorrectionStage<'a> {
    pub fn new(config: &'a ReductionConfig) -> Self {
        Self { config }
    }
}

impl Stage for CorrectionStage<'_> {
    type Input = Channel<Resolved>;
    type Output = Channel<Corrected>;

    fn id(&self) -> StageId {
        StageId::Correction
    }

    fn process(&self, channel: Channel<Resolved>) -> Result<Self::Output, ReductionError> {
        if self.config.polarisation {
            return Err(ReductionError::Unimplemented(
                Feature::PolarisationCorrection,
            ));
        }

        let dataset = &channel.dataset;
        let sample = &dataset.header.sample;
        let mut correction = Array1::ones(dataset.len());

        if self.config.footprint {
            correction *= &footprint_correction(dataset.theta.view(), dataset.slits(), sample.length);
        }
        if let Some(source) = &self.config.absorption {
            correction *= &absorption_correction(
                dataset.theta.view(),
                dataset.wavelength(),
                source.mu(),
                sample,
            );
        }

        log::debug!(
            "{}: channel {} (footprint: {}, absorption: {})",
            self.name(),
            dataset.polarization(),
            self.config.footprint,
            self.config.absorption.is_some()
        );

        let Resolved { resolution } = channel.state;
        Ok(Channel::new(
            channel.dataset,
            Corrected {
                resolution,
                correction,
            },
        ))
    }
}
