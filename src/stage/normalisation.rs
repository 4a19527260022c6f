//! Normalisation stage: monitor and time normalisation, first R and dR.

use super::traits::{Stage, StageId};
use crate::config::NormalisationConfig;
use crate::data::{Channel, Corrected, Normalized, Reflectivity};
use crate::error::ReductionError;
use crate::physics::safe_div;
use ndarray::Array1;

/// Divides by monitor then time and forms
/// `R = counts * correction * normalisation`,
/// `dR = counts_err * correction * normalisation`.
pub struct NormalisationStage<'a> {
    config: &'a NormalisationConfig,
}

impl<'a> NormalisationStage<'a> {
    pub fn new(config: &'a NormalisationConfig) -> Self {
        Self { config }
    }
}

impl Stage for NormalisationStage<'_> {
    type Input = Channel<Corrected>;
    type Output = Channel<Normalized>;

    fn id(&self) -> StageId {
        StageId::Normalisation
    }

    fn process(&self, channel: Channel<Corrected>) -> Result<Self::Output, ReductionError> {
        let dataset = &channel.dataset;
        let mut normalisation = Array1::ones(dataset.len());

        if self.config.monitor {
            normalisation = safe_div(normalisation.view(), dataset.monitor.view());
        }
        if self.config.time {
            normalisation = safe_div(normalisation.view(), dataset.time.view());
        }

        let Corrected {
            resolution,
            correction,
        } = channel.state;
        let scale = &correction * &normalisation;
        let reflectivity = Reflectivity {
            r: &dataset.counts * &scale,
            dr: &dataset.counts_err * &scale,
        };

        log::debug!("{}: channel {}", self.name(), dataset.polarization());
        Ok(Channel::new(
            channel.dataset,
            Normalized {
                resolution,
                normalisation,
                reflectivity,
            },
        ))
    }
}
