//! Intensity stages: per-channel scaling and the global-maximum pass.

use super::traits::{Stage, StageId};
use crate::config::IntensityNormalisation;
use crate::data::{
    BackgroundAdjusted, Channel, DataSetOutput, IntensityNormalized, ReducedDataSet, Reflectivity,
};
use crate::error::{Feature, ReductionError};

/// Divide R and dR by `divisor` unless it is zero or not finite.
fn scale_checked(reflectivity: &mut Reflectivity, divisor: Option<f64>, what: &str) {
    match divisor {
        Some(d) if d.is_finite() && d != 0.0 => reflectivity.scale_down(d),
        other => log::warn!(
            "intensity normalisation by {what} skipped, divisor is {}",
            other.map_or_else(|| "undefined".to_string(), |d| d.to_string())
        ),
    }
}

/// Scales each channel on its own: by a constant or by its own maximum.
///
/// The global-maximum mode passes channels through unchanged; it is
/// applied by [`GlobalIntensityStage`] once every channel is done.
pub struct IntensityStage<'a> {
    mode: Option<&'a IntensityNormalisation>,
}

impl<'a> IntensityStage<'a> {
    pub fn new(mode: Option<&'a IntensityNormalisation>) -> Self {
        Self { mode }
    }
}

impl Stage for IntensityStage<'_> {
    type Input = Channel<BackgroundAdjusted>;
    type Output = Channel<IntensityNormalized>;

    fn id(&self) -> StageId {
        StageId::Intensity
    }

    fn process(&self, channel: Channel<BackgroundAdjusted>) -> Result<Self::Output, ReductionError> {
        let BackgroundAdjusted {
            resolution,
            mut reflectivity,
        } = channel.state;

        match self.mode {
            None | Some(IntensityNormalisation::GlobalMaximum) => {}
            Some(IntensityNormalisation::Constant(value)) => {
                scale_checked(&mut reflectivity, Some(*value), "constant value");
            }
            Some(IntensityNormalisation::DatasetMaximum) => {
                let max = reflectivity.max();
                scale_checked(&mut reflectivity, max, "dataset maximum");
            }
            Some(IntensityNormalisation::DetectorRegion { .. }) => {
                return Err(ReductionError::Unimplemented(
                    Feature::RegionIntensityNormalisation,
                ));
            }
        }

        log::debug!(
            "{}: channel {}",
            self.name(),
            channel.dataset.polarization()
        );
        Ok(Channel::new(
            channel.dataset,
            IntensityNormalized {
                resolution,
                reflectivity,
            },
        ))
    }
}

/// Final pass over all channels of one file.
///
/// With global-maximum normalisation every channel is divided by the
/// largest R found in any of them; otherwise channels are only finalised.
pub struct GlobalIntensityStage<'a> {
    mode: Option<&'a IntensityNormalisation>,
}

impl<'a> GlobalIntensityStage<'a> {
    pub fn new(mode: Option<&'a IntensityNormalisation>) -> Self {
        Self { mode }
    }
}

impl Stage for GlobalIntensityStage<'_> {
    type Input = Vec<Channel<IntensityNormalized>>;
    type Output = Vec<ReducedDataSet>;

    fn id(&self) -> StageId {
        StageId::GlobalIntensity
    }

    fn process(
        &self,
        mut channels: Vec<Channel<IntensityNormalized>>,
    ) -> Result<Self::Output, ReductionError> {
        if let Some(IntensityNormalisation::GlobalMaximum) = self.mode {
            let max = channels
                .iter()
                .filter_map(|c| c.state.reflectivity.max())
                .reduce(f64::max);
            log::debug!("{}: maximum over {} channels is {:?}", self.name(), channels.len(), max);
            for channel in &mut channels {
                scale_checked(&mut channel.state.reflectivity, max, "global maximum");
            }
        }

        Ok(channels
            .into_iter()
            .map(|channel| {
                let IntensityNormalized {
                    resolution,
                    reflectivity,
                } = channel.state;
                Channel::new(channel.dataset, DataSetOutput::new(resolution, reflectivity))
            })
            .collect())
    }
}
