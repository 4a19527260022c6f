//! Extract stage: raw arrays of one polarisation channel.

use super::traits::{Stage, StageId};
use crate::config::{BackgroundCorrection, CorrectionParameters};
use crate::data::{
    masked_region_mean, region_mean, Channel, DataSet, DataSetMetadata, Extracted,
    Polarization, Region, Signal,
};
use crate::error::{ConfigError, ReductionError};
use crate::provider::{DetectorCounts, MetadataProvider};
use ndarray::{Array3, Axis};
use std::sync::Arc;

/// Pulls theta, monitor, time and detector signal for a channel.
///
/// Area-detector frames are averaged over the configured region; a region
/// background, when configured, is estimated from the same frames.
pub struct ExtractStage<'a> {
    provider: &'a dyn MetadataProvider,
    parameters: &'a CorrectionParameters,
    header: Arc<DataSetMetadata>,
}

impl<'a> ExtractStage<'a> {
    pub fn new(
        provider: &'a dyn MetadataProvider,
        parameters: &'a CorrectionParameters,
        header: Arc<DataSetMetadata>,
    ) -> Self {
        Self {
            provider,
            parameters,
            header,
        }
    }

    fn area_signal(&self, frames: &Array3<f64>) -> Result<Signal, ReductionError> {
        let detector = &self.parameters.data_source.detector;
        let region = self
            .parameters
            .data_source
            .region
            .ok_or_else(|| ConfigError::MissingRegion {
                detector: detector.clone(),
            })?;
        check_bounds(frames, &region)?;

        let (counts, counts_err) = region_mean(frames.view(), &region);
        let mut signal = Signal::from_counts(counts);
        signal.counts_err = counts_err;

        if let Some(BackgroundCorrection::DetectorRegion(background)) =
            &self.parameters.background.correction
        {
            check_bounds(frames, background)?;
            let (bg, bg_err) = if background.overlaps(&region) {
                masked_region_mean(frames.view(), background, &region)
            } else {
                region_mean(frames.view(), background)
            };
            signal.background = bg;
            signal.background_err = bg_err;
        }

        Ok(signal)
    }
}

fn check_bounds(frames: &Array3<f64>, region: &Region) -> Result<(), ReductionError> {
    if !region.is_valid() {
        return Err(ConfigError::InvalidRegion(*region).into());
    }
    let rows = frames.len_of(Axis(1));
    let cols = frames.len_of(Axis(2));
    if region.fits(rows, cols) {
        Ok(())
    } else {
        Err(ReductionError::RegionOutOfBounds {
            region: *region,
            rows,
            cols,
        })
    }
}

impl Stage for ExtractStage<'_> {
    type Input = Polarization;
    type Output = Channel<Extracted>;

    fn id(&self) -> StageId {
        StageId::Extract
    }

    fn process(&self, polarisation: Polarization) -> Result<Self::Output, ReductionError> {
        let detector = &self.parameters.data_source.detector;

        let signal = match self.provider.channel_counts(detector, polarisation)? {
            DetectorCounts::Point(counts) => Signal::from_counts(counts),
            DetectorCounts::Area(frames) => self.area_signal(&frames)?,
        };

        let dataset = DataSet::new(
            Arc::clone(&self.header),
            self.provider.measurement(polarisation)?,
            self.provider.channel_theta(polarisation)?,
            self.provider.channel_time(polarisation)?,
            self.provider.channel_monitor(polarisation)?,
            signal,
        )?;

        log::debug!(
            "{}: channel {} has {} points from '{}'",
            self.name(),
            polarisation,
            dataset.len(),
            detector
        );
        Ok(Channel::new(dataset, Extracted))
    }
}
