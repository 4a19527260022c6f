//! Reduction of one input file: all channels through all stages.

use super::regroup::ChannelPool;
use crate::config::CorrectionParameters;
use crate::data::{Channel, DataSetMetadata, IntensityNormalized, Polarization, ReducedDataSet};
use crate::error::ReductionError;
use crate::orso::OrsoDocument;
use crate::provider::MetadataProvider;
use crate::stage::{
    BackgroundStage, CorrectionStage, ExtractStage, GlobalIntensityStage, IntensityStage,
    NormalisationStage, ResolutionStage, Stage,
};
use rayon::prelude::*;
use std::sync::{Arc, Mutex, PoisonError};

/// Reduces every polarisation channel of one file.
///
/// The configuration is checked against the provider on construction, so
/// a `DataReduction` only exists for runnable configurations.
pub struct DataReduction<'a> {
    provider: &'a dyn MetadataProvider,
    parameters: &'a CorrectionParameters,
}

impl<'a> DataReduction<'a> {
    /// Validate `parameters` for `provider`.
    ///
    /// # Errors
    /// Configuration errors (unknown detector, missing regions) and
    /// unavailable corrections, before any data is read.
    pub fn new(
        provider: &'a dyn MetadataProvider,
        parameters: &'a CorrectionParameters,
    ) -> Result<Self, ReductionError> {
        parameters.validate(&provider.detectors(), &provider.devices().area_detector)?;
        parameters.check_supported()?;
        Ok(Self {
            provider,
            parameters,
        })
    }

    pub fn parameters(&self) -> &CorrectionParameters {
        self.parameters
    }

    /// Channels that will be reduced, in output order.
    pub fn channels(&self) -> Vec<Polarization> {
        self.provider.polarisations()
    }

    /// Run one channel through the per-channel stages.
    pub fn reduce_channel(
        &self,
        header: Arc<DataSetMetadata>,
        polarisation: Polarization,
    ) -> Result<Channel<IntensityNormalized>, ReductionError> {
        let params = self.parameters;

        let extracted = ExtractStage::new(self.provider, params, header).process(polarisation)?;
        let resolved = ResolutionStage::new(params.wavelength_resolution).process(extracted)?;
        let corrected = CorrectionStage::new(&params.reduction).process(resolved)?;
        let normalized = NormalisationStage::new(&params.normalisation).process(corrected)?;
        let adjusted = BackgroundStage::new(&params.background).process(normalized)?;
        IntensityStage::new(params.normalisation.intensity.as_ref()).process(adjusted)
    }

    /// Reduce all channels.
    ///
    /// Channels run in parallel; the global pass starts only after every
    /// channel has been deposited in the pool.
    pub fn reduce(&self) -> Result<Vec<ReducedDataSet>, ReductionError> {
        let header = Arc::new(self.provider.header()?);
        let channels = self.channels();
        let pool = Mutex::new(ChannelPool::with_expected_count(channels.len()));

        channels
            .par_iter()
            .enumerate()
            .try_for_each(|(index, &polarisation)| {
                let channel = self.reduce_channel(Arc::clone(&header), polarisation)?;
                pool.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .add(index, channel);
                Ok::<_, ReductionError>(())
            })?;

        let reduced = pool
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .collect()?;
        let datasets = GlobalIntensityStage::new(self.parameters.normalisation.intensity.as_ref())
            .process(reduced)?;

        log::info!(
            "reduced {}: {} channel(s) from detector '{}'",
            self.provider.file_path(),
            datasets.len(),
            self.parameters.data_source.detector
        );
        Ok(datasets)
    }

    /// Reduce all channels and assemble the exchange document.
    pub fn document(&self) -> Result<OrsoDocument, ReductionError> {
        let datasets = self.reduce()?;
        Ok(OrsoDocument::assemble(&datasets, self.parameters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackgroundCorrection, IntensityNormalisation};
    use crate::data::dataset::tests::make_header;
    use crate::data::SlitData;
    use crate::error::{ConfigError, Feature};
    use crate::provider::MemoryProvider;
    use ndarray::{array, Array1};

    fn provider() -> MemoryProvider {
        MemoryProvider::new(
            "scan.dat",
            (*make_header()).clone(),
            SlitData::new(1.0, 0.5, -2000.0, -500.0),
            4.7,
        )
        .with_scan_column("theta", Array1::linspace(0.2, 2.0, 4))
        .with_state_column("sf1", &["off", "on", "off", "on"])
        .with_column("mon1", array![1000.0, 1000.0, 1000.0, 1000.0])
        .with_column("timer", array![1.0, 1.0, 1.0, 1.0])
        .with_detector("det", array![400.0, 100.0, 200.0, 50.0])
    }

    fn assert_close(actual: &Array1<f64>, expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{actual} != {expected:?}");
        }
    }

    fn plain_parameters() -> CorrectionParameters {
        let mut params = CorrectionParameters::default();
        params.reduction.footprint = false;
        params.reduction.absorption = None;
        params.background.correction = None;
        params.normalisation.time = false;
        params
    }

    #[test]
    fn test_channels_in_order() {
        let provider = provider();
        let params = plain_parameters();
        let reduction = DataReduction::new(&provider, &params).unwrap();

        let datasets = reduction.reduce().unwrap();
        let labels: Vec<_> = datasets.iter().map(|d| d.dataset.polarization()).collect();
        assert_eq!(labels, vec![Polarization::Mo, Polarization::Po]);
        assert_close(&datasets[0].state.r, &[0.1, 0.05]);
        assert_close(&datasets[1].state.r, &[0.4, 0.2]);
    }

    #[test]
    fn test_global_maximum_across_channels() {
        let provider = provider();
        let mut params = plain_parameters();
        params.normalisation.intensity = Some(IntensityNormalisation::GlobalMaximum);

        let datasets = DataReduction::new(&provider, &params)
            .unwrap()
            .reduce()
            .unwrap();
        assert_eq!(datasets[1].state.r[0], 1.0);
        assert_close(&datasets[0].state.r, &[0.25, 0.125]);
    }

    #[test]
    fn test_validation_before_reduction() {
        let provider = provider();
        let mut params = plain_parameters();
        params.data_source.detector = "missing".to_string();

        assert!(matches!(
            DataReduction::new(&provider, &params),
            Err(ReductionError::Config(ConfigError::UnknownDetector { .. }))
        ));
    }

    #[test]
    fn test_unavailable_correction_rejected_up_front() {
        let provider = provider();
        let mut params = plain_parameters();
        params.background.correction = Some(BackgroundCorrection::File("bg.dat".into()));

        assert!(matches!(
            DataReduction::new(&provider, &params),
            Err(ReductionError::Unimplemented(Feature::BackgroundFromFile))
        ));
    }

    #[test]
    fn test_reduction_is_repeatable() {
        let provider = provider();
        let params = CorrectionParameters::default();
        let reduction = DataReduction::new(&provider, &params).unwrap();

        let first = reduction.reduce().unwrap();
        let second = reduction.reduce().unwrap();
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.state, b.state);
        }
    }
}
