//! Per-channel working data and the pipeline states it moves through.
//!
//! A [`Channel`] pairs the raw [`DataSet`] with a state value. Each stage
//! consumes one state and produces the next, so results can only be filled
//! in pipeline order:
//!
//! ```text
//! Extracted -> Resolved -> Corrected -> Normalized
//!           -> BackgroundAdjusted -> IntensityNormalized -> DataSetOutput
//! ```

use super::metadata::{DataSetMetadata, MeasurementData, SlitData};
use super::polarization::Polarization;
use crate::error::ReductionError;
use ndarray::{stack, Array1, Array2, Axis};
use std::sync::Arc;

/// Detector signal for one channel after region reduction.
#[derive(Clone, Debug)]
pub struct Signal {
    pub counts: Array1<f64>,
    pub counts_err: Array1<f64>,
    pub background: Array1<f64>,
    pub background_err: Array1<f64>,
}

impl Signal {
    /// Point-detector signal: Poisson uncertainty, no background estimate.
    pub fn from_counts(counts: Array1<f64>) -> Self {
        let n = counts.len();
        Self {
            counts_err: counts.mapv(f64::sqrt),
            counts,
            background: Array1::zeros(n),
            background_err: Array1::zeros(n),
        }
    }
}

/// Raw arrays of one polarisation channel. All arrays share one length.
#[derive(Clone, Debug)]
pub struct DataSet {
    /// Provenance shared by all channels of the input file.
    pub header: Arc<DataSetMetadata>,
    pub measurement: MeasurementData,
    /// Incident angle in degrees.
    pub theta: Array1<f64>,
    pub time: Array1<f64>,
    pub monitor: Array1<f64>,
    pub counts: Array1<f64>,
    pub counts_err: Array1<f64>,
    pub background: Array1<f64>,
    pub background_err: Array1<f64>,
}

impl DataSet {
    /// Assemble a channel, checking every array against `theta`.
    pub fn new(
        header: Arc<DataSetMetadata>,
        measurement: MeasurementData,
        theta: Array1<f64>,
        time: Array1<f64>,
        monitor: Array1<f64>,
        signal: Signal,
    ) -> Result<Self, ReductionError> {
        let len = theta.len();
        let arrays: [(&'static str, usize); 6] = [
            ("time", time.len()),
            ("monitor", monitor.len()),
            ("counts", signal.counts.len()),
            ("counts_err", signal.counts_err.len()),
            ("background", signal.background.len()),
            ("background_err", signal.background_err.len()),
        ];
        if let Some(&(name, actual)) = arrays.iter().find(|(_, n)| *n != len) {
            return Err(ReductionError::LengthMismatch {
                name,
                expected: len,
                actual,
            });
        }

        Ok(Self {
            header,
            measurement,
            theta,
            time,
            monitor,
            counts: signal.counts,
            counts_err: signal.counts_err,
            background: signal.background,
            background_err: signal.background_err,
        })
    }

    /// Number of scan points.
    #[inline]
    pub fn len(&self) -> usize {
        self.theta.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.theta.is_empty()
    }

    #[inline]
    pub fn polarization(&self) -> Polarization {
        self.measurement.instrument_settings.polarization
    }

    #[inline]
    pub fn wavelength(&self) -> f64 {
        self.measurement.instrument_settings.wavelength
    }

    #[inline]
    pub fn slits(&self) -> &SlitData {
        &self.measurement.instrument_settings.slit_configuration
    }
}

/// Momentum transfer and its resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct QResolution {
    pub q: Array1<f64>,
    pub dq: Array1<f64>,
}

/// Reflectivity and its uncertainty.
#[derive(Clone, Debug, PartialEq)]
pub struct Reflectivity {
    pub r: Array1<f64>,
    pub dr: Array1<f64>,
}

impl Reflectivity {
    /// Largest reflectivity value, `None` when empty.
    pub fn max(&self) -> Option<f64> {
        self.r.iter().copied().reduce(f64::max)
    }

    /// Divide R and dR by `divisor`.
    pub fn scale_down(&mut self, divisor: f64) {
        self.r.mapv_inplace(|v| v / divisor);
        self.dr.mapv_inplace(|v| v / divisor);
    }
}

/// Channel data in pipeline state `S`.
#[derive(Clone, Debug)]
pub struct Channel<S> {
    pub dataset: DataSet,
    pub state: S,
}

impl<S> Channel<S> {
    pub fn new(dataset: DataSet, state: S) -> Self {
        Self { dataset, state }
    }

    /// Move to the next pipeline state.
    pub fn advance<T>(self, state: T) -> Channel<T> {
        Channel {
            dataset: self.dataset,
            state,
        }
    }
}

/// Raw arrays pulled from the provider.
#[derive(Clone, Debug)]
pub struct Extracted;

/// Q and dQ computed.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub resolution: QResolution,
}

/// Footprint/absorption coefficient computed.
#[derive(Clone, Debug)]
pub struct Corrected {
    pub resolution: QResolution,
    pub correction: Array1<f64>,
}

/// Monitor/time coefficient computed and R, dR formed.
#[derive(Clone, Debug)]
pub struct Normalized {
    pub resolution: QResolution,
    pub normalisation: Array1<f64>,
    pub reflectivity: Reflectivity,
}

#[derive(Clone, Debug)]
pub struct BackgroundAdjusted {
    pub resolution: QResolution,
    pub reflectivity: Reflectivity,
}

#[derive(Clone, Debug)]
pub struct IntensityNormalized {
    pub resolution: QResolution,
    pub reflectivity: Reflectivity,
}

/// Final Q, dQ, R, dR columns of one channel.
#[derive(Clone, Debug, PartialEq)]
pub struct DataSetOutput {
    pub q: Array1<f64>,
    pub dq: Array1<f64>,
    pub r: Array1<f64>,
    pub dr: Array1<f64>,
}

impl DataSetOutput {
    pub fn new(resolution: QResolution, reflectivity: Reflectivity) -> Self {
        Self {
            q: resolution.q,
            dq: resolution.dq,
            r: reflectivity.r,
            dr: reflectivity.dr,
        }
    }

    /// Columns `[Q, dQ, R, dR]` as an `n x 4` table.
    pub fn table(&self) -> Array2<f64> {
        stack(
            Axis(1),
            &[self.q.view(), self.dq.view(), self.r.view(), self.dr.view()],
        )
        .unwrap_or_else(|_| Array2::zeros((0, 4)))
    }
}

/// A fully reduced channel.
pub type ReducedDataSet = Channel<DataSetOutput>;
