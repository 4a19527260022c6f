//! Metadata providers: the read-only query surface over one raw input file.
//!
//! Implementors supply raw columns and provenance; per-channel views,
//! polarisation channels and instrument settings are derived from those by
//! the provided methods of [`MetadataProvider`].

pub mod literal;
pub mod memory;
pub mod scan_log;

pub use memory::MemoryProvider;
pub use scan_log::{ScanLog, ScanLogProvider};

use crate::data::{
    channels_for, DataSetMetadata, ExperimentData, FlipperStates, InstrumentSettings,
    MeasurementData, PersonData, PolarisationEfficiency, Polarization, SampleData, SlitData,
};
use crate::error::ProviderError;
use ndarray::{Array, Array1, Array3, Axis, RemoveAxis};
use serde::{Deserialize, Serialize};

/// Instrument device and column names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceNames {
    /// Incident angle axis.
    pub theta: String,
    pub monitor: String,
    pub time: String,
    /// Position-sensitive detector delivering 2D frames.
    pub area_detector: String,
    /// Spin-manipulating devices, in channel-code order.
    pub polarisation_devices: [String; 2],
    pub flipper_states: FlipperStates,
    /// First and second collimation slit.
    pub slits: [String; 2],
}

impl Default for DeviceNames {
    fn default() -> Self {
        Self {
            theta: "theta".to_string(),
            monitor: "mon1".to_string(),
            time: "timer".to_string(),
            area_detector: "2Ddata".to_string(),
            polarisation_devices: ["sf1".to_string(), "sf2".to_string()],
            flipper_states: FlipperStates::default(),
            slits: ["slit1".to_string(), "slit2".to_string()],
        }
    }
}

/// Counts of one detector for one channel.
#[derive(Clone, Debug)]
pub enum DetectorCounts {
    /// One value per scan point.
    Point(Array1<f64>),
    /// One `(y, x)` frame per scan point.
    Area(Array3<f64>),
}

/// Scan rows of one polarisation channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelRows {
    /// Matching rows, ascending.
    pub indices: Vec<usize>,
    /// Rows in the scan.
    pub total: usize,
}

impl ChannelRows {
    /// Pick the channel's rows along the first axis of `data`.
    ///
    /// `data` must have one entry per scan row.
    pub fn select<D: RemoveAxis>(
        &self,
        name: &str,
        data: Array<f64, D>,
    ) -> Result<Array<f64, D>, ProviderError> {
        let rows = data.len_of(Axis(0));
        if rows != self.total {
            return Err(ProviderError::LengthMismatch {
                name: name.to_string(),
                expected: self.total,
                actual: rows,
            });
        }
        Ok(data.select(Axis(0), &self.indices))
    }
}

/// Query interface over one raw measurement file.
pub trait MetadataProvider: Send + Sync {
    /// Path of the source file.
    fn file_path(&self) -> &str;

    fn devices(&self) -> &DeviceNames;

    /// Detectors available as signal sources.
    fn detectors(&self) -> Vec<String>;

    /// Devices moved during the scan.
    fn scan_devices(&self) -> Vec<String>;

    /// Numeric column over all scan rows.
    fn column(&self, name: &str) -> Result<Array1<f64>, ProviderError>;

    /// Textual device readings over all scan rows.
    fn state_column(&self, name: &str) -> Result<Vec<String>, ProviderError>;

    /// Area-detector frames over all scan rows.
    fn area_frames(&self, name: &str) -> Result<Array3<f64>, ProviderError> {
        Err(ProviderError::NotAreaDetector(name.to_string()))
    }

    fn angle_unit(&self) -> String {
        "deg".to_string()
    }

    /// Wavelength and its unit.
    fn wavelength(&self) -> Result<(f64, String), ProviderError>;

    fn slit_configuration(&self) -> Result<SlitData, ProviderError>;

    fn owner(&self) -> Result<PersonData, ProviderError>;

    fn experiment(&self) -> Result<ExperimentData, ProviderError>;

    fn sample(&self) -> Result<SampleData, ProviderError>;

    // ------------------------------------------------------------------
    // Derived queries
    // ------------------------------------------------------------------

    fn monitor(&self) -> Result<Array1<f64>, ProviderError> {
        self.column(&self.devices().monitor)
    }

    fn time(&self) -> Result<Array1<f64>, ProviderError> {
        self.column(&self.devices().time)
    }

    /// Polarisation channels present in the scan, never empty.
    fn polarisations(&self) -> Vec<Polarization> {
        channels_for(&self.scan_devices(), &self.devices().polarisation_devices)
    }

    /// Rows belonging to a channel, `None` when every row does.
    ///
    /// Every scanned spin-device column must have the same length.
    fn channel_rows(&self, polarisation: Polarization) -> Result<Option<ChannelRows>, ProviderError> {
        if polarisation == Polarization::Unpolarized {
            return Ok(None);
        }

        let scanned = self.scan_devices();
        let states: Vec<(&String, Vec<String>)> = self
            .devices()
            .polarisation_devices
            .iter()
            .filter(|dev| scanned.contains(dev))
            .map(|dev| self.state_column(dev).map(|column| (dev, column)))
            .collect::<Result<_, _>>()?;

        let total = states.first().map(|(_, c)| c.len()).unwrap_or(0);
        if let Some((dev, column)) = states.iter().find(|(_, c)| c.len() != total) {
            return Err(ProviderError::LengthMismatch {
                name: dev.to_string(),
                expected: total,
                actual: column.len(),
            });
        }

        let flippers = &self.devices().flipper_states;
        let indices = (0..total)
            .filter(|&i| {
                let row: Vec<&str> = states
                    .iter()
                    .filter_map(|(_, c)| c.get(i).map(String::as_str))
                    .collect();
                polarisation.matches(&row, flippers)
            })
            .collect();

        Ok(Some(ChannelRows { indices, total }))
    }

    /// Numeric column restricted to one channel.
    fn channel_column(
        &self,
        name: &str,
        polarisation: Polarization,
    ) -> Result<Array1<f64>, ProviderError> {
        let data = self.column(name)?;
        match self.channel_rows(polarisation)? {
            Some(rows) => rows.select(name, data),
            None => Ok(data),
        }
    }

    fn channel_theta(&self, polarisation: Polarization) -> Result<Array1<f64>, ProviderError> {
        self.channel_column(&self.devices().theta, polarisation)
    }

    fn channel_monitor(&self, polarisation: Polarization) -> Result<Array1<f64>, ProviderError> {
        self.channel_column(&self.devices().monitor, polarisation)
    }

    fn channel_time(&self, polarisation: Polarization) -> Result<Array1<f64>, ProviderError> {
        self.channel_column(&self.devices().time, polarisation)
    }

    /// Detector counts restricted to one channel.
    fn channel_counts(
        &self,
        detector: &str,
        polarisation: Polarization,
    ) -> Result<DetectorCounts, ProviderError> {
        if detector == self.devices().area_detector {
            let frames = self.area_frames(detector)?;
            Ok(DetectorCounts::Area(match self.channel_rows(polarisation)? {
                Some(rows) => rows.select(detector, frames)?,
                None => frames,
            }))
        } else {
            self.channel_column(detector, polarisation)
                .map(DetectorCounts::Point)
        }
    }

    /// Provenance shared by every channel.
    fn header(&self) -> Result<DataSetMetadata, ProviderError> {
        Ok(DataSetMetadata {
            owner: self.owner()?,
            experiment: self.experiment()?,
            sample: self.sample()?,
        })
    }

    fn instrument_settings(
        &self,
        polarisation: Polarization,
    ) -> Result<InstrumentSettings, ProviderError> {
        let theta = self.channel_theta(polarisation)?;
        let (wavelength, wavelength_unit) = self.wavelength()?;
        let incident_angle = if theta.is_empty() {
            (0.0, 0.0)
        } else {
            theta
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                })
        };

        Ok(InstrumentSettings {
            incident_angle,
            angle_unit: self.angle_unit(),
            wavelength,
            wavelength_unit,
            incident_intensity: None,
            polarization: polarisation,
            configuration: None,
            slit_configuration: self.slit_configuration()?,
            polarization_efficiency: PolarisationEfficiency::default(),
        })
    }

    fn measurement(&self, polarisation: Polarization) -> Result<MeasurementData, ProviderError> {
        Ok(MeasurementData::new(
            self.instrument_settings(polarisation)?,
            vec![self.file_path().to_string()],
        ))
    }
}
