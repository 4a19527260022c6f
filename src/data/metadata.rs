//! Provenance and instrument metadata carried alongside the scan arrays.

use super::polarization::Polarization;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Facility reported when a data file does not name one.
pub const DEFAULT_FACILITY: &str = "MLZ";
/// Affiliation reported when a data file does not name one.
pub const DEFAULT_AFFILIATION: &str = "JCNS";

/// Two-slit collimation geometry.
///
/// Positions are signed distances from the sample; widths and positions
/// share `units`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlitData {
    pub slit1_width: f64,
    pub slit2_width: f64,
    pub slit1_position: f64,
    pub slit2_position: f64,
    pub units: String,
}

impl SlitData {
    pub fn new(
        slit1_width: f64,
        slit2_width: f64,
        slit1_position: f64,
        slit2_position: f64,
    ) -> Self {
        Self {
            slit1_width,
            slit2_width,
            slit1_position,
            slit2_position,
            units: "mm".to_string(),
        }
    }

    /// Distance between the two slits.
    pub fn separation(&self) -> f64 {
        (self.slit1_position - self.slit2_position).abs()
    }
}

/// Polarisation efficiencies of the spin-manipulating components.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolarisationEfficiency {
    pub polarizer: f64,
    pub analyser: f64,
    pub spin_flipper_1: f64,
    pub spin_flipper_2: f64,
}

impl Default for PolarisationEfficiency {
    fn default() -> Self {
        Self {
            polarizer: 1.0,
            analyser: 1.0,
            spin_flipper_1: 1.0,
            spin_flipper_2: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonData {
    pub name: String,
    pub affiliation: String,
    pub contact: Option<String>,
}

impl PersonData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: DEFAULT_AFFILIATION.to_string(),
            contact: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentData {
    pub title: String,
    pub instrument: String,
    pub start_date: NaiveDateTime,
    pub proposal_id: Option<String>,
    pub doi: Option<String>,
    /// Radiation used, `"neutron"` or `"x-ray"`.
    pub probe: String,
    pub facility: String,
}

impl ExperimentData {
    pub fn new(
        title: impl Into<String>,
        instrument: impl Into<String>,
        start_date: NaiveDateTime,
    ) -> Self {
        Self {
            title: title.into(),
            instrument: instrument.into(),
            start_date,
            proposal_id: None,
            doi: None,
            probe: "neutron".to_string(),
            facility: DEFAULT_FACILITY.to_string(),
        }
    }
}

/// Sample description. Dimensions are in `units` (millimetres by default).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleData {
    pub name: String,
    pub category: Option<String>,
    pub composition: Option<String>,
    pub description: Option<String>,
    pub environment: Vec<String>,
    pub length: f64,
    pub thickness: f64,
    pub height: f64,
    pub units: String,
}

impl SampleData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            composition: None,
            description: None,
            environment: Vec::new(),
            length: 0.0,
            thickness: 0.0,
            height: 0.0,
            units: "mm".to_string(),
        }
    }

    pub fn with_dimensions(mut self, length: f64, thickness: f64, height: f64) -> Self {
        self.length = length;
        self.thickness = thickness;
        self.height = height;
        self
    }
}

/// Instrument settings of one polarisation channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSettings {
    /// Incident angle range `(min, max)`.
    pub incident_angle: (f64, f64),
    pub angle_unit: String,
    pub wavelength: f64,
    pub wavelength_unit: String,
    pub incident_intensity: Option<f64>,
    pub polarization: Polarization,
    pub configuration: Option<String>,
    pub slit_configuration: SlitData,
    pub polarization_efficiency: PolarisationEfficiency,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementData {
    pub instrument_settings: InstrumentSettings,
    pub data_files: Vec<String>,
    pub additional_files: Vec<String>,
    pub scheme: String,
}

impl MeasurementData {
    pub fn new(instrument_settings: InstrumentSettings, data_files: Vec<String>) -> Self {
        Self {
            instrument_settings,
            data_files,
            additional_files: Vec::new(),
            scheme: "angle-dispersive".to_string(),
        }
    }
}

/// File-level provenance shared read-only by every channel of one input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataSetMetadata {
    pub owner: PersonData,
    pub experiment: ExperimentData,
    pub sample: SampleData,
}
