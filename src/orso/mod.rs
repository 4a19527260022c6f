//! Exchange-format records of reduced data.
//!
//! One [`OrsoDocument`] holds every channel of one input file. Each
//! [`OrsoDataset`] carries the provenance header and an `n x 4` table of
//! `Q, dQ, R, dR`. All types are `Serialize`, so any serde format can
//! write them.

pub mod narrative;

pub use narrative::corrections;

use crate::config::CorrectionParameters;
use crate::data::{
    DataSetMetadata, ExperimentData, MeasurementData, PersonData, Polarization, ReducedDataSet,
    SampleData,
};
use ndarray::Array2;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Name reported as the reducing software.
pub const SOFTWARE_NAME: &str = "reflred";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Value {
    pub magnitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Value {
    pub fn new(magnitude: f64, unit: Option<&str>) -> Self {
        Self {
            magnitude,
            unit: unit.map(str::to_string),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    pub unit: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValueVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub unit: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrsoSample {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
    /// `x` = length, `y` = height, `z` = thickness.
    pub size: ValueVector,
}

impl From<&SampleData> for OrsoSample {
    fn from(sample: &SampleData) -> Self {
        Self {
            name: sample.name.clone(),
            category: sample.category.clone(),
            composition: sample.composition.clone(),
            description: sample.description.clone(),
            environment: sample.environment.clone(),
            size: ValueVector {
                x: sample.length,
                y: sample.height,
                z: sample.thickness,
                unit: sample.units.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrsoInstrumentSettings {
    pub incident_angle: ValueRange,
    pub wavelength: Value,
    pub polarization: Polarization,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_intensity: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
    pub slit_configuration: BTreeMap<String, Value>,
    pub polarization_efficiency: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrsoMeasurement {
    pub instrument_settings: OrsoInstrumentSettings,
    pub data_files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_files: Vec<String>,
    pub scheme: String,
}

impl From<&MeasurementData> for OrsoMeasurement {
    fn from(measurement: &MeasurementData) -> Self {
        let settings = &measurement.instrument_settings;
        let slits = &settings.slit_configuration;
        let slit_unit = Some(slits.units.as_str());
        let efficiency = &settings.polarization_efficiency;

        let slit_configuration = [
            ("slit1_width", slits.slit1_width),
            ("slit2_width", slits.slit2_width),
            ("slit1_position", slits.slit1_position),
            ("slit2_position", slits.slit2_position),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::new(v, slit_unit)))
        .collect();

        let polarization_efficiency = [
            ("polarizer", efficiency.polarizer),
            ("analyser", efficiency.analyser),
            ("spin_flipper_1", efficiency.spin_flipper_1),
            ("spin_flipper_2", efficiency.spin_flipper_2),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::new(v, None)))
        .collect();

        Self {
            instrument_settings: OrsoInstrumentSettings {
                incident_angle: ValueRange {
                    min: settings.incident_angle.0,
                    max: settings.incident_angle.1,
                    unit: settings.angle_unit.clone(),
                },
                wavelength: Value::new(settings.wavelength, Some(settings.wavelength_unit.as_str())),
                polarization: settings.polarization,
                incident_intensity: settings.incident_intensity.map(|v| Value::new(v, None)),
                configuration: settings.configuration.clone(),
                slit_configuration,
                polarization_efficiency,
            },
            data_files: measurement.data_files.clone(),
            additional_files: measurement.additional_files.clone(),
            scheme: measurement.scheme.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataSource {
    pub owner: PersonData,
    pub experiment: ExperimentData,
    pub sample: OrsoSample,
    pub measurement: OrsoMeasurement,
}

impl DataSource {
    pub fn new(header: &DataSetMetadata, measurement: &MeasurementData) -> Self {
        Self {
            owner: header.owner.clone(),
            experiment: header.experiment.clone(),
            sample: OrsoSample::from(&header.sample),
            measurement: OrsoMeasurement::from(measurement),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Software {
    pub name: String,
    pub version: String,
    pub platform: String,
}

impl Default for Software {
    fn default() -> Self {
        Self {
            name: SOFTWARE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            platform: std::env::consts::OS.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reduction {
    pub software: Software,
    pub call: String,
    pub corrections: Vec<String>,
}

impl Reduction {
    pub fn new(parameters: &CorrectionParameters) -> Self {
        Self {
            software: Software::default(),
            call: parameters.program_call.clone(),
            corrections: corrections(parameters),
        }
    }
}

/// Column description: a value column or the uncertainty of one.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Column {
    Value {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    Error {
        error_of: String,
    },
}

impl Column {
    /// `Q`, `dQ`, `R`, `dR`.
    pub fn reflectivity_columns() -> Vec<Column> {
        vec![
            Column::Value {
                name: "Q".to_string(),
                unit: Some("1/Angstrom".to_string()),
            },
            Column::Error {
                error_of: "Q".to_string(),
            },
            Column::Value {
                name: "R".to_string(),
                unit: None,
            },
            Column::Error {
                error_of: "R".to_string(),
            },
        ]
    }

    /// Short label used in text tables.
    pub fn label(&self) -> String {
        match self {
            Column::Value { name, unit: Some(unit) } => format!("{name} ({unit})"),
            Column::Value { name, unit: None } => name.clone(),
            Column::Error { error_of } => format!("s{error_of}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrsoHeader {
    pub data_source: DataSource,
    pub reduction: Reduction,
    pub columns: Vec<Column>,
}

/// One channel of reduced data.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrsoDataset {
    pub header: OrsoHeader,
    /// `n x 4` table `Q, dQ, R, dR`.
    pub data: Array2<f64>,
}

impl OrsoDataset {
    pub fn new(dataset: &ReducedDataSet, reduction: Reduction) -> Self {
        Self {
            header: OrsoHeader {
                data_source: DataSource::new(&dataset.dataset.header, &dataset.dataset.measurement),
                reduction,
                columns: Column::reflectivity_columns(),
            },
            data: dataset.state.table(),
        }
    }

    /// Write the data as a whitespace-separated table with a `#` column line.
    pub fn write_table<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let labels: Vec<String> = self.header.columns.iter().map(Column::label).collect();
        writeln!(writer, "# {}", labels.join("\t"))?;
        for row in self.data.rows() {
            let fields: Vec<String> = row.iter().map(|v| format!("{v:.12e}")).collect();
            writeln!(writer, "{}", fields.join("\t"))?;
        }
        Ok(())
    }
}

/// All channels of one input file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrsoDocument {
    pub datasets: Vec<OrsoDataset>,
}

impl OrsoDocument {
    /// Map reduced channels to exchange records sharing one narrative.
    pub fn assemble(datasets: &[ReducedDataSet], parameters: &CorrectionParameters) -> Self {
        let reduction = Reduction::new(parameters);
        Self {
            datasets: datasets
                .iter()
                .map(|d| OrsoDataset::new(d, reduction.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::{make_header, make_measurement};
    use crate::data::{Channel, DataSet, DataSetOutput, Signal};
    use ndarray::array;

    fn reduced(polarization: Polarization) -> ReducedDataSet {
        let dataset = DataSet::new(
            make_header(),
            make_measurement(polarization),
            array![0.1, 1.0],
            array![1.0, 1.0],
            array![1.0, 1.0],
            Signal::from_counts(array![1.0, 1.0]),
        )
        .unwrap();
        Channel::new(
            dataset,
            DataSetOutput {
                q: array![0.01, 0.02],
                dq: array![0.001, 0.002],
                r: array![1.0, 0.5],
                dr: array![0.1, 0.05],
            },
        )
    }

    #[test]
    fn test_assemble_per_channel() {
        let params = CorrectionParameters::default();
        let doc = OrsoDocument::assemble(
            &[reduced(Polarization::Mo), reduced(Polarization::Po)],
            &params,
        );

        assert_eq!(doc.len(), 2);
        let first = &doc.datasets[0];
        assert_eq!(first.data.dim(), (2, 4));
        assert_eq!(first.data.row(0).to_vec(), vec![0.01, 0.001, 1.0, 0.1]);

        let settings = &first.header.data_source.measurement.instrument_settings;
        assert_eq!(settings.polarization, Polarization::Mo);
        assert_eq!((settings.incident_angle.min, settings.incident_angle.max), (0.1, 1.0));
        assert_eq!(settings.slit_configuration["slit2_width"].magnitude, 0.5);
        assert_eq!(
            doc.datasets[1].header.data_source.measurement.instrument_settings.polarization,
            Polarization::Po
        );

        let sample = &first.header.data_source.sample;
        assert_eq!((sample.size.x, sample.size.y, sample.size.z), (20.0, 10.0, 0.5));
        assert_eq!(first.header.reduction.software.name, SOFTWARE_NAME);
        assert_eq!(first.header.reduction.corrections, corrections(&params));
    }

    #[test]
    fn test_columns() {
        let labels: Vec<_> = Column::reflectivity_columns().iter().map(Column::label).collect();
        assert_eq!(labels, vec!["Q (1/Angstrom)", "sQ", "R", "sR"]);
    }

    #[test]
    fn test_write_table() {
        let doc = OrsoDocument::assemble(&[reduced(Polarization::Unpolarized)], &Default::default());
        let mut out = Vec::new();
        doc.datasets[0].write_table(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("# Q (1/Angstrom)"));
        let values: Vec<f64> = lines[2].split('\t').map(|v| v.parse().unwrap()).collect();
        assert_eq!(values, vec![0.02, 0.002, 0.5, 0.05]);
    }
}
