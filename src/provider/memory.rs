//! In-memory provider, used by the C interface and in tests.

use super::{DeviceNames, MetadataProvider};
use crate::data::{DataSetMetadata, ExperimentData, PersonData, SampleData, SlitData};
use crate::error::ProviderError;
use ndarray::{Array1, Array3};
use std::collections::HashMap;

/// Provider over columns supplied directly by the caller.
#[derive(Clone, Debug)]
pub struct MemoryProvider {
    path: String,
    devices: DeviceNames,
    header: DataSetMetadata,
    slits: SlitData,
    wavelength: f64,
    scan_devices: Vec<String>,
    detectors: Vec<String>,
    columns: HashMap<String, Array1<f64>>,
    states: HashMap<String, Vec<String>>,
    frames: HashMap<String, Array3<f64>>,
}

impl MemoryProvider {
    /// Create an empty provider. The wavelength is in Å.
    pub fn new(
        path: impl Into<String>,
        header: DataSetMetadata,
        slits: SlitData,
        wavelength: f64,
    ) -> Self {
        Self {
            path: path.into(),
            devices: DeviceNames::default(),
            header,
            slits,
            wavelength,
            scan_devices: Vec::new(),
            detectors: Vec::new(),
            columns: HashMap::new(),
            states: HashMap::new(),
            frames: HashMap::new(),
        }
    }

    pub fn with_devices(mut self, devices: DeviceNames) -> Self {
        self.devices = devices;
        self
    }

    /// Add a numeric column for a device moved during the scan.
    pub fn with_scan_column(mut self, name: &str, data: Array1<f64>) -> Self {
        self.push_scan_device(name);
        self.columns.insert(name.to_string(), data);
        self
    }

    /// Add the textual readings of a scanned device, e.g. a spin flipper.
    pub fn with_state_column(mut self, name: &str, states: &[&str]) -> Self {
        self.push_scan_device(name);
        self.states.insert(
            name.to_string(),
            states.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Add a numeric column that is neither detector nor scan device.
    pub fn with_column(mut self, name: &str, data: Array1<f64>) -> Self {
        self.columns.insert(name.to_string(), data);
        self
    }

    /// Add a point detector.
    pub fn with_detector(mut self, name: &str, counts: Array1<f64>) -> Self {
        self.push_detector(name);
        self.columns.insert(name.to_string(), counts);
        self
    }

    /// Add an area detector with frames shaped `(point, y, x)`.
    pub fn with_area_detector(mut self, name: &str, frames: Array3<f64>) -> Self {
        self.push_detector(name);
        self.frames.insert(name.to_string(), frames);
        self
    }

    fn push_scan_device(&mut self, name: &str) {
        if !self.scan_devices.iter().any(|d| d == name) {
            self.scan_devices.push(name.to_string());
        }
    }

    fn push_detector(&mut self, name: &str) {
        if !self.detectors.iter().any(|d| d == name) {
            self.detectors.push(name.to_string());
        }
    }
}

impl MetadataProvider for MemoryProvider {
    fn file_path(&self) -> &str {
        &self.path
    }

    fn devices(&self) -> &DeviceNames {
        &self.devices
    }

    fn detectors(&self) -> Vec<String> {
        self.detectors.clone()
    }

    fn scan_devices(&self) -> Vec<String> {
        self.scan_devices.clone()
    }

    fn column(&self, name: &str) -> Result<Array1<f64>, ProviderError> {
        self.columns
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::MissingColumn(name.to_string()))
    }

    fn state_column(&self, name: &str) -> Result<Vec<String>, ProviderError> {
        if let Some(states) = self.states.get(name) {
            return Ok(states.clone());
        }
        // numeric readings double as states
        self.column(name)
            .map(|c| c.iter().map(|v| v.to_string()).collect())
    }

    fn area_frames(&self, name: &str) -> Result<Array3<f64>, ProviderError> {
        self.frames
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::NotAreaDetector(name.to_string()))
    }

    fn wavelength(&self) -> Result<(f64, String), ProviderError> {
        Ok((self.wavelength, "A".to_string()))
    }

    fn slit_configuration(&self) -> Result<SlitData, ProviderError> {
        Ok(self.slits.clone())
    }

    fn owner(&self) -> Result<PersonData, ProviderError> {
        Ok(self.header.owner.clone())
    }

    fn experiment(&self) -> Result<ExperimentData, ProviderError> {
        Ok(self.header.experiment.clone())
    }

    fn sample(&self) -> Result<SampleData, ProviderError> {
        Ok(self.header.sample.clone())
    }
}
