//! C-compatible type definitions for FFI.

use crate::config::{
    AbsorptionSource, BackgroundCorrection, CorrectionParameters, IntensityNormalisation,
    Material,
};
use crate::data::{SampleData, SlitData};
use crate::error::{ProviderError, ReductionError};

/// Result status codes for FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflStatus {
    /// Operation succeeded.
    Ok = 0,
    /// Null pointer was passed.
    NullPointer = 1,
    /// Invalid argument, including unknown mode codes.
    InvalidArgument = 2,
    /// Array length mismatch.
    LengthMismatch = 3,
    /// Configuration rejected before reduction.
    ConfigError = 4,
    /// Requested correction is not available.
    Unimplemented = 5,
    /// Reduction failed on the data.
    ReductionError = 6,
}

impl From<&ReductionError> for ReflStatus {
    fn from(err: &ReductionError) -> Self {
        match err {
            ReductionError::Config(_) => ReflStatus::ConfigError,
            ReductionError::Unimplemented(_) => ReflStatus::Unimplemented,
            ReductionError::LengthMismatch { .. }
            | ReductionError::Provider(ProviderError::LengthMismatch { .. }) => {
                ReflStatus::LengthMismatch
            }
            _ => ReflStatus::ReductionError,
        }
    }
}

/// C-compatible array view (pointer + length).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CArrayView {
    pub data: *const f64,
    pub len: usize,
}

impl CArrayView {
    pub fn empty() -> Self {
        Self {
            data: std::ptr::null(),
            len: 0,
        }
    }

    pub fn from_slice(values: &[f64]) -> Self {
        Self {
            data: values.as_ptr(),
            len: values.len(),
        }
    }
}

/// Two-slit collimation geometry in millimetres.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CSlitData {
    pub slit1_width: f64,
    pub slit2_width: f64,
    pub slit1_position: f64,
    pub slit2_position: f64,
}

impl From<CSlitData> for SlitData {
    fn from(c: CSlitData) -> Self {
        SlitData::new(
            c.slit1_width,
            c.slit2_width,
            c.slit1_position,
            c.slit2_position,
        )
    }
}

/// Sample dimensions in millimetres.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CSampleGeometry {
    pub length: f64,
    pub thickness: f64,
    pub height: f64,
}

impl CSampleGeometry {
    pub fn to_sample(self, name: &str) -> SampleData {
        SampleData::new(name).with_dimensions(self.length, self.thickness, self.height)
    }
}

pub const REFL_ABSORPTION_NONE: u32 = 0;
pub const REFL_ABSORPTION_VALUE: u32 = 1;
pub const REFL_ABSORPTION_MATERIAL: u32 = 2;

pub const REFL_MATERIAL_GLASS: u32 = 0;
pub const REFL_MATERIAL_SI: u32 = 1;
pub const REFL_MATERIAL_SIO2: u32 = 2;
pub const REFL_MATERIAL_AL2O3: u32 = 3;

pub const REFL_INTENSITY_NONE: u32 = 0;
pub const REFL_INTENSITY_CONSTANT: u32 = 1;
pub const REFL_INTENSITY_DATASET_MAX: u32 = 2;
pub const REFL_INTENSITY_GLOBAL_MAX: u32 = 3;

pub const REFL_BACKGROUND_NONE: u32 = 0;
pub const REFL_BACKGROUND_CONSTANT: u32 = 1;

/// Flat reduction configuration for point-detector data.
///
/// Mode fields take the `REFL_*` codes; the matching `*_value` field is
/// read only when the mode needs it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CReductionParams {
    pub footprint: bool,
    pub absorption_mode: u32,
    pub absorption_value: f64,
    pub absorption_material: u32,
    pub polarisation: bool,
    pub time_normalisation: bool,
    pub monitor_normalisation: bool,
    pub intensity_mode: u32,
    pub intensity_value: f64,
    pub background_mode: u32,
    pub background_value: f64,
    /// Relative wavelength spread `dλ/λ`.
    pub wavelength_resolution: f64,
}

impl Default for CReductionParams {
    fn default() -> Self {
        Self {
            footprint: true,
            absorption_mode: REFL_ABSORPTION_VALUE,
            absorption_value: 0.0,
            absorption_material: REFL_MATERIAL_GLASS,
            polarisation: false,
            time_normalisation: true,
            monitor_normalisation: true,
            intensity_mode: REFL_INTENSITY_CONSTANT,
            intensity_value: 1.0,
            background_mode: REFL_BACKGROUND_CONSTANT,
            background_value: 1e-12,
            wavelength_resolution: crate::config::DEFAULT_WAVELENGTH_RESOLUTION,
        }
    }
}

impl TryFrom<CReductionParams> for CorrectionParameters {
    type Error = ReflStatus;

    fn try_from(c: CReductionParams) -> Result<Self, Self::Error> {
        let material = match c.absorption_material {
            REFL_MATERIAL_GLASS => Material::Glass,
            REFL_MATERIAL_SI => Material::Si,
            REFL_MATERIAL_SIO2 => Material::SiO2,
            REFL_MATERIAL_AL2O3 => Material::Al2O3,
            _ => return Err(ReflStatus::InvalidArgument),
        };
        let absorption = match c.absorption_mode {
            REFL_ABSORPTION_NONE => None,
            REFL_ABSORPTION_VALUE => Some(AbsorptionSource::Value(c.absorption_value)),
            REFL_ABSORPTION_MATERIAL => Some(AbsorptionSource::Material(material)),
            _ => return Err(ReflStatus::InvalidArgument),
        };
        let intensity = match c.intensity_mode {
            REFL_INTENSITY_NONE => None,
            REFL_INTENSITY_CONSTANT => Some(IntensityNormalisation::Constant(c.intensity_value)),
            REFL_INTENSITY_DATASET_MAX => Some(IntensityNormalisation::DatasetMaximum),
            REFL_INTENSITY_GLOBAL_MAX => Some(IntensityNormalisation::GlobalMaximum),
            _ => return Err(ReflStatus::InvalidArgument),
        };
        let background = match c.background_mode {
            REFL_BACKGROUND_NONE => None,
            REFL_BACKGROUND_CONSTANT => Some(BackgroundCorrection::Constant(c.background_value)),
            _ => return Err(ReflStatus::InvalidArgument),
        };
        if !(c.wavelength_resolution.is_finite() && c.wavelength_resolution >= 0.0) {
            return Err(ReflStatus::InvalidArgument);
        }

        let mut params = CorrectionParameters {
            program_call: "reflred C interface".to_string(),
            wavelength_resolution: c.wavelength_resolution,
            ..Default::default()
        };
        params.reduction.footprint = c.footprint;
        params.reduction.absorption = absorption;
        params.reduction.polarisation = c.polarisation;
        params.normalisation.time = c.time_normalisation;
        params.normalisation.monitor = c.monitor_normalisation;
        params.normalisation.intensity = intensity;
        params.background.correction = background;
        Ok(params)
    }
}
