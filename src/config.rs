//! Reduction configuration.
//!
//! [`CorrectionParameters`] is the validated configuration used by the
//! pipeline. Every correction mode is a closed enum carrying exactly the
//! values that mode needs. Configuration files use a flat TOML schema with
//! one table per group; it is converted with [`CorrectionParameters::from_toml_str`].

use crate::data::Region;
use crate::error::{ConfigError, Feature, ReductionError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Detector used when none is configured.
pub const DEFAULT_DETECTOR: &str = "det";
/// Relative wavelength spread `dλ/λ` of the monochromator.
pub const DEFAULT_WAVELENGTH_RESOLUTION: f64 = 0.05;

/// Tabulated linear absorption coefficients of common substrates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Material {
    #[serde(rename = "glass")]
    Glass,
    Si,
    SiO2,
    Al2O3,
}

impl Material {
    /// Linear absorption coefficient (1/mm/Å).
    pub fn mu(&self) -> f64 {
        match self {
            Material::Glass => 0.0001667,
            Material::Si => 0.0000556,
            Material::SiO2 => 0.0000278,
            Material::Al2O3 => 0.0000278,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Material::Glass => "glass",
            Material::Si => "Si",
            Material::SiO2 => "SiO2",
            Material::Al2O3 => "Al2O3",
        }
    }
}

/// Where the absorption coefficient comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AbsorptionSource {
    Value(f64),
    Material(Material),
}

impl AbsorptionSource {
    pub fn mu(&self) -> f64 {
        match self {
            AbsorptionSource::Value(mu) => *mu,
            AbsorptionSource::Material(m) => m.mu(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum IntensityNormalisation {
    /// Divide by a fixed value.
    Constant(f64),
    /// Divide by the maximum R of each channel.
    DatasetMaximum,
    /// Divide by the maximum R over all channels of the file.
    GlobalMaximum,
    /// Derive the scale from a detector region at one scan point. Not available.
    DetectorRegion { point: usize, region: Option<Region> },
}

#[derive(Clone, Debug, PartialEq)]
pub enum BackgroundCorrection {
    /// Subtract a fixed value from R.
    Constant(f64),
    /// Subtract a per-point estimate averaged over a detector region.
    DetectorRegion(Region),
    /// Subtract a measured background file. Not available.
    File(PathBuf),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataSourceConfig {
    pub detector: String,
    /// Signal region on the area detector.
    pub region: Option<Region>,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            detector: DEFAULT_DETECTOR.to_string(),
            region: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalisationConfig {
    pub time: bool,
    pub monitor: bool,
    /// `None` disables intensity normalisation.
    pub intensity: Option<IntensityNormalisation>,
}

impl Default for NormalisationConfig {
    fn default() -> Self {
        Self {
            time: true,
            monitor: true,
            intensity: Some(IntensityNormalisation::Constant(1.0)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReductionConfig {
    pub footprint: bool,
    /// `None` disables absorption correction.
    pub absorption: Option<AbsorptionSource>,
    pub polarisation: bool,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            footprint: true,
            absorption: Some(AbsorptionSource::Value(0.0)),
            polarisation: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundConfig {
    /// `None` disables background correction.
    pub correction: Option<BackgroundCorrection>,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            correction: Some(BackgroundCorrection::Constant(1e-12)),
        }
    }
}

/// Complete configuration of one reduction.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrectionParameters {
    pub data_source: DataSourceConfig,
    pub normalisation: NormalisationConfig,
    pub reduction: ReductionConfig,
    pub background: BackgroundConfig,
    /// Free-form record of how the reduction was invoked.
    pub program_call: String,
    /// Relative wavelength spread used for dQ.
    pub wavelength_resolution: f64,
}

impl Default for CorrectionParameters {
    fn default() -> Self {
        Self {
            data_source: DataSourceConfig::default(),
            normalisation: NormalisationConfig::default(),
            reduction: ReductionConfig::default(),
            background: BackgroundConfig::default(),
            program_call: String::new(),
            wavelength_resolution: DEFAULT_WAVELENGTH_RESOLUTION,
        }
    }
}

impl CorrectionParameters {
    /// Parse a TOML configuration document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ParametersFile = toml::from_str(text)?;
        Self::try_from(file)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the configuration against the detectors a provider offers.
    ///
    /// `area_detector` names the 2D position-sensitive detector.
    pub fn validate(&self, detectors: &[String], area_detector: &str) -> Result<(), ConfigError> {
        for region in self.regions() {
            if !region.is_valid() {
                return Err(ConfigError::InvalidRegion(region));
            }
        }

        let detector = &self.data_source.detector;
        if !detectors.iter().any(|d| d == detector) {
            return Err(ConfigError::UnknownDetector {
                name: detector.clone(),
                available: detectors.to_vec(),
            });
        }

        let is_area = detector == area_detector;
        if is_area && self.data_source.region.is_none() {
            return Err(ConfigError::MissingRegion {
                detector: detector.clone(),
            });
        }

        if is_area
            && matches!(
                self.background.correction,
                Some(BackgroundCorrection::DetectorRegion(_))
            )
        {
            return Err(ConfigError::RegionBackgroundOnAreaDetector {
                detector: detector.clone(),
            });
        }

        Ok(())
    }

    /// Every region the configuration names.
    fn regions(&self) -> impl Iterator<Item = Region> + '_ {
        let background = match &self.background.correction {
            Some(BackgroundCorrection::DetectorRegion(region)) => Some(*region),
            _ => None,
        };
        let intensity = match &self.normalisation.intensity {
            Some(IntensityNormalisation::DetectorRegion { region, .. }) => *region,
            _ => None,
        };
        self.data_source.region.into_iter().chain(background).chain(intensity)
    }

    /// Reject corrections that can be configured but are not available.
    pub fn check_supported(&self) -> Result<(), ReductionError> {
        if self.reduction.polarisation {
            return Err(ReductionError::Unimplemented(Feature::PolarisationCorrection));
        }
        if let Some(BackgroundCorrection::File(_)) = self.background.correction {
            return Err(ReductionError::Unimplemented(Feature::BackgroundFromFile));
        }
        if let Some(IntensityNormalisation::DetectorRegion { .. }) = self.normalisation.intensity {
            return Err(ReductionError::Unimplemented(
                Feature::RegionIntensityNormalisation,
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum IntensityMode {
    ConstValue,
    MaxValueDataset,
    MaxValueGlobal,
    PsdRegion,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum MuType {
    ConstValue,
    Typical,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum BackgroundMode {
    ConstValue,
    PsdRegion,
    ExtraFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DataSourceSection {
    detector: String,
    region: Option<Region>,
}

impl Default for DataSourceSection {
    fn default() -> Self {
        Self {
            detector: DEFAULT_DETECTOR.to_string(),
            region: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct NormalisationSection {
    time: bool,
    monitor: bool,
    intensity_norm: bool,
    intensity_norm_type: IntensityMode,
    intensity_value: f64,
    intensity_point_number: usize,
    intensity_region: Option<Region>,
}

impl Default for NormalisationSection {
    fn default() -> Self {
        Self {
            time: true,
            monitor: true,
            intensity_norm: true,
            intensity_norm_type: IntensityMode::ConstValue,
            intensity_value: 1.0,
            intensity_point_number: 1,
            intensity_region: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ReductionSection {
    foot_print_correction: bool,
    absorption_correction: bool,
    polarisation_correction: bool,
    mu_type: MuType,
    mu_material: Material,
    mu_value: f64,
}

impl Default for ReductionSection {
    fn default() -> Self {
        Self {
            foot_print_correction: true,
            absorption_correction: true,
            polarisation_correction: false,
            mu_type: MuType::ConstValue,
            mu_material: Material::Glass,
            mu_value: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct BackgroundSection {
    use_correction: bool,
    correction_type: BackgroundMode,
    value: f64,
    file: Option<PathBuf>,
    region: Option<Region>,
}

impl Default for BackgroundSection {
    fn default() -> Self {
        Self {
            use_correction: true,
            correction_type: BackgroundMode::ConstValue,
            value: 1e-12,
            file: None,
            region: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ParametersFile {
    data_source: DataSourceSection,
    normalisation: NormalisationSection,
    reduction: ReductionSection,
    background: BackgroundSection,
    program_call: String,
    wavelength_resolution: f64,
}

impl Default for ParametersFile {
    fn default() -> Self {
        Self {
            data_source: DataSourceSection::default(),
            normalisation: NormalisationSection::default(),
            reduction: ReductionSection::default(),
            background: BackgroundSection::default(),
            program_call: String::new(),
            wavelength_resolution: DEFAULT_WAVELENGTH_RESOLUTION,
        }
    }
}

fn checked(region: Option<Region>) -> Result<Option<Region>, ConfigError> {
    match region {
        Some(r) if !r.is_valid() => Err(ConfigError::InvalidRegion(r)),
        other => Ok(other),
    }
}

impl TryFrom<ParametersFile> for CorrectionParameters {
    type Error = ConfigError;

    fn try_from(file: ParametersFile) -> Result<Self, Self::Error> {
        let norm = file.normalisation;
        let intensity = if norm.intensity_norm {
            Some(match norm.intensity_norm_type {
                IntensityMode::ConstValue => IntensityNormalisation::Constant(norm.intensity_value),
                IntensityMode::MaxValueDataset => IntensityNormalisation::DatasetMaximum,
                IntensityMode::MaxValueGlobal => IntensityNormalisation::GlobalMaximum,
                IntensityMode::PsdRegion => IntensityNormalisation::DetectorRegion {
                    point: norm.intensity_point_number,
                    region: checked(norm.intensity_region)?,
                },
            })
        } else {
            None
        };

        let red = file.reduction;
        let absorption = red.absorption_correction.then(|| match red.mu_type {
            MuType::ConstValue => AbsorptionSource::Value(red.mu_value),
            MuType::Typical => AbsorptionSource::Material(red.mu_material),
        });

        let bg = file.background;
        let correction = if bg.use_correction {
            Some(match bg.correction_type {
                BackgroundMode::ConstValue => BackgroundCorrection::Constant(bg.value),
                BackgroundMode::PsdRegion => BackgroundCorrection::DetectorRegion(
                    checked(bg.region)?.ok_or(ConfigError::MissingBackgroundRegion)?,
                ),
                BackgroundMode::ExtraFile => {
                    BackgroundCorrection::File(bg.file.unwrap_or_default())
                }
            })
        } else {
            None
        };

        Ok(Self {
            data_source: DataSourceConfig {
                detector: file.data_source.detector,
                region: checked(file.data_source.region)?,
            },
            normalisation: NormalisationConfig {
                time: norm.time,
                monitor: norm.monitor,
                intensity,
            },
            reduction: ReductionConfig {
                footprint: red.foot_print_correction,
                absorption,
                polarisation: red.polarisation_correction,
            },
            background: BackgroundConfig { correction },
            program_call: file.program_call,
            wavelength_resolution: file.wavelength_resolution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detectors() -> Vec<String> {
        vec!["det".to_string(), "2Ddata".to_string()]
    }

    #[test]
    fn test_empty_document_gives_defaults() {
        let params = CorrectionParameters::from_toml_str("").unwrap();
        assert_eq!(params, CorrectionParameters::default());
    }

    #[test]
    fn test_parse_full_document() {
        let text = r#"
            program_call = "reflred scan.dat"
            wavelength_resolution = 0.02

            [data_source]
            detector = "det"

            [normalisation]
            time = false
            intensity_norm_type = "max_value_global"

            [reduction]
            foot_print_correction = false
            mu_type = "typical"
            mu_material = "Si"

            [background]
            correction_type = "psd_region"
            region = [0, 4, 10, 20]
        "#;
        let params = CorrectionParameters::from_toml_str(text).unwrap();

        assert!(!params.normalisation.time);
        assert!(params.normalisation.monitor);
        assert_eq!(
            params.normalisation.intensity,
            Some(IntensityNormalisation::GlobalMaximum)
        );
        assert!(!params.reduction.footprint);
        assert_eq!(
            params.reduction.absorption,
            Some(AbsorptionSource::Material(Material::Si))
        );
        assert_eq!(
            params.background.correction,
            Some(BackgroundCorrection::DetectorRegion(Region::new(0, 4, 10, 20)))
        );
        assert_eq!(params.wavelength_resolution, 0.02);
        assert_eq!(params.program_call, "reflred scan.dat");
    }

    #[test]
    fn test_region_background_without_region() {
        let text = r#"
            [background]
            correction_type = "psd_region"
        "#;
        let err = CorrectionParameters::from_toml_str(text).unwrap_err();
        assert!(matches!(err, ConfigError::MissingBackgroundRegion));
    }

    #[test]
    fn test_inverted_region_rejected() {
        let text = r#"
            [data_source]
            detector = "2Ddata"
            region = [10, 2, 0, 5]
        "#;
        let err = CorrectionParameters::from_toml_str(text).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegion(_)));
    }

    #[test]
    fn test_disabled_groups() {
        let text = r#"
            [normalisation]
            intensity_norm = false
            [reduction]
            absorption_correction = false
            [background]
            use_correction = false
        "#;
        let params = CorrectionParameters::from_toml_str(text).unwrap();
        assert!(params.normalisation.intensity.is_none());
        assert!(params.reduction.absorption.is_none());
        assert!(params.background.correction.is_none());
    }

    #[test]
    fn test_validate_unknown_detector() {
        let mut params = CorrectionParameters::default();
        params.data_source.detector = "nope".to_string();

        let err = params.validate(&detectors(), "2Ddata").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDetector { .. }));
    }

    #[test]
    fn test_validate_area_detector_needs_region() {
        let mut params = CorrectionParameters::default();
        params.data_source.detector = "2Ddata".to_string();

        let err = params.validate(&detectors(), "2Ddata").unwrap_err();
        assert!(matches!(err, ConfigError::MissingRegion { .. }));

        params.data_source.region = Some(Region::new(0, 1, 0, 1));
        assert!(params.validate(&detectors(), "2Ddata").is_ok());
    }

    #[test]
    fn test_validate_inverted_regions() {
        let mut params = CorrectionParameters::default();
        params.data_source.detector = "2Ddata".to_string();
        params.data_source.region = Some(Region::new(5, 2, 0, 1));

        let err = params.validate(&detectors(), "2Ddata").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegion(r) if r == Region::new(5, 2, 0, 1)));

        params.data_source.detector = "det".to_string();
        params.data_source.region = None;
        params.background.correction =
            Some(BackgroundCorrection::DetectorRegion(Region::new(0, 1, 4, 3)));
        let err = params.validate(&detectors(), "2Ddata").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegion(_)));
    }

    #[test]
    fn test_validate_region_background_on_area_detector() {
        let mut params = CorrectionParameters::default();
        params.data_source.detector = "2Ddata".to_string();
        params.data_source.region = Some(Region::new(0, 1, 0, 1));
        params.background.correction =
            Some(BackgroundCorrection::DetectorRegion(Region::new(2, 3, 0, 1)));

        let err = params.validate(&detectors(), "2Ddata").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::RegionBackgroundOnAreaDetector { .. }
        ));
    }

    #[test]
    fn test_unsupported_features() {
        let mut params = CorrectionParameters::default();
        assert!(params.check_supported().is_ok());

        params.reduction.polarisation = true;
        assert!(matches!(
            params.check_supported(),
            Err(ReductionError::Unimplemented(Feature::PolarisationCorrection))
        ));

        params.reduction.polarisation = false;
        params.background.correction = Some(BackgroundCorrection::File("bg.dat".into()));
        assert!(matches!(
            params.check_supported(),
            Err(ReductionError::Unimplemented(Feature::BackgroundFromFile))
        ));

        params.background.correction = None;
        params.normalisation.intensity = Some(IntensityNormalisation::DetectorRegion {
            point: 1,
            region: None,
        });
        assert!(matches!(
            params.check_supported(),
            Err(ReductionError::Unimplemented(
                Feature::RegionIntensityNormalisation
            ))
        ));
    }

    #[test]
    fn test_material_mu() {
        assert_eq!(Material::Glass.mu(), 0.0001667);
        assert_eq!(AbsorptionSource::Value(0.5).mu(), 0.5);
    }
}
