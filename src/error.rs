//! Error types for configuration, metadata providers and the reduction pipeline.

use crate::data::Region;
use std::fmt;
use thiserror::Error;

/// Invalid reduction configuration. Raised before any array is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Detector is not listed by the metadata provider.
    #[error("unknown detector '{name}' (available: {})", available.join(", "))]
    UnknownDetector { name: String, available: Vec<String> },

    /// The area detector needs a region of interest.
    #[error("detector '{detector}' requires a region of interest")]
    MissingRegion { detector: String },

    /// Region background was requested without a region.
    #[error("background region must be set for region background correction")]
    MissingBackgroundRegion,

    /// Region background cannot be combined with the area detector as signal source.
    #[error("region background correction cannot be used with detector '{detector}'")]
    RegionBackgroundOnAreaDetector { detector: String },

    /// Region bounds are inverted.
    #[error("invalid region {0}: minimum exceeds maximum")]
    InvalidRegion(Region),

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to answer a metadata or data query.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("metadata entry '{key}' not found in section '{section}'")]
    MissingMetadata { section: String, key: String },

    #[error("invalid value for '{key}': '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("detector '{0}' does not provide area frames")]
    NotAreaDetector(String),

    #[error("length mismatch: '{name}' has {actual} points, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("malformed scan table: {0}")]
    Table(csv::Error),

    #[error("failed to read scan data: {0}")]
    Io(#[from] std::io::Error),
}

/// A correction that can be configured but is not available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    PolarisationCorrection,
    BackgroundFromFile,
    RegionIntensityNormalisation,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feature::PolarisationCorrection => "polarisation correction",
            Feature::BackgroundFromFile => "background correction from file",
            Feature::RegionIntensityNormalisation => "intensity normalisation from detector region",
        };
        f.write_str(name)
    }
}

/// Failure of a single-file reduction.
#[derive(Debug, Error)]
pub enum ReductionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{0} is not implemented")]
    Unimplemented(Feature),

    #[error("region {region} exceeds detector frame of {rows}x{cols} pixels")]
    RegionOutOfBounds {
        region: Region,
        rows: usize,
        cols: usize,
    },

    #[error("array length mismatch in '{name}': expected {expected}, got {actual}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("only {arrived} of {expected} channels reached the global pass")]
    IncompleteChannels { expected: usize, arrived: usize },

    #[error("failed to start worker pool: {0}")]
    Runtime(String),
}

impl ReductionError {
    /// True for errors caused by the configuration rather than the data.
    pub fn is_config(&self) -> bool {
        matches!(self, ReductionError::Config(_))
    }
}
