//! Data structures for reflectometry reduction.

pub mod dataset;
pub mod metadata;
pub mod polarization;
pub mod region;

pub use dataset::{
    BackgroundAdjusted, Channel, Corrected, DataSet, DataSetOutput, Extracted,
    IntensityNormalized, Normalized, QResolution, ReducedDataSet, Reflectivity, Resolved, Signal,
};
pub use metadata::{
    DataSetMetadata, ExperimentData, InstrumentSettings, MeasurementData, PersonData,
    PolarisationEfficiency, SampleData, SlitData,
};
pub use polarization::{channels_for, FlipperStates, Polarization, SpinState};
pub use region::{masked_region_mean, region_mean, Region};
