//! reflred - Neutron reflectometry reduction.
//!
//! This crate turns raw reflectometry scans (incident angle, detector
//! counts, monitor and time per point) into reflectivity curves
//! `R(Q) ± dR` with Q resolution, and describes the result as ORSO
//! exchange records with a provenance narrative:
//!
//! - Typestate pipeline: each stage consumes the previous stage's output
//! - Parallel reduction of polarisation channels using rayon
//! - Async batch execution over many files with callback notifications
//! - FFI layer for Python (cffi) and other language bindings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     FFI Layer (reflred.h)           │
//! │  C-compatible functions & types     │
//! └─────────────────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────┐
//! │         Pure Rust Runtime           │
//! │  ┌───────────┐  ┌───────────────┐  │
//! │  │ Metadata  │  │ Stage System  │  │
//! │  │ Providers │  │  (Typestate)  │  │
//! │  └───────────┘  └───────────────┘  │
//! │  ┌───────────┐  ┌───────────────┐  │
//! │  │  Channel  │  │ Batch Runtime │  │
//! │  │   Pool    │  │ (rayon/tokio) │  │
//! │  └───────────┘  └───────────────┘  │
//! └─────────────────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────┐
//! │   ORSO records + narrative          │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use reflred::{CorrectionParameters, DataReduction, ScanLogProvider};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ScanLogProvider::open("scan_0042.dat")?;
//! let parameters = CorrectionParameters::from_file("reduction.toml")?;
//!
//! let document = DataReduction::new(&provider, &parameters)?.document()?;
//! for dataset in &document.datasets {
//!     dataset.write_table(std::io::stdout())?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # FFI Usage
//!
//! ```c
//! // Wrap raw scan arrays
//! ProviderHandle provider;
//! refl_provider_create("scan", theta, counts, monitor, time, len,
//!                      4.7, &slits, &sample, &provider);
//!
//! // Reduce
//! ResultHandle result;
//! CReductionParams params = { ... };
//! refl_reduce(provider, &params, &result);
//!
//! // Read R of the first channel
//! CArrayView r;
//! refl_result_column(result, 0, 2, &r);
//!
//! // Cleanup
//! refl_result_free(result);
//! refl_provider_free(provider);
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod ffi;
pub mod orso;
pub mod physics;
pub mod provider;
pub mod runtime;
pub mod stage;

// Re-export commonly used items
pub use config::{
    AbsorptionSource, BackgroundCorrection, CorrectionParameters, IntensityNormalisation,
    Material,
};
pub use data::{DataSet, DataSetMetadata, MeasurementData, Polarization, ReducedDataSet, Region};
pub use error::{ConfigError, Feature, ProviderError, ReductionError};
pub use orso::{OrsoDataset, OrsoDocument};
pub use provider::{MemoryProvider, MetadataProvider, ScanLogProvider};
pub use runtime::{DataReduction, ReductionJob, Runtime, RuntimeConfig};
pub use stage::{Stage, StageId};

// Re-export FFI types for cbindgen
pub use ffi::reduction::*;
pub use ffi::types::*;
