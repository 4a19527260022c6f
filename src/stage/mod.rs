//! Pipeline stages of the reflectivity reduction.
//!
//! Stages are applied per channel in [`StageId`] order; the last one,
//! [`GlobalIntensityStage`], runs once over every channel of a file.

pub mod background;
pub mod correction;
pub mod extract;
pub mod intensity;
pub mod normalisation;
pub mod resolution;
pub mod traits;

pub use background::BackgroundStage;
pub use correction::CorrectionStage;
pub use extract::ExtractStage;
pub use intensity::{GlobalIntensityStage, IntensityStage};
pub use normalisation::NormalisationStage;
pub use resolution::ResolutionStage;
pub use traits::{Stage, StageId};
