//! Stage trait definitions.

use crate::error::ReductionError;

/// Identifier for a stage type, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(C)]
pub enum StageId {
    /// Pull raw arrays for one channel and reduce detector regions.
    Extract,
    /// Compute Q and dQ from the angles.
    Resolution,
    /// Footprint and absorption correction coefficients.
    Correction,
    /// Monitor and time normalisation, first R and dR.
    Normalisation,
    /// Background subtraction.
    Background,
    /// Per-channel intensity scaling.
    Intensity,
    /// Scaling by the maximum over every channel of a file.
    GlobalIntensity,
}

impl StageId {
    /// Get the string name of this stage.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Extract => "extract",
            StageId::Resolution => "resolution",
            StageId::Correction => "correction",
            StageId::Normalisation => "normalisation",
            StageId::Background => "background",
            StageId::Intensity => "intensity",
            StageId::GlobalIntensity => "global_intensity",
        }
    }
}

/// A typed processing step.
///
/// Each stage consumes the channel state left by its predecessor and
/// produces the next one, so stages cannot be applied out of order.
pub trait Stage: Send + Sync {
    type Input;
    type Output;

    /// Get the stage identifier.
    fn id(&self) -> StageId;

    /// Run this stage.
    fn process(&self, input: Self::Input) -> Result<Self::Output, ReductionError>;

    /// Get the stage name.
    fn name(&self) -> &'static str {
        self.id().name()
    }
}
