//! Runtime for reflectivity reduction: per-file orchestration and batches.

pub mod executor;
pub mod reduction;
pub mod regroup;

pub use executor::{BatchSummary, CancelToken, JobOutcome, ReductionJob, Runtime, RuntimeConfig};
pub use reduction::DataReduction;
pub use regroup::ChannelPool;
