//! C ABI for calling the reduction from other languages.
//!
//! Handles are opaque pointers owned by the caller once returned; every
//! `*_create` or [`refl_reduce`] has a matching `*_free`.

pub mod reduction;
pub mod types;

pub use reduction::*;
pub use types::*;
