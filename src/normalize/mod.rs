//! Error normalization.
//!
//! Turns typed HTTP errors, generic errors and plain values into one
//! serialization-ready payload.

pub mod input;
pub mod payload;

pub use input::*;
pub use payload::*;
