//! Trace correlation.
//!
//! Reads the span active in the calling context and turns it into the
//! correlation fields merged into each record. Spans are never created or
//! propagated here.

pub mod mixin;
#[cfg(feature = "otel")]
pub mod otel;
pub mod span;

pub use mixin::*;
#[cfg(feature = "otel")]
pub use otel::*;
pub use span::*;
