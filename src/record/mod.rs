//! Log records.
//!
//! Severity levels, the per-call record and its serialized form.

pub mod encode;
pub mod log_record;
pub mod severity;

pub use encode::*;
pub use log_record::*;
pub use severity::*;
