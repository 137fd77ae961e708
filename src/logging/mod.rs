//! Logger façade.
//!
//! [`Logger`] is the only type application code needs: level methods,
//! child loggers with bound fields, and flush/close. The `log_*!` macros
//! emit `event key=value` style records through it.

pub mod facade;
pub mod structured;

pub use facade::*;
