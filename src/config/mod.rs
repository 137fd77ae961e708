//! Configuration.
//!
//! Minimum level, console format and optional forwarder target, loaded from
//! the environment or deserialized from a host application's config.

pub mod settings;

pub use settings::*;
