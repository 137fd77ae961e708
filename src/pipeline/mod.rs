//! Destination pipeline.
//!
//! Chooses the active destinations from configuration and broadcasts each
//! serialized record to all of them:
//! - Pretty or structured console (exactly one)
//! - Fluentd forwarder (when fully configured)

pub mod builder;
pub mod fanout;

pub use builder::*;
pub use fanout::*;
