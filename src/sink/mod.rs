//! Log destinations.
//!
//! A destination accepts serialized records and may fail on its own. The
//! console and forwarder sinks here are the ones the pipeline builder picks
//! from configuration; [`MemorySink`] captures lines for tests and embedding.

pub mod console;
pub mod forwarder;
pub mod memory;

pub use console::*;
pub use forwarder::*;
pub use memory::*;

use crate::record::SerializedRecord;

/// Errors a destination can report. The fan-out swallows all of them.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("queue full, record dropped")]
    Full,
    #[error("destination closed")]
    Closed,
    #[error("timed out after {0:?}")]
    TimedOut(std::time::Duration),
    #[error("destination panicked: {0}")]
    Panicked(String),
}

/// A destination for serialized records.
pub trait Sink: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Hand one record to the destination. Must not wait for remote I/O.
    fn write(&self, record: &SerializedRecord) -> Result<(), SinkError>;

    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Release held resources. Further writes may fail with
    /// [`SinkError::Closed`].
    fn close(&self) -> Result<(), SinkError> {
        self.flush()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write(&self, record: &SerializedRecord) -> Result<(), SinkError> {
        (**self).write(record)
    }

    fn flush(&self) -> Result<(), SinkError> {
        (**self).flush()
    }

    fn close(&self) -> Result<(), SinkError> {
        (**self).close()
    }
}
