//! Fan-out to every active destination.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::record::SerializedRecord;
use crate::sink::{Sink, SinkError};

/// Called with the destination name and its error whenever a destination
/// fails. Must not log through the logger that owns the fan-out.
pub type FailureHook = Arc<dyn Fn(&str, &SinkError) + Send + Sync>;

/// A destination that broadcasts each record to an ordered list of
/// destinations.
///
/// Every destination gets the same [`SerializedRecord`]. A destination that
/// returns an error or panics is counted and skipped; the others still
/// receive the record and nothing is reported to the caller.
pub struct DestinationFanout {
    destinations: Vec<Box<dyn Sink>>,
    failures: AtomicU64,
    on_failure: Option<FailureHook>,
}

impl DestinationFanout {
    pub fn new(destinations: Vec<Box<dyn Sink>>) -> Self {
        Self {
            destinations,
            failures: AtomicU64::new(0),
            on_failure: None,
        }
    }

    pub fn with_failure_hook(mut self, hook: FailureHook) -> Self {
        self.on_failure = Some(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Destination names in write order.
    pub fn names(&self) -> Vec<&str> {
        self.destinations.iter().map(|d| d.name()).collect()
    }

    /// Destination failures swallowed so far.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn for_each_isolated<F>(&self, op: F)
    where
        F: Fn(&dyn Sink) -> Result<(), SinkError>,
    {
        for destination in &self.destinations {
            let destination: &dyn Sink = &**destination;
            let result = panic::catch_unwind(AssertUnwindSafe(|| op(destination)))
                .unwrap_or_else(|payload| Err(SinkError::Panicked(panic_message(payload))));
            if let Err(err) = result {
                self.failures.fetch_add(1, Ordering::Relaxed);
                if let Some(hook) = &self.on_failure {
                    // A panicking hook must not break the loop either.
                    let _ = panic::catch_unwind(AssertUnwindSafe(|| {
                        hook(destination.name(), &err)
                    }));
                }
            }
        }
    }
}

impl Sink for DestinationFanout {
    fn name(&self) -> &str {
        "fanout"
    }

    fn write(&self, record: &SerializedRecord) -> Result<(), SinkError> {
        self.for_each_isolated(|destination| destination.write(record));
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.for_each_isolated(|destination| destination.flush());
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        self.for_each_isolated(|destination| destination.close());
        Ok(())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
