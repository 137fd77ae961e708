//! In-memory destination.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::record::SerializedRecord;

use super::{Sink, SinkError};

/// Keeps every record it receives.
#[derive(Debug, Clone)]
pub struct MemorySink {
    name: String,
    records: Arc<Mutex<Vec<SerializedRecord>>>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Records received so far, in arrival order.
    pub fn records(&self) -> Vec<SerializedRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Received records parsed back into JSON. Unparsable lines are skipped.
    pub fn values(&self) -> Vec<Value> {
        self.records
            .lock()
            .iter()
            .filter_map(SerializedRecord::to_value)
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, record: &SerializedRecord) -> Result<(), SinkError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
