//! One log record, built per emit call.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::normalize::LoggablePayload;
use crate::trace::CorrelationFields;

use super::severity::Severity;

/// A record ready for serialization.
///
/// Created once per emit call that passes the level threshold, then consumed
/// by [`encode`](super::encode::encode).
#[derive(Debug)]
pub struct LogRecord<'a> {
    severity: Severity,
    time: DateTime<Utc>,
    payload: LoggablePayload,
    bindings: &'a Map<String, Value>,
    correlation: CorrelationFields,
}

impl<'a> LogRecord<'a> {
    pub fn new(
        severity: Severity,
        payload: LoggablePayload,
        bindings: &'a Map<String, Value>,
        correlation: CorrelationFields,
    ) -> Self {
        Self::at(Utc::now(), severity, payload, bindings, correlation)
    }

    pub fn at(
        time: DateTime<Utc>,
        severity: Severity,
        payload: LoggablePayload,
        bindings: &'a Map<String, Value>,
        correlation: CorrelationFields,
    ) -> Self {
        Self {
            severity,
            time,
            payload,
            bindings,
            correlation,
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn payload(&self) -> &LoggablePayload {
        &self.payload
    }

    pub fn bindings(&self) -> &Map<String, Value> {
        self.bindings
    }

    pub fn correlation(&self) -> &CorrelationFields {
        &self.correlation
    }

    /// Merge bindings, correlation fields and payload into one object.
    ///
    /// Later layers win: bindings < correlation < payload. A non-object
    /// payload lands under `message_key`.
    pub fn into_fields(self, message_key: &str) -> (Severity, DateTime<Utc>, Map<String, Value>) {
        let mut fields = self.bindings.clone();
        for (key, value) in &self.correlation {
            fields.insert(key.clone(), Value::String(value.clone()));
        }
        match self.payload.into_value() {
            Value::Object(obj) => fields.extend(obj),
            other => {
                fields.insert(message_key.to_string(), other);
            }
        }
        (self.severity, self.time, fields)
    }
}
