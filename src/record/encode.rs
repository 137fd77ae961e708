//! Record serialization.
//!
//! A record is serialized once; every destination receives the same bytes.

use std::fmt;
use std::sync::Arc;

use chrono::SecondsFormat;
use serde_json::Value;

use crate::config::FormatMode;
use crate::trace::{SAMPLED_FIELD, SPAN_ID_FIELD, TRACE_ID_FIELD};

use super::log_record::LogRecord;
use super::severity::Severity;

pub const CLOUD_TRACE_KEY: &str = "logging.googleapis.com/trace";
pub const CLOUD_SPAN_ID_KEY: &str = "logging.googleapis.com/spanId";
pub const CLOUD_TRACE_SAMPLED_KEY: &str = "logging.googleapis.com/trace_sampled";

/// One newline-terminated JSON line plus the severity it was emitted at.
///
/// Cloning shares the underlying bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SerializedRecord {
    severity: Severity,
    bytes: Arc<[u8]>,
}

impl SerializedRecord {
    pub fn new(severity: Severity, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            severity,
            bytes: bytes.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The line without its trailing newline.
    pub fn line(&self) -> &[u8] {
        self.bytes.strip_suffix(b"\n").unwrap_or(&self.bytes[..])
    }

    pub fn to_value(&self) -> Option<Value> {
        serde_json::from_slice(self.line()).ok()
    }
}

impl fmt::Debug for SerializedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializedRecord")
            .field("severity", &self.severity)
            .field("line", &String::from_utf8_lossy(self.line()))
            .finish()
    }
}

/// Serialize a record for the given format mode.
///
/// `Pretty` produces the line the pretty console parses back:
/// `{"level":30,"time":<epoch ms>,...,"msg":...}`.
/// `Structured` maps the record onto cloud logging fields: `severity`,
/// `timestamp`, `message`, and the provider trace keys when a trace is active.
pub fn encode(record: LogRecord<'_>, mode: FormatMode) -> Result<SerializedRecord, serde_json::Error> {
    let (severity, fields) = match mode {
        FormatMode::Pretty => {
            let (severity, time, mut fields) = record.into_fields("msg");
            fields.insert("level".to_string(), Value::from(severity.numeric()));
            fields.insert("time".to_string(), Value::from(time.timestamp_millis()));
            (severity, fields)
        }
        FormatMode::Structured => {
            let correlation = record.correlation().clone();
            let (severity, time, mut fields) = record.into_fields("message");
            if let Some(trace_id) = correlation.get(TRACE_ID_FIELD) {
                fields.insert(CLOUD_TRACE_KEY.to_string(), Value::from(trace_id.as_str()));
            }
            if let Some(span_id) = correlation.get(SPAN_ID_FIELD) {
                fields.insert(CLOUD_SPAN_ID_KEY.to_string(), Value::from(span_id.as_str()));
            }
            if let Some(sampled) = correlation.get(SAMPLED_FIELD) {
                fields.insert(
                    CLOUD_TRACE_SAMPLED_KEY.to_string(),
                    Value::Bool(sampled == "true"),
                );
            }
            fields.insert("severity".to_string(), Value::from(severity.cloud_name()));
            fields.insert(
                "timestamp".to_string(),
                Value::from(time.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
            (severity, fields)
        }
    };

    let mut bytes = serde_json::to_vec(&Value::Object(fields))?;
    bytes.push(b'\n');
    Ok(SerializedRecord::new(severity, bytes))
}
