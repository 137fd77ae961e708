//! Canonical loggable payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::input::{HttpError, LogInput};

/// Canonical shape of an HTTP error once it leaves the normalizer.
///
/// Only extracted fields are kept; absent optionals are not serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_error_stack: Option<String>,
}

impl From<HttpError> for ErrorPayload {
    fn from(err: HttpError) -> Self {
        Self {
            status_code: Some(err.status_code),
            message: err.message,
            stack: err.stack,
            data: err.data,
            original_error_stack: err.original_error.map(|e| e.into_stack()),
        }
    }
}

/// Result of [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoggablePayload {
    Error(ErrorPayload),
    Stack(String),
    Plain(Value),
}

impl LoggablePayload {
    /// JSON form used when composing a record.
    pub fn into_value(self) -> Value {
        match self {
            LoggablePayload::Error(payload) => {
                // A struct of strings, numbers and JSON values always serializes.
                serde_json::to_value(payload).unwrap_or(Value::Null)
            }
            LoggablePayload::Stack(stack) => Value::String(stack),
            LoggablePayload::Plain(value) => value,
        }
    }
}

/// Map an input onto its canonical loggable payload.
///
/// - HTTP errors keep status code, message, stack and data; a nested original
///   error contributes its own stack as `originalErrorStack`.
/// - Other errors collapse to their stack string.
/// - Plain values pass through untouched.
pub fn normalize(input: LogInput) -> LoggablePayload {
    match input {
        LogInput::Http(err) => LoggablePayload::Error(err.into()),
        LogInput::Error(report) => LoggablePayload::Stack(report.into_stack()),
        LogInput::Plain(value) => LoggablePayload::Plain(value),
    }
}
