//! Inputs accepted by the logger.
//!
//! The kind of an input is decided once, where it is converted into a
//! [`LogInput`]. Normalization then matches on the tag instead of probing
//! the shape of the value.

use std::error::Error as StdError;
use std::fmt;

use serde_json::Value;

/// A value handed to one of the logger's emit operations.
#[derive(Debug, Clone, PartialEq)]
pub enum LogInput {
    /// Typed HTTP error with a status code.
    Http(HttpError),
    /// Any other error, represented by its stack.
    Error(ErrorReport),
    /// Strings, numbers, objects. Logged as-is.
    Plain(Value),
}

impl LogInput {
    /// Classify an untyped JSON value.
    ///
    /// Objects shaped like an HTTP error become [`LogInput::Http`], objects
    /// carrying only a `stack` string become [`LogInput::Error`], everything
    /// else stays [`LogInput::Plain`]. `From<Value>` never does this.
    pub fn classify(value: Value) -> LogInput {
        if let Some(http) = HttpError::from_value(&value) {
            return LogInput::Http(http);
        }
        if let Some(report) = ErrorReport::from_value(&value) {
            return LogInput::Error(report);
        }
        LogInput::Plain(value)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LogInput::Http(_) => "http_error",
            LogInput::Error(_) => "error",
            LogInput::Plain(_) => "plain",
        }
    }
}

/// HTTP error carrying a status code, an optional stack and arbitrary data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{status_code} {message}")]
pub struct HttpError {
    pub status_code: u16,
    pub message: String,
    pub stack: Option<String>,
    pub data: Option<Value>,
    /// The error this one was raised from, if any.
    pub original_error: Option<ErrorReport>,
}

impl HttpError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            stack: None,
            data: None,
            original_error: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_original_error(mut self, original: impl Into<ErrorReport>) -> Self {
        self.original_error = Some(original.into());
        self
    }

    /// Recognize an HTTP-error shaped JSON object.
    ///
    /// Requires an integer `statusCode` (or `status`) that fits a `u16` and a
    /// string `message`. `stack`, `data` and `originalError.stack` are picked
    /// up when present.
    pub fn from_value(value: &Value) -> Option<HttpError> {
        let obj = value.as_object()?;
        let status = obj
            .get("statusCode")
            .or_else(|| obj.get("status"))
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())?;
        let message = obj.get("message").and_then(Value::as_str)?;

        let mut http = HttpError::new(status, message);
        http.stack = obj.get("stack").and_then(Value::as_str).map(str::to_string);
        http.data = obj.get("data").cloned();
        http.original_error = obj.get("originalError").and_then(ErrorReport::from_value);
        Some(http)
    }
}

/// Generic error reduced to its stack.
///
/// The stack already embeds the message, so nothing else is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    stack: String,
}

impl ErrorReport {
    pub fn new(stack: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
        }
    }

    /// Render an error and its `source()` chain.
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let mut stack = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { stack }
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn into_stack(self) -> String {
        self.stack
    }

    /// An object whose only error-like member is a `stack` string.
    fn from_value(value: &Value) -> Option<ErrorReport> {
        let obj = value.as_object()?;
        if obj.contains_key("statusCode") || obj.contains_key("status") {
            return None;
        }
        obj.get("stack").and_then(Value::as_str).map(ErrorReport::new)
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stack)
    }
}

impl From<anyhow::Error> for ErrorReport {
    fn from(err: anyhow::Error) -> Self {
        // Debug output carries the cause chain and, when captured, the backtrace.
        Self::new(format!("{:?}", err))
    }
}

impl From<&(dyn StdError + 'static)> for ErrorReport {
    fn from(err: &(dyn StdError + 'static)) -> Self {
        Self::from_error(err)
    }
}

impl From<HttpError> for LogInput {
    fn from(err: HttpError) -> Self {
        LogInput::Http(err)
    }
}

impl From<ErrorReport> for LogInput {
    fn from(report: ErrorReport) -> Self {
        LogInput::Error(report)
    }
}

impl From<anyhow::Error> for LogInput {
    fn from(err: anyhow::Error) -> Self {
        // A wrapped HttpError keeps its status code.
        match err.downcast::<HttpError>() {
            Ok(http) => LogInput::Http(http),
            Err(other) => LogInput::Error(other.into()),
        }
    }
}

impl From<&(dyn StdError + 'static)> for LogInput {
    fn from(err: &(dyn StdError + 'static)) -> Self {
        match err.downcast_ref::<HttpError>() {
            Some(http) => LogInput::Http(http.clone()),
            None => LogInput::Error(ErrorReport::from_error(err)),
        }
    }
}

impl From<Value> for LogInput {
    fn from(value: Value) -> Self {
        LogInput::Plain(value)
    }
}

impl From<&str> for LogInput {
    fn from(s: &str) -> Self {
        LogInput::Plain(Value::String(s.to_string()))
    }
}

impl From<String> for LogInput {
    fn from(s: String) -> Self {
        LogInput::Plain(Value::String(s))
    }
}

impl From<&String> for LogInput {
    fn from(s: &String) -> Self {
        LogInput::Plain(Value::String(s.clone()))
    }
}

macro_rules! plain_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for LogInput {
                fn from(v: $ty) -> Self {
                    LogInput::Plain(Value::from(v))
                }
            }
        )*
    };
}

plain_from!(bool, i32, i64, u32, u64, f64);
