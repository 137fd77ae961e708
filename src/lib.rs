//! Logfan Core - Structured logging with trace correlation and fan-out
//!
//! One emit call produces one JSON record that every active destination
//! receives byte for byte. The implementation prioritizes:
//!
//! 1. **Isolation** - A failing destination never reaches the caller or the
//!    other destinations
//! 2. **Correlation** - Trace and span ids are read from the ambient span at
//!    emit time
//! 3. **Performance** - Suppressed calls do no work, records are serialized once
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `config` - Level, format and forwarder settings from the environment
//! - `normalize` - Error and value normalization into loggable payloads
//! - `trace` - Ambient span context and correlation fields
//! - `record` - Severity, record assembly and serialization
//! - `sink` - Destinations (console, Fluentd forwarder, in-memory)
//! - `pipeline` - Destination selection and fan-out
//! - `logging` - The `Logger` façade and `log_*!` macros
//!
//! ## Example
//!
//! ```no_run
//! use logfan_core::{HttpError, Logger, LoggingConfig};
//! use serde_json::json;
//!
//! let logger = Logger::new(LoggingConfig::from_env().unwrap_or_default());
//! let request = logger.with_fields([("requestId", json!("r-1"))]);
//!
//! request.info("request started");
//! request.error(HttpError::new(404, "not found"));
//! logfan_core::log_info!(request, "REQUEST_DONE", status = 404);
//!
//! logger.close();
//! ```

pub mod config;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod sink;
pub mod trace;

pub use config::{ConfigError, ForwarderConfig, ForwarderSettings, FormatMode, LoggingConfig};
pub use logging::{Logger, LoggerBuilder};
pub use normalize::{normalize, ErrorPayload, ErrorReport, HttpError, LogInput, LoggablePayload};
pub use pipeline::{DestinationFanout, FailureHook, PipelineBuilder};
pub use record::{encode, LogRecord, SerializedRecord, Severity};
pub use sink::{MemorySink, Sink, SinkError};
pub use trace::{
    AmbientTraceContext, CorrelationFields, CorrelationSource, NoTraceContext, SpanContext,
    SpanScope,
};
#[cfg(feature = "otel")]
pub use trace::OtelTraceContext;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
