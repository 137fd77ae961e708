//! The logger.
//!
//! Each emit call is handled entirely on the caller's thread:
//! 1. Level check (suppressed calls touch nothing)
//! 2. Normalization of the input
//! 3. One record with bound and correlation fields
//! 4. Serialization, then fan-out to every destination

use std::fmt;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use lazy_static::lazy_static;
use serde_json::{Map, Value};

use crate::config::{ConfigError, FormatMode, LoggingConfig};
use crate::normalize::{normalize, LogInput};
use crate::pipeline::{DestinationFanout, FailureHook, PipelineBuilder};
use crate::record::{encode, LogRecord, Severity};
use crate::sink::{Sink, SinkError};
use crate::trace::{AmbientTraceContext, CorrelationFields, CorrelationSource};

lazy_static! {
    /// `pid` and `hostname`, computed once per process.
    static ref BASE_FIELDS: Map<String, Value> = {
        let mut fields = Map::new();
        fields.insert("pid".to_string(), Value::from(std::process::id()));
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());
        fields.insert("hostname".to_string(), Value::from(hostname));
        fields
    };
}

struct LoggerCore {
    min_level: Severity,
    format: FormatMode,
    fanout: DestinationFanout,
    correlation: Arc<dyn CorrelationSource>,
}

/// Structured logger with fan-out to every configured destination.
///
/// Cloning is cheap; clones and children share the destinations. None of the
/// emit operations can fail or panic from the caller's point of view.
#[derive(Clone)]
pub struct Logger {
    core: Arc<LoggerCore>,
    fields: Arc<Map<String, Value>>,
}

impl Logger {
    /// Logger with the destinations selected by `config`, reading the ambient
    /// trace context.
    pub fn new(config: LoggingConfig) -> Logger {
        LoggerBuilder::new(config).build()
    }

    pub fn from_env() -> Result<Logger, ConfigError> {
        Ok(Logger::new(LoggingConfig::from_env()?))
    }

    pub fn builder(config: LoggingConfig) -> LoggerBuilder {
        LoggerBuilder::new(config)
    }

    pub fn debug<I: Into<LogInput>>(&self, input: I) {
        self.log(Severity::Debug, input)
    }

    pub fn info<I: Into<LogInput>>(&self, input: I) {
        self.log(Severity::Info, input)
    }

    pub fn warn<I: Into<LogInput>>(&self, input: I) {
        self.log(Severity::Warn, input)
    }

    pub fn error<I: Into<LogInput>>(&self, input: I) {
        self.log(Severity::Error, input)
    }

    /// Emit `input` at `severity`.
    pub fn log<I: Into<LogInput>>(&self, severity: Severity, input: I) {
        if !self.enabled(severity) {
            return;
        }

        let payload = normalize(input.into());
        let correlation = self.correlation_fields();
        let record = LogRecord::new(severity, payload, &self.fields, correlation);

        match encode(record, self.core.format) {
            Ok(serialized) => {
                // The fan-out swallows destination failures.
                let _ = self.core.fanout.write(&serialized);
            }
            Err(e) => {
                log::debug!("RECORD_ENCODE_FAILED severity={} error={}", severity, e);
            }
        }
    }

    /// Whether a record at `severity` would be emitted.
    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.core.min_level
    }

    /// Child logger whose records also carry `fields`.
    ///
    /// The parent and its other children are unaffected. Later bindings win
    /// over earlier ones with the same key.
    pub fn with_fields<I, K>(&self, fields: I) -> Logger
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut merged = (*self.fields).clone();
        for (key, value) in fields {
            merged.insert(key.into(), value);
        }
        Logger {
            core: Arc::clone(&self.core),
            fields: Arc::new(merged),
        }
    }

    /// Fields merged into every record of this logger.
    pub fn bindings(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn min_level(&self) -> Severity {
        self.core.min_level
    }

    pub fn format(&self) -> FormatMode {
        self.core.format
    }

    /// Active destination names in write order.
    pub fn destinations(&self) -> Vec<&str> {
        self.core.fanout.names()
    }

    /// Destination writes that failed and were dropped.
    pub fn dropped_writes(&self) -> u64 {
        self.core.fanout.failure_count()
    }

    /// Wait for destinations to hand off what they have buffered.
    pub fn flush(&self) {
        let _ = self.core.fanout.flush();
    }

    /// Drain and close every destination.
    ///
    /// Shared by all clones and children. Later emit calls are still accepted;
    /// closed destinations drop what they receive.
    pub fn close(&self) {
        let _ = self.core.fanout.close();
    }

    fn correlation_fields(&self) -> CorrelationFields {
        // An injected source is foreign code; a panic there costs the fields only.
        panic::catch_unwind(AssertUnwindSafe(|| self.core.correlation.current_fields()))
            .unwrap_or_default()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("min_level", &self.core.min_level)
            .field("format", &self.core.format)
            .field("destinations", &self.destinations())
            .field("bindings", &self.fields)
            .finish()
    }
}

/// Assembles a [`Logger`].
///
/// Without explicit destinations the pipeline is built from the
/// configuration.
pub struct LoggerBuilder {
    config: LoggingConfig,
    destinations: Option<Vec<Box<dyn Sink>>>,
    console: Option<Box<dyn Write + Send>>,
    correlation: Arc<dyn CorrelationSource>,
    on_failure: Option<FailureHook>,
    base_fields: Map<String, Value>,
}

impl LoggerBuilder {
    pub fn new(config: LoggingConfig) -> Self {
        Self {
            config,
            destinations: None,
            console: None,
            correlation: Arc::new(AmbientTraceContext),
            on_failure: None,
            base_fields: BASE_FIELDS.clone(),
        }
    }

    /// Add a destination. Once any destination is added the configured
    /// pipeline is not built.
    pub fn destination<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.destinations
            .get_or_insert_with(Vec::new)
            .push(Box::new(sink));
        self
    }

    /// Use exactly these destinations instead of the configured pipeline.
    pub fn destinations(mut self, sinks: Vec<Box<dyn Sink>>) -> Self {
        self.destinations = Some(sinks);
        self
    }

    /// Redirect the configured console destination.
    pub fn console_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.console = Some(writer);
        self
    }

    pub fn correlation_source<C: CorrelationSource + 'static>(mut self, source: C) -> Self {
        self.correlation = Arc::new(source);
        self
    }

    /// Observe destination failures. The hook runs on the emitting thread.
    pub fn on_sink_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &SinkError) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    /// Replace the default `pid`/`hostname` fields.
    pub fn base_fields(mut self, fields: Map<String, Value>) -> Self {
        self.base_fields = fields;
        self
    }

    pub fn build(self) -> Logger {
        let destinations = match self.destinations {
            Some(destinations) => destinations,
            None => {
                let mut pipeline = PipelineBuilder::new(&self.config);
                if let Some(writer) = self.console {
                    pipeline = pipeline.with_console_writer(writer);
                }
                pipeline.build()
            }
        };

        let mut fanout = DestinationFanout::new(destinations);
        if let Some(hook) = self.on_failure {
            fanout = fanout.with_failure_hook(hook);
        }

        Logger {
            core: Arc::new(LoggerCore {
                min_level: self.config.min_level,
                format: self.config.format,
                fanout,
                correlation: self.correlation,
            }),
            fields: Arc::new(self.base_fields),
        }
    }
}
