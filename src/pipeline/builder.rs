//! Destination selection.
//!
//! # Decision Table
//! 1. `format == Pretty` -> pretty console
//! 2. `format == Structured` -> structured console
//! 3. forwarder host, port and tag all set -> Fluentd forwarder (additive)

use std::io::Write;

use crate::config::{FormatMode, LoggingConfig};
use crate::sink::{ForwarderSink, PrettyConsoleSink, Sink, StructuredConsoleSink};

/// Builds the destination list for a configuration.
///
/// Never emits records and never fails: an incomplete forwarder configuration
/// or a forwarder that cannot start is left out.
pub struct PipelineBuilder<'a> {
    config: &'a LoggingConfig,
    console: Option<Box<dyn Write + Send>>,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(config: &'a LoggingConfig) -> Self {
        Self {
            config,
            console: None,
        }
    }

    /// Send console output somewhere other than stdout. Disables color.
    pub fn with_console_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.console = Some(writer);
        self
    }

    pub fn build(self) -> Vec<Box<dyn Sink>> {
        let mut destinations: Vec<Box<dyn Sink>> = Vec::new();

        let console: Box<dyn Sink> = match (self.config.format, self.console) {
            (FormatMode::Pretty, Some(writer)) => Box::new(PrettyConsoleSink::new(writer, false)),
            (FormatMode::Pretty, None) => Box::new(PrettyConsoleSink::stdout()),
            (FormatMode::Structured, Some(writer)) => Box::new(StructuredConsoleSink::new(writer)),
            (FormatMode::Structured, None) => Box::new(StructuredConsoleSink::stdout()),
        };
        log::debug!(
            "PIPELINE_DESTINATION_ADDED name={} format={:?}",
            console.name(),
            self.config.format
        );
        destinations.push(console);

        match self.config.forwarder.resolve() {
            Some(forwarder) => {
                let (host, port, tag) = (forwarder.host.clone(), forwarder.port, forwarder.tag.clone());
                match ForwarderSink::spawn(forwarder, self.config.min_level) {
                    Ok(sink) => {
                        log::debug!(
                            "PIPELINE_DESTINATION_ADDED name={} host={} port={} tag={} min_level={}",
                            sink.name(),
                            host,
                            port,
                            tag,
                            self.config.min_level
                        );
                        destinations.push(Box::new(sink));
                    }
                    Err(e) => {
                        log::debug!("PIPELINE_FORWARDER_SKIPPED reason=spawn_failed error={}", e);
                    }
                }
            }
            None => {
                log::debug!(
                    "PIPELINE_FORWARDER_SKIPPED reason=incomplete_config host_set={} port_set={} tag_set={}",
                    self.config.forwarder.host.is_some(),
                    self.config.forwarder.port.is_some(),
                    self.config.forwarder.tag.is_some()
                );
            }
        }

        destinations
    }
}
