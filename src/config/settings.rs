//! Logger configuration.
//!
//! Read once when a logger is built and never changed afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::record::Severity;

pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_STD_OUT_LOG_FORMAT: &str = "STD_OUT_LOG_FORMAT";
pub const ENV_FLUENTD_HOST: &str = "FLUENTD_HOST";
pub const ENV_FLUENTD_PORT: &str = "FLUENTD_PORT";
pub const ENV_FLUENTD_TAG: &str = "FLUENTD_TAG";

/// Configuration errors. Only raised while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid log level '{0}', expected one of debug, info, warn, error")]
    InvalidLevel(String),
}

/// How records are rendered on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    /// Human-readable console output.
    Pretty,
    /// One cloud-logging JSON object per line.
    #[default]
    Structured,
}

impl FormatMode {
    /// `pretty` selects [`FormatMode::Pretty`]; any other value is structured.
    pub fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("pretty") {
            FormatMode::Pretty
        } else {
            FormatMode::Structured
        }
    }
}

/// Raw forwarder settings, each part optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwarderSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tag: Option<String>,
}

impl ForwarderSettings {
    /// Complete forwarder configuration, or `None` when any part is missing
    /// or empty.
    pub fn resolve(&self) -> Option<ForwarderConfig> {
        let host = self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        let port = self.port.filter(|p| *p != 0)?;
        let tag = self.tag.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        Some(ForwarderConfig {
            host: host.to_string(),
            port,
            tag: tag.to_string(),
        })
    }
}

/// Fully specified forwarder target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    pub host: String,
    pub port: u16,
    pub tag: String,
}

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub min_level: Severity,
    pub format: FormatMode,
    pub forwarder: ForwarderSettings,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            min_level: Severity::Info,
            format: FormatMode::Structured,
            forwarder: ForwarderSettings::default(),
        }
    }
}

impl LoggingConfig {
    pub fn new(min_level: Severity, format: FormatMode) -> Self {
        Self {
            min_level,
            format,
            forwarder: ForwarderSettings::default(),
        }
    }

    pub fn with_forwarder(mut self, host: impl Into<String>, port: u16, tag: impl Into<String>) -> Self {
        self.forwarder = ForwarderSettings {
            host: Some(host.into()),
            port: Some(port),
            tag: Some(tag.into()),
        };
        self
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Load from `(name, value)` pairs.
    ///
    /// Unset variables keep their defaults. An unparsable port disables the
    /// forwarder rather than failing.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let non_empty = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let mut config = LoggingConfig::default();

        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            config.min_level = level.parse()?;
        }
        if let Some(format) = non_empty(ENV_STD_OUT_LOG_FORMAT) {
            config.format = FormatMode::from_env_value(&format);
        }

        config.forwarder.host = non_empty(ENV_FLUENTD_HOST);
        config.forwarder.tag = non_empty(ENV_FLUENTD_TAG);
        config.forwarder.port = non_empty(ENV_FLUENTD_PORT).and_then(|port| match port.parse::<u16>() {
            Ok(port) => Some(port),
            Err(e) => {
                log::debug!("CONFIG_FORWARDER_PORT_IGNORED value={:?} error={}", port, e);
                None
            }
        });

        log::debug!(
            "CONFIG_LOADED min_level={} format={:?} forwarder={}",
            config.min_level,
            config.format,
            config.forwarder.resolve().is_some()
        );

        Ok(config)
    }
}
