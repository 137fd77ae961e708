//! Ordered log severity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Severity of a record. Ordering is `Debug < Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }

    /// Numeric level used in pretty-mode lines: 20, 30, 40, 50.
    pub fn numeric(&self) -> u64 {
        match self {
            Severity::Debug => 20,
            Severity::Info => 30,
            Severity::Warn => 40,
            Severity::Error => 50,
        }
    }

    /// Inverse of [`Severity::numeric`]. Unknown numbers snap to the nearest
    /// lower level so foreign lines still render.
    pub fn from_numeric(level: u64) -> Option<Severity> {
        match level {
            0..=19 => None,
            20..=29 => Some(Severity::Debug),
            30..=39 => Some(Severity::Info),
            40..=49 => Some(Severity::Warn),
            _ => Some(Severity::Error),
        }
    }

    /// Severity name expected by cloud log ingestion.
    pub fn cloud_name(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            _ => Err(ConfigError::InvalidLevel(s.to_string())),
        }
    }
}
