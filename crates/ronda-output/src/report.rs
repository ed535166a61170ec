//! JSON run report for a Ronda study.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A section was added twice.
    #[error("Duplicate report section: {0}")]
    DuplicateSection(String),
}

/// A run report: the configuration used and named result sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Run name, usually the CLI subcommand.
    pub name: String,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Crate version that produced the report.
    pub version: String,

    /// Configuration the run used.
    pub config: Value,

    /// Result sections keyed by name.
    pub sections: Map<String, Value>,
}

impl Report {
    /// Create a new report.
    pub fn new(name: String, config: Value, sections: Map<String, Value>) -> Self {
        Self {
            name,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            sections,
        }
    }

    /// Look up a section.
    pub fn section(&self, key: &str) -> Option<&Value> {
        self.sections.get(key)
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ReportError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    name: Option<String>,
    config: Option<Value>,
    sections: Map<String, Value>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the run name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Record the configuration.
    pub fn config<T: Serialize>(mut self, config: &T) -> Result<Self, ReportError> {
        self.config = Some(serde_json::to_value(config)?);
        Ok(self)
    }

    /// Add a named section.
    pub fn section<T: Serialize>(mut self, key: &str, value: &T) -> Result<Self, ReportError> {
        if self.sections.contains_key(key) {
            return Err(ReportError::DuplicateSection(key.to_string()));
        }
        self.sections.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Build the report.
    pub fn build(self) -> Report {
        Report::new(
            self.name.unwrap_or_else(|| "ronda".to_string()),
            self.config.unwrap_or(Value::Null),
            self.sections,
        )
    }
}
