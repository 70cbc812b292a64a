use serde::{Serialize, Deserialize};
use std::fmt;

/// Unified error type for the PawTrack core.
/// Fallible operations return Result<T, PawError>; lookup misses are not errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PawError {
    pub message: String,
    pub stage: String,
    pub context: Option<String>,
    pub source: Option<String>,
}

impl PawError {
    /// Create a new error with stage and message
    pub fn new<S: Into<String>>(message: S, stage: &'static str) -> Self {
        PawError {
            message: message.into(),
            stage: stage.to_string(),
            context: None,
            source: None,
        }
    }

    /// Add additional context information
    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add source error information
    pub fn with_source<S: Into<String>>(mut self, source: S) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for PawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)?;
        if let Some(ref context) = self.context {
            write!(f, " (context: {})", context)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (source: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for PawError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl From<anyhow::Error> for PawError {
    fn from(err: anyhow::Error) -> Self {
        PawError::new(
            format!("{:#}", err),
            "unknown"
        ).with_source("anyhow")
    }
}

impl From<std::io::Error> for PawError {
    fn from(err: std::io::Error) -> Self {
        PawError::new(
            format!("I/O error: {}", err),
            "io"
        ).with_source("std::io")
    }
}

impl From<serde_json::Error> for PawError {
    fn from(err: serde_json::Error) -> Self {
        PawError::new(
            format!("JSON error: {}", err),
            "json_parse"
        ).with_source("serde_json")
    }
}

impl From<toml::de::Error> for PawError {
    fn from(err: toml::de::Error) -> Self {
        PawError::new(
            format!("TOML error: {}", err),
            "config"
        ).with_source("toml")
    }
}

impl From<crate::storage::StorageError> for PawError {
    fn from(err: crate::storage::StorageError) -> Self {
        PawError::new(
            err.to_string(),
            "storage"
        ).with_source("storage")
    }
}
