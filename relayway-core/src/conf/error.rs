use crate::conf::validation::ValidationErrors;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    //-------------------------------------------------------------------------
    // IO
    //-------------------------------------------------------------------------
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    //-------------------------------------------------------------------------
    // Parsing
    //-------------------------------------------------------------------------
    #[error("invalid configuration file: {path}\n\n{source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: hcl::Error,
    },

    //-------------------------------------------------------------------------
    // Top-level
    //-------------------------------------------------------------------------
    #[error("{validation_errors}")]
    Validation { validation_errors: ValidationErrors },

    #[error("invalid {label}: {value}{units} (must be between {min}{units} and {max}{units})")]
    OutOfRange {
        label: &'static str,
        value: String,
        min: String,
        max: String,
        units: &'static str,
    },

    //-------------------------------------------------------------------------
    // Endpoints
    //-------------------------------------------------------------------------
    #[error("duplicate endpoint id '{id}'")]
    DuplicateEndpoint { id: String },

    #[error("invalid endpoint '{id}': {reason}")]
    InvalidEndpoint { id: String, reason: String },

    #[error("invalid discovery candidate '{url}': {reason}")]
    InvalidCandidate { url: String, reason: String },

    //-------------------------------------------------------------------------
    // Scoring / circuit breaker
    //-------------------------------------------------------------------------
    #[error("invalid scoring weights: {reason}")]
    InvalidWeights { reason: String },

    #[error("invalid circuit breaker config: {reason}")]
    InvalidCircuitBreaker { reason: String },
}

impl ConfigError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: hcl::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}
