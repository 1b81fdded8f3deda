//! Watch file errors

use crate::duration::ParseDurationError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a watch file
#[derive(Debug, Error)]
pub enum WatchesError {
    /// The watch file could not be read
    #[error("failed to read watches file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The watch file is not valid YAML for a list of watches
    #[error("failed to parse watches file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A watch entry is missing a required field or carries an invalid value
    #[error("invalid watch at index {index}: {reason}")]
    Invalid { index: usize, reason: String },

    /// Two entries target the same group/version/kind
    #[error("duplicate watch for {0}")]
    Duplicate(String),

    /// A reconcile period could not be parsed
    #[error("invalid reconcilePeriod in watch at index {index}: {source}")]
    ReconcilePeriod {
        index: usize,
        #[source]
        source: ParseDurationError,
    },
}
