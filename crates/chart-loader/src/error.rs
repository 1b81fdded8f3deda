//! Chart loading errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a chart directory
#[derive(Debug, Error)]
pub enum ChartError {
    /// The chart directory does not exist
    #[error("chart directory {0} does not exist")]
    NotFound(PathBuf),

    /// The chart source is not a directory
    #[error("chart source {0} is not a directory")]
    NotADirectory(PathBuf),

    /// No Chart.yaml at the chart root
    #[error("Chart.yaml file is missing in {0}")]
    MissingChartYaml(PathBuf),

    /// Filesystem error
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal error
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Chart.yaml or values.yaml is not valid YAML
    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Chart.yaml is missing a required field or has an unsupported value
    #[error("invalid chart metadata in {path}: {reason}")]
    InvalidMetadata { path: PathBuf, reason: String },

    /// .helmignore contains a pattern that cannot be used
    #[error("invalid ignore file {path}: {reason}")]
    InvalidIgnore { path: PathBuf, reason: String },

    /// values.yaml is not a mapping
    #[error("values file {0} must contain a mapping")]
    InvalidValues(PathBuf),

    /// Packaged (.tgz) subcharts cannot be loaded
    #[error("packaged subchart {0} is not supported, unpack it into a directory")]
    PackagedSubchart(PathBuf),
}
