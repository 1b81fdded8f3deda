//! In-memory chart model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Contents of `Chart.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Chart API version (`v1` or `v2`)
    #[serde(default)]
    pub api_version: String,

    /// Chart name
    #[serde(default)]
    pub name: String,

    /// Chart version
    #[serde(default)]
    pub version: String,

    /// Version of the packaged application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// `application` or `library`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,

    /// Declared dependencies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ChartDependency>,
}

/// A dependency declared in `Chart.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDependency {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// A file inside the chart, named by its `/`-separated path relative to the
/// chart root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// A loaded chart.
///
/// Produced once per watch entry and moved into the reconciler built for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    /// Parsed `Chart.yaml`
    pub metadata: ChartMetadata,
    /// Default values from `values.yaml` (empty when the file is absent)
    pub values: serde_yaml::Mapping,
    /// Files under `templates/`
    pub templates: Vec<ChartFile>,
    /// Every other file, excluding `Chart.yaml`, `values.yaml` and `charts/`
    pub files: Vec<ChartFile>,
    /// Unpacked subcharts from `charts/`
    pub subcharts: Vec<ChartArtifact>,
    /// Directory the chart was loaded from
    pub source: PathBuf,
}

impl ChartArtifact {
    /// Chart name
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Chart version
    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Whether the chart is a library chart (not installable on its own)
    pub fn is_library(&self) -> bool {
        self.metadata.chart_type.as_deref() == Some("library")
    }
}
