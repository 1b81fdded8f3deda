//! Directory-backed chart loading.

use crate::chart::{ChartArtifact, ChartFile, ChartMetadata};
use crate::error::ChartError;
use crate::ignore::IgnoreRules;
use std::path::{Component, Path};
use tracing::debug;
use walkdir::WalkDir;

const CHART_FILE: &str = "Chart.yaml";
const VALUES_FILE: &str = "values.yaml";
const IGNORE_FILE: &str = ".helmignore";
const DEFAULT_API_VERSION: &str = "v1";
const TEMPLATES_DIR: &str = "templates";
const CHARTS_DIR: &str = "charts";

/// Trait for chart loading
///
/// Abstracts chart acquisition so binding logic can be tested without real
/// chart directories.
pub trait ChartLoader: Send + Sync {
    /// Load the chart stored at `source`
    fn load(&self, source: &Path) -> Result<ChartArtifact, ChartError>;
}

/// Loads charts from unpacked directories on the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct DirChartLoader;

impl ChartLoader for DirChartLoader {
    fn load(&self, source: &Path) -> Result<ChartArtifact, ChartError> {
        load_dir(source)
    }
}

/// Load a chart directory into memory.
///
/// Requires `Chart.yaml` at the root with `name` and `version` set; a missing
/// `apiVersion` is read as `v1`. Symlinks are followed and paths matched by
/// `.helmignore` are skipped. Subcharts are loaded recursively from
/// `charts/<name>/`, each with its own `.helmignore`.
pub fn load_dir(root: &Path) -> Result<ChartArtifact, ChartError> {
    let meta = std::fs::metadata(root).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ChartError::NotFound(root.to_path_buf())
        } else {
            ChartError::Io {
                path: root.to_path_buf(),
                source,
            }
        }
    })?;
    if !meta.is_dir() {
        return Err(ChartError::NotADirectory(root.to_path_buf()));
    }

    let metadata = read_metadata(root)?;
    let values = read_values(root)?;
    let (templates, files) = read_files(root)?;
    let subcharts = read_subcharts(root)?;

    debug!(
        "Loaded chart {}-{} from {} ({} templates, {} subcharts)",
        metadata.name,
        metadata.version,
        root.display(),
        templates.len(),
        subcharts.len()
    );

    Ok(ChartArtifact {
        metadata,
        values,
        templates,
        files,
        subcharts,
        source: root.to_path_buf(),
    })
}

fn read_metadata(root: &Path) -> Result<ChartMetadata, ChartError> {
    let path = root.join(CHART_FILE);
    if !path.is_file() {
        return Err(ChartError::MissingChartYaml(root.to_path_buf()));
    }
    let content = std::fs::read_to_string(&path).map_err(|source| ChartError::Io {
        path: path.clone(),
        source,
    })?;
    let mut metadata: ChartMetadata =
        serde_yaml::from_str(&content).map_err(|source| ChartError::Yaml {
            path: path.clone(),
            source,
        })?;

    let invalid = |reason: &str| ChartError::InvalidMetadata {
        path: path.clone(),
        reason: reason.to_string(),
    };
    if metadata.api_version.trim().is_empty() {
        metadata.api_version = DEFAULT_API_VERSION.to_string();
    }
    match metadata.api_version.as_str() {
        "v1" | "v2" => {}
        other => return Err(invalid(&format!("apiVersion '{other}' is not supported"))),
    }
    if metadata.name.trim().is_empty() {
        return Err(invalid("name is required"));
    }
    if metadata.version.trim().is_empty() {
        return Err(invalid("version is required"));
    }
    match metadata.chart_type.as_deref() {
        None | Some("application" | "library") => {}
        Some(other) => return Err(invalid(&format!("chart type '{other}' is not supported"))),
    }

    Ok(metadata)
}

fn read_values(root: &Path) -> Result<serde_yaml::Mapping, ChartError> {
    let path = root.join(VALUES_FILE);
    if !path.is_file() {
        return Ok(serde_yaml::Mapping::new());
    }
    let content = std::fs::read_to_string(&path).map_err(|source| ChartError::Io {
        path: path.clone(),
        source,
    })?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|source| ChartError::Yaml {
            path: path.clone(),
            source,
        })?;

    match value {
        serde_yaml::Value::Null => Ok(serde_yaml::Mapping::new()),
        serde_yaml::Value::Mapping(mapping) => Ok(mapping),
        _ => Err(ChartError::InvalidValues(path)),
    }
}

/// Collect templates and plain files, skipping the metadata files, `charts/`
/// and anything `.helmignore` excludes
fn read_files(root: &Path) -> Result<(Vec<ChartFile>, Vec<ChartFile>), ChartError> {
    let mut templates = Vec::new();
    let mut files = Vec::new();
    let ignore = IgnoreRules::load(&root.join(IGNORE_FILE))?;

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if entry.depth() == 1 && entry.file_name() == CHARTS_DIR {
                return false;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                return true;
            };
            let ignored = ignore.is_ignored(&relative_name(relative), entry.file_type().is_dir());
            if ignored {
                debug!("Skipping {} matched by {}", relative.display(), IGNORE_FILE);
            }
            !ignored
        });

    for entry in walker {
        let entry = entry.map_err(|source| ChartError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = relative_name(relative);
        if entry.depth() == 1 && [CHART_FILE, VALUES_FILE, IGNORE_FILE].contains(&name.as_str()) {
            continue;
        }

        let data = std::fs::read(entry.path()).map_err(|source| ChartError::Io {
            path: entry.path().to_path_buf(),
            source,
        })?;
        let file = ChartFile { name, data };
        if relative.starts_with(TEMPLATES_DIR) {
            templates.push(file);
        } else {
            files.push(file);
        }
    }

    Ok((templates, files))
}

fn read_subcharts(root: &Path) -> Result<Vec<ChartArtifact>, ChartError> {
    let charts_dir = root.join(CHARTS_DIR);
    if !charts_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut entries = std::fs::read_dir(&charts_dir)
        .map_err(|source| ChartError::Io {
            path: charts_dir.clone(),
            source,
        })?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ChartError::Io {
            path: charts_dir.clone(),
            source,
        })?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    let mut subcharts = Vec::new();
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            subcharts.push(load_dir(&path)?);
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        if file_name.ends_with(".tgz") || file_name.ends_with(".tar.gz") {
            return Err(ChartError::PackagedSubchart(path));
        }
        debug!("Ignoring non-chart file {} in charts/", path.display());
    }

    Ok(subcharts)
}

fn relative_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod loader_test;
