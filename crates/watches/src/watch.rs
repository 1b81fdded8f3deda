//! Watch entries and the watch file loader.
//!
//! A watch file is a YAML list:
//!
//! ```yaml
//! - group: example.com
//!   version: v1
//!   kind: MyApp
//!   chart: helm-charts/myapp
//!   watchDependentResources: true
//!   overrideValues:
//!     image.repository: quay.io/example/myapp
//!     image.tag: $MYAPP_TAG
//!   selector:
//!     matchLabels:
//!       tier: frontend
//!   reconcilePeriod: 2m
//!   maxConcurrentReconciles: 4
//! ```

use crate::duration::parse_duration;
use crate::error::WatchesError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::GroupVersionKind;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("Failed to compile env reference pattern")
});

/// One declarative binding of a Kubernetes kind to a chart.
///
/// Entries are read once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchEntry {
    /// Kind watched by the controller built from this entry
    pub gvk: GroupVersionKind,
    /// Directory holding the chart to install for each resource
    pub chart_dir: PathBuf,
    /// Whether resources created by a release are watched as well
    pub watch_dependent_resources: bool,
    /// Values overriding the chart defaults, environment-expanded at load
    pub override_values: BTreeMap<String, String>,
    /// Label selector restricting which resources are reconciled
    pub selector: LabelSelector,
    /// Per-entry reconcile period, falls back to the process default
    pub reconcile_period: Option<Duration>,
    /// Per-entry concurrency, falls back to the process default
    pub max_concurrent_reconciles: Option<usize>,
}

impl WatchEntry {
    /// Human readable GVK, e.g. `example.com/v1, Kind=MyApp`
    pub fn gvk_label(&self) -> String {
        if self.gvk.group.is_empty() {
            format!("{}, Kind={}", self.gvk.version, self.gvk.kind)
        } else {
            format!("{}/{}, Kind={}", self.gvk.group, self.gvk.version, self.gvk.kind)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWatch {
    #[serde(default)]
    group: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    chart: Option<PathBuf>,
    #[serde(default)]
    watch_dependent_resources: Option<bool>,
    #[serde(default)]
    override_values: BTreeMap<String, String>,
    #[serde(default)]
    selector: Option<LabelSelector>,
    #[serde(default)]
    reconcile_period: Option<String>,
    #[serde(default)]
    max_concurrent_reconciles: Option<usize>,
}

/// Load a watch file from disk, expanding `$VAR` references in override
/// values from the process environment.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<WatchEntry>, WatchesError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| WatchesError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded watches file {}", path.display());
    parse_watches(&content, |name| std::env::var(name).ok())
}

/// Parse watch entries from YAML text.
///
/// `lookup` resolves environment references in override values. An empty
/// document yields an empty list.
pub fn parse_watches<F>(content: &str, lookup: F) -> Result<Vec<WatchEntry>, WatchesError>
where
    F: Fn(&str) -> Option<String>,
{
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<RawWatch> = serde_yaml::from_str(content)?;
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(raw.len());

    for (index, watch) in raw.into_iter().enumerate() {
        let entry = validate(index, watch, &lookup)?;
        if !seen.insert(entry.gvk.clone()) {
            return Err(WatchesError::Duplicate(entry.gvk_label()));
        }
        entries.push(entry);
    }

    Ok(entries)
}

fn validate<F>(index: usize, watch: RawWatch, lookup: &F) -> Result<WatchEntry, WatchesError>
where
    F: Fn(&str) -> Option<String>,
{
    let invalid = |reason: &str| WatchesError::Invalid {
        index,
        reason: reason.to_string(),
    };

    if watch.version.trim().is_empty() {
        return Err(invalid("version must not be empty"));
    }
    if watch.kind.trim().is_empty() {
        return Err(invalid("kind must not be empty"));
    }
    let chart_dir = match watch.chart {
        Some(chart) if !chart.as_os_str().is_empty() => chart,
        _ => return Err(invalid("chart must not be empty")),
    };
    if watch.max_concurrent_reconciles == Some(0) {
        return Err(invalid("maxConcurrentReconciles must be at least 1"));
    }

    let reconcile_period = watch
        .reconcile_period
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(|source| WatchesError::ReconcilePeriod { index, source })?;

    let override_values = watch
        .override_values
        .into_iter()
        .map(|(key, value)| (key, expand_env(&value, lookup)))
        .collect();

    Ok(WatchEntry {
        gvk: GroupVersionKind::gvk(&watch.group, &watch.version, &watch.kind),
        chart_dir,
        watch_dependent_resources: watch.watch_dependent_resources.unwrap_or(true),
        override_values,
        selector: watch.selector.unwrap_or_default(),
        reconcile_period,
        max_concurrent_reconciles: watch.max_concurrent_reconciles,
    })
}

/// Replace `$VAR` and `${VAR}` references using `lookup`.
///
/// Unset variables expand to the empty string.
pub fn expand_env<F>(value: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_REFERENCE
        .replace_all(value, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            lookup(name).unwrap_or_default()
        })
        .into_owned()
}
