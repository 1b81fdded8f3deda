//! Test utilities shared by the unit tests.

use crate::binder::ControllerRegistry;
use crate::manager::ManagerError;
use crate::reconciler::HelmReconciler;
use async_trait::async_trait;
use chart_loader::{ChartArtifact, ChartMetadata};
use kube::api::GroupVersionKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use watches::WatchEntry;

/// Build an in-memory chart without touching the filesystem
pub fn test_chart(name: &str) -> ChartArtifact {
    ChartArtifact {
        metadata: ChartMetadata {
            api_version: "v2".to_string(),
            name: name.to_string(),
            version: "0.1.0".to_string(),
            ..ChartMetadata::default()
        },
        values: serde_yaml::Mapping::new(),
        templates: Vec::new(),
        files: Vec::new(),
        subcharts: Vec::new(),
        source: PathBuf::from(format!("/charts/{name}")),
    }
}

/// Write a minimal valid chart directory under `root/name`
pub fn write_chart_dir(root: &Path, name: &str) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(dir.join("templates")).unwrap();
    std::fs::write(
        dir.join("Chart.yaml"),
        format!("apiVersion: v2\nname: {name}\nversion: 0.1.0\n"),
    )
    .unwrap();
    std::fs::write(dir.join("values.yaml"), "replicaCount: 1\n").unwrap();
    std::fs::write(dir.join("templates/deployment.yaml"), "kind: Deployment\n").unwrap();
    dir
}

pub fn gvk(kind: &str) -> GroupVersionKind {
    GroupVersionKind::gvk("example.com", "v1", kind)
}

/// A watch entry for `kind` backed by the chart at `chart_dir`
pub fn watch_entry(kind: &str, chart_dir: impl Into<PathBuf>) -> WatchEntry {
    WatchEntry {
        gvk: gvk(kind),
        chart_dir: chart_dir.into(),
        watch_dependent_resources: true,
        override_values: Default::default(),
        selector: Default::default(),
        reconcile_period: None,
        max_concurrent_reconciles: None,
    }
}

/// A temp directory holding one valid chart per name
pub fn chart_root(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        write_chart_dir(dir.path(), name);
    }
    dir
}

/// Registry that records registrations instead of talking to a cluster
#[derive(Default)]
pub struct MockRegistry {
    pub registered: Vec<HelmReconciler>,
    /// Kind whose registration fails
    pub fail_kind: Option<String>,
}

#[async_trait]
impl ControllerRegistry for MockRegistry {
    async fn register(&mut self, reconciler: HelmReconciler) -> Result<(), ManagerError> {
        if self.fail_kind.as_deref() == Some(reconciler.gvk().kind.as_str()) {
            return Err(ManagerError::DuplicateController(reconciler.gvk_label()));
        }
        self.registered.push(reconciler);
        Ok(())
    }
}

/// A client pointed at an unroutable address; it never connects unless used
pub fn offline_client() -> kube::Client {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let config = kube::Config::new("http://127.0.0.1:1".parse().unwrap());
    kube::Client::try_from(config).unwrap()
}
