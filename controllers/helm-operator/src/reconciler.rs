//! # Chart reconciler
//!
//! A [`HelmReconciler`] pairs one watched kind with the chart that backs it.
//! It is built once per watch entry and owns its chart from then on.
//!
//! Release installation itself is delegated to the release engine; the
//! reconcile loop here records each object it sees and schedules the next
//! periodic pass.

use crate::annotation::{
    DEFAULT_INSTALL_ANNOTATIONS, DEFAULT_UNINSTALL_ANNOTATIONS, DEFAULT_UPGRADE_ANNOTATIONS,
};
use crate::metrics::{Metrics, RESULT_ERROR, RESULT_SUCCESS};
use chart_loader::ChartArtifact;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::{DynamicObject, GroupVersionKind};
use kube_runtime::controller::Action;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors building a reconciler
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("a chart is required")]
    MissingChart,

    #[error("a group/version/kind is required")]
    MissingGvk,

    #[error("group/version/kind must set version and kind")]
    IncompleteGvk,

    #[error("chart {0} is a library chart and cannot be installed")]
    LibraryChart(String),

    #[error("max concurrent reconciles must be at least 1")]
    InvalidConcurrency,

    #[error("invalid selector: {0}")]
    InvalidSelector(String),
}

/// Errors raised while reconciling a single object
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("object has no name")]
    MissingName,
}

#[derive(Debug, Clone)]
pub struct HelmReconciler {
    chart: ChartArtifact,
    gvk: GroupVersionKind,
    override_values: BTreeMap<String, String>,
    selector: LabelSelector,
    label_selector: Option<String>,
    watch_dependent_resources: bool,
    max_concurrent_reconciles: usize,
    reconcile_period: Duration,
    install_annotations: Vec<String>,
    upgrade_annotations: Vec<String>,
    uninstall_annotations: Vec<String>,
}

impl HelmReconciler {
    pub fn builder() -> HelmReconcilerBuilder {
        HelmReconcilerBuilder::default()
    }

    pub fn chart(&self) -> &ChartArtifact {
        &self.chart
    }

    pub fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }

    /// Human readable GVK, e.g. `example.com/v1, Kind=MyApp`
    pub fn gvk_label(&self) -> String {
        if self.gvk.group.is_empty() {
            format!("{}, Kind={}", self.gvk.version, self.gvk.kind)
        } else {
            format!("{}/{}, Kind={}", self.gvk.group, self.gvk.version, self.gvk.kind)
        }
    }

    pub fn override_values(&self) -> &BTreeMap<String, String> {
        &self.override_values
    }

    pub fn selector(&self) -> &LabelSelector {
        &self.selector
    }

    /// The selector in list-option form; `None` selects every object
    pub fn label_selector(&self) -> Option<&str> {
        self.label_selector.as_deref()
    }

    pub fn watch_dependent_resources(&self) -> bool {
        self.watch_dependent_resources
    }

    pub fn max_concurrent_reconciles(&self) -> usize {
        self.max_concurrent_reconciles
    }

    pub fn reconcile_period(&self) -> Duration {
        self.reconcile_period
    }

    pub fn install_annotations(&self) -> &[String] {
        &self.install_annotations
    }

    pub fn upgrade_annotations(&self) -> &[String] {
        &self.upgrade_annotations
    }

    pub fn uninstall_annotations(&self) -> &[String] {
        &self.uninstall_annotations
    }

    /// Next action after a successful pass. A zero period waits for changes.
    pub fn requeue_action(&self) -> Action {
        if self.reconcile_period.is_zero() {
            Action::await_change()
        } else {
            Action::requeue(self.reconcile_period)
        }
    }
}

/// Builder for [`HelmReconciler`]
///
/// Chart and GVK are required. Dependent watches default to on, concurrency
/// to 1, the reconcile period to zero and the annotation sets to the
/// standard lifecycle annotations.
#[derive(Debug, Clone)]
pub struct HelmReconcilerBuilder {
    chart: Option<ChartArtifact>,
    gvk: Option<GroupVersionKind>,
    override_values: BTreeMap<String, String>,
    selector: LabelSelector,
    watch_dependent_resources: bool,
    max_concurrent_reconciles: usize,
    reconcile_period: Duration,
    install_annotations: Vec<String>,
    upgrade_annotations: Vec<String>,
    uninstall_annotations: Vec<String>,
}

impl Default for HelmReconcilerBuilder {
    fn default() -> Self {
        Self {
            chart: None,
            gvk: None,
            override_values: BTreeMap::new(),
            selector: LabelSelector::default(),
            watch_dependent_resources: true,
            max_concurrent_reconciles: 1,
            reconcile_period: Duration::ZERO,
            install_annotations: to_strings(DEFAULT_INSTALL_ANNOTATIONS),
            upgrade_annotations: to_strings(DEFAULT_UPGRADE_ANNOTATIONS),
            uninstall_annotations: to_strings(DEFAULT_UNINSTALL_ANNOTATIONS),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl HelmReconcilerBuilder {
    pub fn chart(mut self, chart: ChartArtifact) -> Self {
        self.chart = Some(chart);
        self
    }

    pub fn gvk(mut self, gvk: GroupVersionKind) -> Self {
        self.gvk = Some(gvk);
        self
    }

    pub fn override_values(mut self, values: BTreeMap<String, String>) -> Self {
        self.override_values = values;
        self
    }

    pub fn selector(mut self, selector: LabelSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn watch_dependent_resources(mut self, watch: bool) -> Self {
        self.watch_dependent_resources = watch;
        self
    }

    pub fn max_concurrent_reconciles(mut self, max: usize) -> Self {
        self.max_concurrent_reconciles = max;
        self
    }

    pub fn reconcile_period(mut self, period: Duration) -> Self {
        self.reconcile_period = period;
        self
    }

    pub fn install_annotations<I, S>(mut self, annotations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.install_annotations = annotations.into_iter().map(Into::into).collect();
        self
    }

    pub fn upgrade_annotations<I, S>(mut self, annotations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.upgrade_annotations = annotations.into_iter().map(Into::into).collect();
        self
    }

    pub fn uninstall_annotations<I, S>(mut self, annotations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uninstall_annotations = annotations.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<HelmReconciler, ReconcilerError> {
        let chart = self.chart.ok_or(ReconcilerError::MissingChart)?;
        let gvk = self.gvk.ok_or(ReconcilerError::MissingGvk)?;
        if gvk.version.is_empty() || gvk.kind.is_empty() {
            return Err(ReconcilerError::IncompleteGvk);
        }
        if chart.is_library() {
            return Err(ReconcilerError::LibraryChart(chart.name().to_string()));
        }
        if self.max_concurrent_reconciles == 0 {
            return Err(ReconcilerError::InvalidConcurrency);
        }
        let label_selector = selector_to_string(&self.selector)?;

        Ok(HelmReconciler {
            chart,
            gvk,
            override_values: self.override_values,
            selector: self.selector,
            label_selector,
            watch_dependent_resources: self.watch_dependent_resources,
            max_concurrent_reconciles: self.max_concurrent_reconciles,
            reconcile_period: self.reconcile_period,
            install_annotations: self.install_annotations,
            upgrade_annotations: self.upgrade_annotations,
            uninstall_annotations: self.uninstall_annotations,
        })
    }
}

/// Render a label selector in list-option syntax.
///
/// Returns `None` for an empty selector.
pub fn selector_to_string(selector: &LabelSelector) -> Result<Option<String>, ReconcilerError> {
    let mut parts: Vec<String> = selector
        .match_labels
        .iter()
        .flatten()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();

    for requirement in selector.match_expressions.iter().flatten() {
        let key = &requirement.key;
        let values = requirement.values.as_deref().unwrap_or_default();
        let part = match requirement.operator.as_str() {
            "In" | "NotIn" if values.is_empty() => {
                return Err(ReconcilerError::InvalidSelector(format!(
                    "operator {} on key {key} requires at least one value",
                    requirement.operator
                )));
            }
            "In" => format!("{key} in ({})", values.join(",")),
            "NotIn" => format!("{key} notin ({})", values.join(",")),
            "Exists" => key.clone(),
            "DoesNotExist" => format!("!{key}"),
            other => {
                return Err(ReconcilerError::InvalidSelector(format!(
                    "unknown operator {other} on key {key}"
                )));
            }
        };
        parts.push(part);
    }

    Ok((!parts.is_empty()).then(|| parts.join(",")))
}

/// Shared state handed to every reconcile call of one controller
pub struct ReconcileContext {
    pub reconciler: Arc<HelmReconciler>,
    pub metrics: Metrics,
}

pub async fn reconcile(
    obj: Arc<DynamicObject>,
    ctx: Arc<ReconcileContext>,
) -> Result<Action, ReconcileError> {
    let reconciler = &ctx.reconciler;
    let kind = &reconciler.gvk().kind;
    let name = obj
        .metadata
        .name
        .as_deref()
        .ok_or(ReconcileError::MissingName)?;
    let namespace = obj.metadata.namespace.as_deref().unwrap_or_default();

    if obj.metadata.deletion_timestamp.is_some() {
        info!(
            kind = %kind,
            namespace,
            release = name,
            "Release marked for uninstall"
        );
    } else {
        debug!(
            kind = %kind,
            namespace,
            release = name,
            chart = reconciler.chart().name(),
            chart_version = reconciler.chart().version(),
            "Reconciling release"
        );
    }

    ctx.metrics.observe_reconcile(kind, RESULT_SUCCESS);
    Ok(reconciler.requeue_action())
}

pub fn error_policy(
    obj: Arc<DynamicObject>,
    error: &ReconcileError,
    ctx: Arc<ReconcileContext>,
) -> Action {
    let kind = &ctx.reconciler.gvk().kind;
    warn!(
        kind = %kind,
        name = obj.metadata.name.as_deref().unwrap_or_default(),
        "Reconcile failed: {}",
        error
    );
    ctx.metrics.observe_reconcile(kind, RESULT_ERROR);
    Action::requeue(Duration::from_secs(60))
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod reconciler_test;
