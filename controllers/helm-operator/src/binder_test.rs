//! Unit tests for watch binding

use super::*;
use crate::test_utils::{MockRegistry, chart_root, watch_entry};
use chart_loader::DirChartLoader;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use std::collections::BTreeMap;

fn tuning() -> ReconcileTuning {
    ReconcileTuning {
        max_concurrent_reconciles: 4,
        reconcile_period: Duration::from_secs(60),
    }
}

#[tokio::test]
async fn test_empty_watch_list_registers_nothing() {
    let mut registry = MockRegistry::default();
    let bound = WatchBinder::new(DirChartLoader)
        .bind(&[], &mut registry, &tuning())
        .await
        .unwrap();
    assert_eq!(bound, 0);
    assert!(registry.registered.is_empty());
}

#[tokio::test]
async fn test_binds_entries_in_order_with_process_defaults() {
    let charts = chart_root(&["app-a", "app-b"]);
    let watches = vec![
        watch_entry("AppA", charts.path().join("app-a")),
        watch_entry("AppB", charts.path().join("app-b")),
    ];
    let mut registry = MockRegistry::default();

    let bound = WatchBinder::new(DirChartLoader)
        .bind(&watches, &mut registry, &tuning())
        .await
        .unwrap();

    assert_eq!(bound, 2);
    let kinds: Vec<&str> = registry
        .registered
        .iter()
        .map(|r| r.gvk().kind.as_str())
        .collect();
    assert_eq!(kinds, vec!["AppA", "AppB"]);
    let first = &registry.registered[0];
    assert_eq!(first.chart().name(), "app-a");
    assert_eq!(first.max_concurrent_reconciles(), 4);
    assert_eq!(first.reconcile_period(), Duration::from_secs(60));
    assert!(!first.install_annotations().is_empty());
}

#[tokio::test]
async fn test_entry_tuning_overrides_process_defaults() {
    let charts = chart_root(&["app-a"]);
    let mut watch = watch_entry("AppA", charts.path().join("app-a"));
    watch.max_concurrent_reconciles = Some(2);
    watch.reconcile_period = Some(Duration::from_secs(5));
    watch.watch_dependent_resources = false;
    watch.override_values = BTreeMap::from([("image.tag".to_string(), "v2".to_string())]);
    watch.selector = LabelSelector {
        match_expressions: Some(vec![LabelSelectorRequirement {
            key: "tier".to_string(),
            operator: "Exists".to_string(),
            values: None,
        }]),
        ..LabelSelector::default()
    };
    let mut registry = MockRegistry::default();

    WatchBinder::new(DirChartLoader)
        .bind(&[watch], &mut registry, &tuning())
        .await
        .unwrap();

    let reconciler = &registry.registered[0];
    assert_eq!(reconciler.max_concurrent_reconciles(), 2);
    assert_eq!(reconciler.reconcile_period(), Duration::from_secs(5));
    assert!(!reconciler.watch_dependent_resources());
    assert_eq!(
        reconciler.override_values().get("image.tag").map(String::as_str),
        Some("v2")
    );
    assert_eq!(reconciler.label_selector(), Some("tier"));
}

#[tokio::test]
async fn test_invalid_chart_aborts_before_later_entries() {
    let charts = chart_root(&["app-a", "app-c"]);
    let watches = vec![
        watch_entry("AppA", charts.path().join("app-a")),
        watch_entry("AppB", charts.path().join("missing")),
        watch_entry("AppC", charts.path().join("app-c")),
    ];
    let mut registry = MockRegistry::default();

    let err = WatchBinder::new(DirChartLoader)
        .bind(&watches, &mut registry, &tuning())
        .await
        .unwrap_err();

    assert!(matches!(err, BindError::Chart { ref gvk, .. } if gvk.contains("AppB")));
    assert_eq!(registry.registered.len(), 1, "only entries before the failure are bound");
    assert_eq!(registry.registered[0].gvk().kind, "AppA");
}

#[tokio::test]
async fn test_registration_failure_is_fatal() {
    let charts = chart_root(&["app-a", "app-b"]);
    let watches = vec![
        watch_entry("AppA", charts.path().join("app-a")),
        watch_entry("AppB", charts.path().join("app-b")),
    ];
    let mut registry = MockRegistry {
        fail_kind: Some("AppA".to_string()),
        ..MockRegistry::default()
    };

    let err = WatchBinder::new(DirChartLoader)
        .bind(&watches, &mut registry, &tuning())
        .await
        .unwrap_err();

    assert!(matches!(err, BindError::Register { .. }));
    assert!(registry.registered.is_empty());
}

#[tokio::test]
async fn test_invalid_selector_is_fatal() {
    let charts = chart_root(&["app-a"]);
    let mut watch = watch_entry("AppA", charts.path().join("app-a"));
    watch.selector = LabelSelector {
        match_expressions: Some(vec![LabelSelectorRequirement {
            key: "tier".to_string(),
            operator: "Near".to_string(),
            values: None,
        }]),
        ..LabelSelector::default()
    };
    let mut registry = MockRegistry::default();

    let err = WatchBinder::new(DirChartLoader)
        .bind(&[watch], &mut registry, &tuning())
        .await
        .unwrap_err();
    assert!(matches!(err, BindError::Reconciler { .. }));
}
