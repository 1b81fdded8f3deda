//! Unit tests for the chart reconciler

use super::*;
use crate::annotation::{INSTALL_DISABLE_HOOKS, UPGRADE_FORCE};
use crate::test_utils::{gvk, test_chart};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;
use kube::api::ApiResource;

fn requirement(key: &str, operator: &str, values: &[&str]) -> LabelSelectorRequirement {
    LabelSelectorRequirement {
        key: key.to_string(),
        operator: operator.to_string(),
        values: (!values.is_empty()).then(|| values.iter().map(|v| v.to_string()).collect()),
    }
}

#[test]
fn test_builder_defaults() {
    let reconciler = HelmReconciler::builder()
        .chart(test_chart("myapp"))
        .gvk(gvk("MyApp"))
        .build()
        .unwrap();

    assert!(reconciler.watch_dependent_resources());
    assert_eq!(reconciler.max_concurrent_reconciles(), 1);
    assert!(reconciler.label_selector().is_none());
    assert_eq!(reconciler.install_annotations(), [INSTALL_DISABLE_HOOKS]);
    assert!(reconciler.upgrade_annotations().iter().any(|a| a == UPGRADE_FORCE));
    assert_eq!(reconciler.uninstall_annotations().len(), 1);
    assert_eq!(reconciler.gvk_label(), "example.com/v1, Kind=MyApp");
}

#[test]
fn test_builder_requires_chart_and_gvk() {
    assert!(matches!(
        HelmReconciler::builder().gvk(gvk("MyApp")).build(),
        Err(ReconcilerError::MissingChart)
    ));
    assert!(matches!(
        HelmReconciler::builder().chart(test_chart("myapp")).build(),
        Err(ReconcilerError::MissingGvk)
    ));
}

#[test]
fn test_builder_rejects_incomplete_gvk() {
    let result = HelmReconciler::builder()
        .chart(test_chart("myapp"))
        .gvk(GroupVersionKind::gvk("example.com", "v1", ""))
        .build();
    assert!(matches!(result, Err(ReconcilerError::IncompleteGvk)));
}

#[test]
fn test_builder_rejects_library_chart() {
    let mut chart = test_chart("common");
    chart.metadata.chart_type = Some("library".to_string());
    let result = HelmReconciler::builder().chart(chart).gvk(gvk("MyApp")).build();
    assert!(matches!(result, Err(ReconcilerError::LibraryChart(name)) if name == "common"));
}

#[test]
fn test_builder_rejects_zero_concurrency() {
    let result = HelmReconciler::builder()
        .chart(test_chart("myapp"))
        .gvk(gvk("MyApp"))
        .max_concurrent_reconciles(0)
        .build();
    assert!(matches!(result, Err(ReconcilerError::InvalidConcurrency)));
}

#[test]
fn test_custom_annotations_replace_defaults() {
    let reconciler = HelmReconciler::builder()
        .chart(test_chart("myapp"))
        .gvk(gvk("MyApp"))
        .upgrade_annotations(["example.com/custom"])
        .build()
        .unwrap();
    assert_eq!(reconciler.upgrade_annotations(), ["example.com/custom".to_string()]);
}

#[test]
fn test_selector_rendering() {
    let selector = LabelSelector {
        match_labels: Some(BTreeMap::from([
            ("app".to_string(), "web".to_string()),
            ("tier".to_string(), "front".to_string()),
        ])),
        match_expressions: Some(vec![
            requirement("env", "In", &["prod", "staging"]),
            requirement("canary", "NotIn", &["true"]),
            requirement("owner", "Exists", &[]),
            requirement("legacy", "DoesNotExist", &[]),
        ]),
    };
    assert_eq!(
        selector_to_string(&selector).unwrap().as_deref(),
        Some("app=web,tier=front,env in (prod,staging),canary notin (true),owner,!legacy")
    );
}

#[test]
fn test_empty_selector_renders_none() {
    assert_eq!(selector_to_string(&LabelSelector::default()).unwrap(), None);
}

#[test]
fn test_invalid_selectors_rejected() {
    let unknown = LabelSelector {
        match_expressions: Some(vec![requirement("env", "Matches", &["prod"])]),
        ..LabelSelector::default()
    };
    assert!(matches!(
        selector_to_string(&unknown),
        Err(ReconcilerError::InvalidSelector(_))
    ));

    let empty_in = LabelSelector {
        match_expressions: Some(vec![requirement("env", "In", &[])]),
        ..LabelSelector::default()
    };
    assert!(matches!(
        selector_to_string(&empty_in),
        Err(ReconcilerError::InvalidSelector(_))
    ));
}

#[test]
fn test_requeue_action_follows_period() {
    let periodic = HelmReconciler::builder()
        .chart(test_chart("myapp"))
        .gvk(gvk("MyApp"))
        .reconcile_period(Duration::from_secs(30))
        .build()
        .unwrap();
    assert_eq!(periodic.requeue_action(), Action::requeue(Duration::from_secs(30)));

    let on_change = HelmReconciler::builder()
        .chart(test_chart("myapp"))
        .gvk(gvk("MyApp"))
        .build()
        .unwrap();
    assert_eq!(on_change.requeue_action(), Action::await_change());
}

fn context(period: Duration) -> Arc<ReconcileContext> {
    let reconciler = HelmReconciler::builder()
        .chart(test_chart("myapp"))
        .gvk(gvk("MyApp"))
        .reconcile_period(period)
        .build()
        .unwrap();
    Arc::new(ReconcileContext {
        reconciler: Arc::new(reconciler),
        metrics: Metrics::new().unwrap(),
    })
}

#[tokio::test]
async fn test_reconcile_requeues_and_counts() {
    let ctx = context(Duration::from_secs(45));
    let resource = ApiResource::from_gvk(&gvk("MyApp"));
    let obj = Arc::new(DynamicObject::new("demo", &resource).within("team-a"));

    let action = reconcile(obj, ctx.clone()).await.unwrap();
    assert_eq!(action, Action::requeue(Duration::from_secs(45)));
    assert!(
        ctx.metrics
            .encode()
            .unwrap()
            .contains(r#"helm_operator_reconcile_total{kind="MyApp",result="success"} 1"#)
    );
}

#[tokio::test]
async fn test_reconcile_rejects_nameless_object() {
    let ctx = context(Duration::ZERO);
    let resource = ApiResource::from_gvk(&gvk("MyApp"));
    let mut obj = DynamicObject::new("demo", &resource);
    obj.metadata.name = None;

    let err = reconcile(Arc::new(obj), ctx.clone()).await.unwrap_err();
    assert!(matches!(err, ReconcileError::MissingName));

    let obj = Arc::new(DynamicObject::new("demo", &resource));
    assert_eq!(
        error_policy(obj, &err, ctx.clone()),
        Action::requeue(Duration::from_secs(60))
    );
    assert!(ctx.metrics.encode().unwrap().contains(r#"result="error"} 1"#));
}
