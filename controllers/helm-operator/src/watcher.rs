//! Kubernetes resource watchers.
//!
//! Each registered kind runs one `kube_runtime::Controller` per watched
//! namespace. The controller handles reconnection, retries and backoff; this
//! module only wires it to the reconcile functions and the stop flag.

use crate::manager::ManagerError;
use crate::reconciler::{ReconcileContext, error_policy, reconcile};
use crate::shutdown;
use futures::StreamExt;
use kube::Api;
use kube::api::{ApiResource, DynamicObject};
use kube_runtime::{Controller, controller::Config as ControllerConfig, watcher};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Run a controller for one kind in one namespace (or cluster-wide) until
/// the stop flag is raised.
pub async fn watch_resource(
    api: Api<DynamicObject>,
    resource: ApiResource,
    namespace: Option<String>,
    ctx: Arc<ReconcileContext>,
    stop: watch::Receiver<bool>,
) -> Result<(), ManagerError> {
    let gvk = ctx.reconciler.gvk_label();
    let scope = namespace.as_deref().unwrap_or("all namespaces").to_string();
    info!("Starting {} watcher ({})", gvk, scope);

    let mut watcher_config = watcher::Config::default();
    if let Some(selector) = ctx.reconciler.label_selector() {
        watcher_config = watcher_config.labels(selector);
    }

    let concurrency = u16::try_from(ctx.reconciler.max_concurrent_reconciles()).unwrap_or(u16::MAX);
    let controller_config = ControllerConfig::default().concurrency(concurrency);

    let controller = Controller::new_with(api, watcher_config, resource)
        .with_config(controller_config)
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled {}", obj),
                Err(e) => error!("Controller error: {}", e),
            }
        });

    tokio::select! {
        () = controller => Err(ManagerError::ControllerExited(gvk)),
        () = shutdown::wait(stop) => {
            info!("Stopped {} watcher ({})", gvk, scope);
            Ok(())
        }
    }
}
