//! # Controller manager
//!
//! Owns the cluster client, the registered controllers, the health checks and
//! the metrics registry, and runs all of them until shutdown.
//!
//! Controllers are registered during startup and only start when
//! [`Manager::start`] is called. A failure of any server or controller stops
//! the rest and is returned from `start`.

use crate::binder::ControllerRegistry;
use crate::config::{EffectiveConfig, LeaderElectionConfig};
use crate::healthz::HealthChecks;
use crate::metrics::Metrics;
use crate::reconciler::{HelmReconciler, ReconcileContext};
use crate::scope::CacheStrategy;
use crate::{server, watcher};
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject};
use kube::discovery::{self, Scope};
use kube::{Api, Client};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("unable to discover {gvk}: {source}")]
    Discovery {
        gvk: String,
        #[source]
        source: kube::Error,
    },

    #[error("a controller for {0} is already registered")]
    DuplicateController(String),

    #[error("health check {0} is already registered")]
    DuplicateCheck(String),

    #[error("invalid bind address '{address}': {reason}")]
    InvalidBindAddress { address: String, reason: String },

    #[error("unable to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} server failed: {source}")]
    Serve {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("controller for {0} stopped unexpectedly")]
    ControllerExited(String),

    #[error("manager task failed: {0}")]
    Task(String),
}

/// Manager settings derived from the effective configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerOptions {
    pub cache: CacheStrategy,
    /// `None` disables the metrics server
    pub metrics_bind_address: Option<String>,
    /// `None` disables the probe server
    pub health_probe_bind_address: Option<String>,
    pub leader_election: LeaderElectionConfig,
}

impl ManagerOptions {
    pub fn from_config(
        config: &EffectiveConfig,
        cache: CacheStrategy,
    ) -> Result<Self, ManagerError> {
        Ok(Self {
            cache,
            metrics_bind_address: server::parse_bind_address(&config.metrics_bind_address)?,
            health_probe_bind_address: server::parse_bind_address(
                &config.health_probe_bind_address,
            )?,
            leader_election: config.leader_election.clone(),
        })
    }
}

struct RegisteredController {
    reconciler: Arc<HelmReconciler>,
    resource: ApiResource,
    namespaced: bool,
}

pub struct Manager {
    client: Client,
    options: ManagerOptions,
    metrics: Metrics,
    healthz: HealthChecks,
    readyz: HealthChecks,
    controllers: Vec<RegisteredController>,
}

impl Manager {
    pub fn new(client: Client, options: ManagerOptions) -> Result<Self, ManagerError> {
        if options.leader_election.enabled {
            info!(
                id = options.leader_election.id.as_deref().unwrap_or_default(),
                namespace = options.leader_election.namespace.as_deref().unwrap_or_default(),
                "Leader election requested"
            );
        }
        Ok(Self {
            client,
            options,
            metrics: Metrics::new()?,
            healthz: HealthChecks::default(),
            readyz: HealthChecks::default(),
            controllers: Vec::new(),
        })
    }

    pub fn add_healthz_check<F>(&mut self, name: &str, check: F) -> Result<(), ManagerError>
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        self.healthz.add(name, Arc::new(check))
    }

    pub fn add_readyz_check<F>(&mut self, name: &str, check: F) -> Result<(), ManagerError>
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        self.readyz.add(name, Arc::new(check))
    }

    fn add_controller(
        &mut self,
        reconciler: HelmReconciler,
        resource: ApiResource,
        namespaced: bool,
    ) -> Result<(), ManagerError> {
        if self
            .controllers
            .iter()
            .any(|c| c.reconciler.gvk() == reconciler.gvk())
        {
            return Err(ManagerError::DuplicateController(reconciler.gvk_label()));
        }
        self.controllers.push(RegisteredController {
            reconciler: Arc::new(reconciler),
            resource,
            namespaced,
        });
        Ok(())
    }

    /// Watch APIs for a controller, one per namespace its scope covers
    fn apis_for(&self, controller: &RegisteredController) -> Vec<(Api<DynamicObject>, Option<String>)> {
        self.options
            .cache
            .watch_namespaces(controller.namespaced)
            .into_iter()
            .map(|namespace| {
                let api = match &namespace {
                    Some(ns) => Api::namespaced_with(self.client.clone(), ns, &controller.resource),
                    None => Api::all_with(self.client.clone(), &controller.resource),
                };
                (api, namespace)
            })
            .collect()
    }

    /// Run servers and controllers until `shutdown` resolves or one of them
    /// fails. Everything still running is stopped before returning.
    pub async fn start<S>(self, shutdown: S) -> Result<(), ManagerError>
    where
        S: Future<Output = ()> + Send,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut tasks: JoinSet<Result<(), ManagerError>> = JoinSet::new();

        if let Some(address) = &self.options.health_probe_bind_address {
            let listener = server::bind(address).await?;
            let router = server::probe_router(self.healthz.clone(), self.readyz.clone());
            tasks.spawn(server::serve("health probes", listener, router, stop_rx.clone()));
        }
        if let Some(address) = &self.options.metrics_bind_address {
            let listener = server::bind(address).await?;
            let router = server::metrics_router(self.metrics.clone());
            tasks.spawn(server::serve("metrics", listener, router, stop_rx.clone()));
        }

        for controller in &self.controllers {
            let ctx = Arc::new(ReconcileContext {
                reconciler: controller.reconciler.clone(),
                metrics: self.metrics.clone(),
            });
            for (api, namespace) in self.apis_for(controller) {
                tasks.spawn(watcher::watch_resource(
                    api,
                    controller.resource.clone(),
                    namespace,
                    ctx.clone(),
                    stop_rx.clone(),
                ));
            }
        }

        info!(
            controllers = self.controllers.len(),
            tasks = tasks.len(),
            "Starting manager"
        );

        let result = tokio::select! {
            () = shutdown => {
                info!("Stopping manager");
                Ok(())
            }
            Some(joined) = tasks.join_next() => match joined {
                Ok(Ok(())) => Err(ManagerError::Task("task exited before shutdown".to_string())),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(ManagerError::Task(e.to_string())),
            },
        };

        let _ = stop_tx.send(true);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Error while stopping: {}", e),
                Err(e) => warn!("Task failed while stopping: {}", e),
            }
        }
        result
    }
}

#[async_trait]
impl ControllerRegistry for Manager {
    /// Resolve the kind against the API server and record its controller
    async fn register(&mut self, reconciler: HelmReconciler) -> Result<(), ManagerError> {
        let (resource, capabilities) = discovery::pinned_kind(&self.client, reconciler.gvk())
            .await
            .map_err(|source| ManagerError::Discovery {
                gvk: reconciler.gvk_label(),
                source,
            })?;
        let namespaced = matches!(capabilities.scope, Scope::Namespaced);
        self.add_controller(reconciler, resource, namespaced)
    }
}
