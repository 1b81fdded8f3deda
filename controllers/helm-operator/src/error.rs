//! Operator error types.
//!
//! Every stage of startup returns one of these; `main` is the single place
//! that turns them into a process exit.

use crate::binder::BindError;
use crate::capability::UnsupportedFields;
use crate::config::ConfigError;
use crate::manager::ManagerError;
use thiserror::Error;
use watches::WatchesError;

/// Errors that abort the operator process.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Conflicting flags, unreadable config file or invalid values
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Fields set that this operator cannot serve
    #[error("{0}")]
    Unsupported(#[from] UnsupportedFields),

    /// No usable kubeconfig or in-cluster configuration
    #[error("failed to get cluster client config: {0}")]
    ClientConfig(#[from] kube::config::InferConfigError),

    /// The Kubernetes client could not be built from the configuration
    #[error("failed to create Kubernetes client: {0}")]
    Client(#[source] kube::Error),

    /// The manager could not be constructed
    #[error("failed to create a new manager: {0}")]
    Manager(#[from] ManagerError),

    /// A health or readiness check could not be attached
    #[error("unable to set up health check: {0}")]
    HealthCheck(#[source] ManagerError),

    /// The watch file could not be loaded
    #[error("failed to load watches: {0}")]
    Watches(#[from] WatchesError),

    /// A watch could not be bound to a controller
    #[error("failed to bind watches: {0}")]
    Bind(#[from] BindError),

    /// The manager run loop exited with an error
    #[error("manager exited non-zero: {0}")]
    RunLoop(#[source] ManagerError),
}
