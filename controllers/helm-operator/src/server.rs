//! # HTTP servers
//!
//! Two listeners, each optional:
//! - probe address: `/healthz` (liveness) and `/readyz` (readiness)
//! - metrics address: `/metrics` in the Prometheus text format
//!
//! Bind addresses use `host:port` syntax. A bare `:port` binds every
//! interface and `"0"` disables the server.

use crate::constants::DISABLED_BIND_ADDRESS;
use crate::healthz::HealthChecks;
use crate::manager::ManagerError;
use crate::metrics::Metrics;
use crate::shutdown;
use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

/// Normalize a bind address; `None` means the server is disabled
pub fn parse_bind_address(address: &str) -> Result<Option<String>, ManagerError> {
    let address = address.trim();
    if address == DISABLED_BIND_ADDRESS {
        return Ok(None);
    }
    let invalid = |reason: &str| ManagerError::InvalidBindAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let Some((host, port)) = address.rsplit_once(':') else {
        return Err(invalid("expected host:port"));
    };
    port.parse::<u16>()
        .map_err(|_| invalid("port must be a number between 0 and 65535"))?;

    let host = if host.is_empty() { "0.0.0.0" } else { host };
    Ok(Some(format!("{host}:{port}")))
}

pub async fn bind(address: &str) -> Result<TcpListener, ManagerError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| ManagerError::Bind {
            address: address.to_string(),
            source,
        })
}

struct ProbeState {
    healthz: HealthChecks,
    readyz: HealthChecks,
}

pub fn probe_router(healthz: HealthChecks, readyz: HealthChecks) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .with_state(Arc::new(ProbeState { healthz, readyz }))
}

pub fn metrics_router(metrics: Metrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

/// Serve `router` on `listener` until the stop flag is raised
pub async fn serve(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    stop: watch::Receiver<bool>,
) -> Result<(), ManagerError> {
    if let Ok(address) = listener.local_addr() {
        info!("Serving {} on {}", name, address);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown::wait(stop))
        .await
        .map_err(|source| ManagerError::Serve { name, source })
}

async fn healthz_handler(State(state): State<Arc<ProbeState>>) -> impl IntoResponse {
    check_response(&state.healthz)
}

async fn readyz_handler(State(state): State<Arc<ProbeState>>) -> impl IntoResponse {
    check_response(&state.readyz)
}

fn check_response(checks: &HealthChecks) -> (StatusCode, String) {
    let report = checks.report();
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, report.body)
}

async fn metrics_handler(State(metrics): State<Metrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {e}"),
            )
        }
    }
}
