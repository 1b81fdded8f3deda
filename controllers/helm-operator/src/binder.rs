//! # Watch binding
//!
//! Turns each watch entry into a registered controller. Entries are bound one
//! at a time in file order and the first failure aborts startup, so the
//! operator never runs with a partial set of controllers.

use crate::manager::ManagerError;
use crate::reconciler::{HelmReconciler, ReconcilerError};
use async_trait::async_trait;
use chart_loader::{ChartError, ChartLoader};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use watches::WatchEntry;

/// Trait for the manager side of binding
///
/// Implemented by the real manager and by test doubles.
#[async_trait]
pub trait ControllerRegistry: Send {
    /// Register a controller for the reconciler's kind
    async fn register(&mut self, reconciler: HelmReconciler) -> Result<(), ManagerError>;
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("unable to load chart {} for {gvk}: {source}", chart_dir.display())]
    Chart {
        gvk: String,
        chart_dir: PathBuf,
        #[source]
        source: ChartError,
    },

    #[error("unable to create reconciler for {gvk}: {source}")]
    Reconciler {
        gvk: String,
        #[source]
        source: ReconcilerError,
    },

    #[error("unable to create controller for {gvk}: {source}")]
    Register {
        gvk: String,
        #[source]
        source: ManagerError,
    },
}

/// Process-wide reconcile settings, used where an entry sets none
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileTuning {
    pub max_concurrent_reconciles: usize,
    pub reconcile_period: Duration,
}

pub struct WatchBinder<L> {
    loader: L,
}

impl<L: ChartLoader> WatchBinder<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Bind every entry and return how many controllers were registered.
    pub async fn bind<R>(
        &self,
        watches: &[WatchEntry],
        registry: &mut R,
        tuning: &ReconcileTuning,
    ) -> Result<usize, BindError>
    where
        R: ControllerRegistry + ?Sized,
    {
        for watch in watches {
            let reconciler = self.build(watch, tuning)?;
            let chart = reconciler.chart().name().to_string();
            let max_concurrent_reconciles = reconciler.max_concurrent_reconciles();
            let reconcile_period = reconciler.reconcile_period();

            registry
                .register(reconciler)
                .await
                .map_err(|source| BindError::Register {
                    gvk: watch.gvk_label(),
                    source,
                })?;

            info!(
                gvk = %watch.gvk_label(),
                chart_path = %watch.chart_dir.display(),
                chart = %chart,
                max_concurrent_reconciles,
                reconcile_period = ?reconcile_period,
                "configured watch"
            );
        }
        Ok(watches.len())
    }

    fn build(
        &self,
        watch: &WatchEntry,
        tuning: &ReconcileTuning,
    ) -> Result<HelmReconciler, BindError> {
        let chart = self
            .loader
            .load(&watch.chart_dir)
            .map_err(|source| BindError::Chart {
                gvk: watch.gvk_label(),
                chart_dir: watch.chart_dir.clone(),
                source,
            })?;

        HelmReconciler::builder()
            .chart(chart)
            .gvk(watch.gvk.clone())
            .override_values(watch.override_values.clone())
            .selector(watch.selector.clone())
            .watch_dependent_resources(watch.watch_dependent_resources)
            .max_concurrent_reconciles(
                watch
                    .max_concurrent_reconciles
                    .unwrap_or(tuning.max_concurrent_reconciles),
            )
            .reconcile_period(watch.reconcile_period.unwrap_or(tuning.reconcile_period))
            .build()
            .map_err(|source| BindError::Reconciler {
                gvk: watch.gvk_label(),
                source,
            })
    }
}

#[cfg(test)]
#[path = "binder_test.rs"]
mod binder_test;
