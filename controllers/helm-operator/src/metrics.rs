//! Prometheus metrics.
//!
//! Metrics live in a registry owned by the manager and are served on the
//! metrics bind address.

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use std::fmt;

const BUILD_INFO: &str = "helm_operator_build_info";
const RECONCILE_TOTAL: &str = "helm_operator_reconcile_total";

pub const RESULT_SUCCESS: &str = "success";
pub const RESULT_ERROR: &str = "error";

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reconcile_total: IntCounterVec,
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let build_info = IntGaugeVec::new(
            Opts::new(BUILD_INFO, "Build information of the running operator"),
            &["version", "commit"],
        )?;
        registry.register(Box::new(build_info.clone()))?;
        build_info
            .with_label_values(&[crate::VERSION, crate::GIT_COMMIT])
            .set(1);

        let reconcile_total = IntCounterVec::new(
            Opts::new(RECONCILE_TOTAL, "Reconciles by watched kind and result"),
            &["kind", "result"],
        )?;
        registry.register(Box::new(reconcile_total.clone()))?;

        Ok(Self {
            registry,
            reconcile_total,
        })
    }

    pub fn observe_reconcile(&self, kind: &str, result: &str) {
        self.reconcile_total.with_label_values(&[kind, result]).inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_is_exported() {
        let metrics = Metrics::new().unwrap();
        let text = metrics.encode().unwrap();
        assert!(text.contains(BUILD_INFO), "got {text}");
        assert!(text.contains(crate::VERSION));
    }

    #[test]
    fn test_reconcile_counter() {
        let metrics = Metrics::new().unwrap();
        metrics.observe_reconcile("MyApp", RESULT_SUCCESS);
        metrics.observe_reconcile("MyApp", RESULT_SUCCESS);
        metrics.observe_reconcile("MyApp", RESULT_ERROR);

        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"helm_operator_reconcile_total{kind="MyApp",result="success"} 2"#));
        assert!(text.contains(r#"helm_operator_reconcile_total{kind="MyApp",result="error"} 1"#));
    }

    #[test]
    fn test_registries_are_independent() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.observe_reconcile("MyApp", RESULT_SUCCESS);
        assert!(!second.encode().unwrap().contains("kind=\"MyApp\""));
    }
}
