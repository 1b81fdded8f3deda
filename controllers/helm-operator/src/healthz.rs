//! Named health checks behind the liveness and readiness probes.

use crate::manager::ManagerError;
use std::fmt;
use std::sync::Arc;

pub type Checker = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

/// Always passes once the process is serving
pub fn ping() -> Result<(), String> {
    Ok(())
}

#[derive(Clone, Default)]
pub struct HealthChecks {
    checks: Vec<(String, Checker)>,
}

impl fmt::Debug for HealthChecks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.checks.iter().map(|(name, _)| name))
            .finish()
    }
}

/// Outcome of running every check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub healthy: bool,
    pub body: String,
}

impl HealthChecks {
    pub fn add(&mut self, name: &str, check: Checker) -> Result<(), ManagerError> {
        if self.checks.iter().any(|(existing, _)| existing == name) {
            return Err(ManagerError::DuplicateCheck(name.to_string()));
        }
        self.checks.push((name.to_string(), check));
        Ok(())
    }

    /// Run every check; healthy only when all pass
    pub fn report(&self) -> Report {
        let mut healthy = true;
        let mut lines = Vec::with_capacity(self.checks.len() + 1);
        for (name, check) in &self.checks {
            match check() {
                Ok(()) => lines.push(format!("[+]{name} ok")),
                Err(reason) => {
                    healthy = false;
                    lines.push(format!("[-]{name} failed: {reason}"));
                }
            }
        }
        lines.push(if healthy { "ok" } else { "check failed" }.to_string());
        Report {
            healthy,
            body: lines.join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_passing() {
        let mut checks = HealthChecks::default();
        checks.add("ping", Arc::new(ping)).unwrap();
        let report = checks.report();
        assert!(report.healthy);
        assert_eq!(report.body, "[+]ping ok\nok");
    }

    #[test]
    fn test_failure_is_reported() {
        let mut checks = HealthChecks::default();
        checks.add("ping", Arc::new(ping)).unwrap();
        checks
            .add("cache", Arc::new(|| -> Result<(), String> { Err("not synced".to_string()) }))
            .unwrap();
        let report = checks.report();
        assert!(!report.healthy);
        assert!(report.body.contains("[-]cache failed: not synced"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut checks = HealthChecks::default();
        checks.add("ping", Arc::new(ping)).unwrap();
        assert!(matches!(
            checks.add("ping", Arc::new(ping)),
            Err(ManagerError::DuplicateCheck(name)) if name == "ping"
        ));
        assert_eq!(checks.report().body, "[+]ping ok\nok", "the first check is kept once");
    }

    #[test]
    fn test_empty_checks_are_healthy() {
        assert!(HealthChecks::default().report().healthy);
    }
}
