//! # Constants
//!
//! Environment variable names and built-in defaults shared across the operator.

/// Namespace scope signal: unset, empty, a single name or a comma separated list
pub const WATCH_NAMESPACE_ENV: &str = "WATCH_NAMESPACE";

/// Legacy project scaffolding variable that may seed the leader election id
pub const OPERATOR_NAME_ENV: &str = "OPERATOR_NAME";

pub const WATCHES_FILE_ENV: &str = "HELM_OPERATOR_WATCHES_FILE";
pub const METRICS_BIND_ADDRESS_ENV: &str = "HELM_OPERATOR_METRICS_BIND_ADDRESS";
pub const HEALTH_PROBE_BIND_ADDRESS_ENV: &str = "HELM_OPERATOR_HEALTH_PROBE_BIND_ADDRESS";
pub const LEADER_ELECT_ENV: &str = "HELM_OPERATOR_LEADER_ELECT";
pub const LEADER_ELECTION_ID_ENV: &str = "HELM_OPERATOR_LEADER_ELECTION_ID";
pub const LEADER_ELECTION_NAMESPACE_ENV: &str = "HELM_OPERATOR_LEADER_ELECTION_NAMESPACE";
pub const MAX_CONCURRENT_RECONCILES_ENV: &str = "HELM_OPERATOR_MAX_CONCURRENT_RECONCILES";
pub const RECONCILE_PERIOD_ENV: &str = "HELM_OPERATOR_RECONCILE_PERIOD";

pub const DEFAULT_WATCHES_FILE: &str = "./watches.yaml";
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = ":8080";
pub const DEFAULT_HEALTH_PROBE_BIND_ADDRESS: &str = ":8081";
pub const DEFAULT_RECONCILE_PERIOD_SECS: u64 = 60;

/// Bind address value that disables a server
pub const DISABLED_BIND_ADDRESS: &str = "0";

pub const HEALTHZ_CHECK_NAME: &str = "healthz";
pub const READYZ_CHECK_NAME: &str = "readyz";
