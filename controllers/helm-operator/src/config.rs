//! # Configuration resolution
//!
//! Merges the four configuration sources into one [`EffectiveConfig`]:
//!
//! 1. Command line flags that were explicitly set
//! 2. `HELM_OPERATOR_*` environment variables
//! 3. The manager config file (`--config`)
//! 4. Built-in defaults
//!
//! The first source that sets a field wins. Deprecation warnings are
//! returned as [`Notice`]s so the caller decides how to report them.

use crate::cli::FlagConfig;
use crate::constants::*;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("only one of --{first} and --{second} may be set")]
    ConflictingFlags {
        first: &'static str,
        second: &'static str,
    },

    #[error("unable to read manager config file {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse manager config file {}: {source}", path.display())]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Manager config file contents.
///
/// Only the keys the operator consumes are modeled; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    pub cache_namespace: Option<String>,
    pub health: HealthFileConfig,
    pub metrics: MetricsFileConfig,
    pub leader_election: LeaderElectionFileConfig,
    pub webhook: WebhookFileConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthFileConfig {
    pub health_probe_bind_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsFileConfig {
    pub bind_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaderElectionFileConfig {
    pub leader_elect: Option<bool>,
    pub resource_name: Option<String>,
    pub resource_namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookFileConfig {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub cert_dir: Option<String>,
}

impl FileConfig {
    /// Load a manager config file. An empty file yields the default config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values taken from the process environment. Empty variables count as unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub watches_file: Option<PathBuf>,
    pub metrics_bind_address: Option<String>,
    pub health_probe_bind_address: Option<String>,
    pub leader_elect: Option<bool>,
    pub leader_election_id: Option<String>,
    pub leader_election_namespace: Option<String>,
    pub max_concurrent_reconciles: Option<usize>,
    pub reconcile_period: Option<Duration>,
    /// Legacy `OPERATOR_NAME`, present even when empty
    pub operator_name: Option<String>,
}

impl EnvConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let leader_elect = get(LEADER_ELECT_ENV)
            .map(|v| parse_bool(LEADER_ELECT_ENV, &v))
            .transpose()?;
        let max_concurrent_reconciles = get(MAX_CONCURRENT_RECONCILES_ENV)
            .map(|v| {
                v.trim().parse::<usize>().map_err(|e| ConfigError::InvalidEnv {
                    name: MAX_CONCURRENT_RECONCILES_ENV,
                    value: v.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        let reconcile_period = get(RECONCILE_PERIOD_ENV)
            .map(|v| {
                watches::parse_duration(&v).map_err(|e| ConfigError::InvalidEnv {
                    name: RECONCILE_PERIOD_ENV,
                    value: v.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            watches_file: get(WATCHES_FILE_ENV).map(PathBuf::from),
            metrics_bind_address: get(METRICS_BIND_ADDRESS_ENV),
            health_probe_bind_address: get(HEALTH_PROBE_BIND_ADDRESS_ENV),
            leader_elect,
            leader_election_id: get(LEADER_ELECTION_ID_ENV),
            leader_election_namespace: get(LEADER_ELECTION_NAMESPACE_ENV),
            max_concurrent_reconciles,
            reconcile_period,
            operator_name: lookup(OPERATOR_NAME_ENV),
        })
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

/// Values used when no source sets a field
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    pub watches_file: PathBuf,
    pub metrics_bind_address: String,
    pub health_probe_bind_address: String,
    pub leader_election: bool,
    pub max_concurrent_reconciles: usize,
    pub reconcile_period: Duration,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            watches_file: PathBuf::from(DEFAULT_WATCHES_FILE),
            metrics_bind_address: DEFAULT_METRICS_BIND_ADDRESS.to_string(),
            health_probe_bind_address: DEFAULT_HEALTH_PROBE_BIND_ADDRESS.to_string(),
            leader_election: false,
            max_concurrent_reconciles: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1),
            reconcile_period: Duration::from_secs(DEFAULT_RECONCILE_PERIOD_SECS),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderElectionConfig {
    pub enabled: bool,
    pub id: Option<String>,
    pub namespace: Option<String>,
}

/// Webhook serving options; empty or zero means "not set"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookOptions {
    pub cert_dir: String,
    pub host: String,
    pub port: u16,
}

/// The fully merged configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub manager_config_path: Option<PathBuf>,
    pub watches_file: PathBuf,
    pub metrics_bind_address: String,
    pub health_probe_bind_address: String,
    pub leader_election: LeaderElectionConfig,
    pub max_concurrent_reconciles: usize,
    /// Zero disables periodic reconciles
    pub reconcile_period: Duration,
    /// Namespace requested by the config file's `cacheNamespace`
    pub namespace: Option<String>,
    pub webhook: WebhookOptions,
}

/// A non-fatal finding made while resolving configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    DeprecatedFlag {
        flag: &'static str,
        replacement: &'static str,
    },
    DeprecatedEnv {
        name: &'static str,
        replacement: &'static str,
    },
    /// `OPERATOR_NAME` was set but an explicit leader election id won
    OperatorNameIgnored,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::DeprecatedFlag { flag, replacement } => {
                write!(f, "flag --{flag} is deprecated, use --{replacement} instead")
            }
            Notice::DeprecatedEnv { name, replacement } => {
                write!(
                    f,
                    "environment variable {name} is deprecated, use --{replacement} instead"
                )
            }
            Notice::OperatorNameIgnored => write!(
                f,
                "ignoring {OPERATOR_NAME_ENV} environment variable since --leader-election-id is set"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub config: EffectiveConfig,
    pub notices: Vec<Notice>,
}

const FLAG_PAIRS: [(&str, &str); 2] = [
    ("leader-elect", "enable-leader-election"),
    ("metrics-bind-address", "metrics-addr"),
];

/// Reject flags given together with their legacy alias.
///
/// Pairs are checked in a fixed order and the first conflict is reported.
pub fn check_flag_conflicts(flags: &FlagConfig) -> Result<(), ConfigError> {
    let set = [
        (flags.leader_elect.is_some(), flags.enable_leader_election.is_some()),
        (
            flags.metrics_bind_address.is_some(),
            flags.metrics_addr.is_some(),
        ),
    ];
    for ((first, second), (first_set, second_set)) in FLAG_PAIRS.into_iter().zip(set) {
        if first_set && second_set {
            return Err(ConfigError::ConflictingFlags { first, second });
        }
    }
    Ok(())
}

/// Merge every source into the effective configuration
pub fn resolve(
    file: &FileConfig,
    env: &EnvConfig,
    flags: &FlagConfig,
    defaults: &Defaults,
) -> Result<Resolution, ConfigError> {
    check_flag_conflicts(flags)?;

    let mut notices = Vec::new();
    if flags.enable_leader_election.is_some() {
        notices.push(Notice::DeprecatedFlag {
            flag: "enable-leader-election",
            replacement: "leader-elect",
        });
    }
    if flags.metrics_addr.is_some() {
        notices.push(Notice::DeprecatedFlag {
            flag: "metrics-addr",
            replacement: "metrics-bind-address",
        });
    }

    let metrics_flag = flags
        .metrics_bind_address
        .clone()
        .or_else(|| flags.metrics_addr.clone());
    let leader_flag = flags.leader_elect.or(flags.enable_leader_election);

    let mut leader_election_id = first_set(
        flags.leader_election_id.clone(),
        env.leader_election_id.clone(),
        non_empty(&file.leader_election.resource_name),
    );
    if let Some(operator_name) = &env.operator_name {
        notices.push(Notice::DeprecatedEnv {
            name: OPERATOR_NAME_ENV,
            replacement: "leader-election-id",
        });
        if flags.leader_election_id.is_some() {
            notices.push(Notice::OperatorNameIgnored);
        } else if leader_election_id.is_none() && !operator_name.is_empty() {
            leader_election_id = Some(operator_name.clone());
        }
    }

    let max_concurrent_reconciles = first_set(
        flags.max_concurrent_reconciles,
        env.max_concurrent_reconciles,
        None,
    )
    .unwrap_or(defaults.max_concurrent_reconciles);
    if max_concurrent_reconciles == 0 {
        return Err(ConfigError::InvalidValue {
            field: "max concurrent reconciles",
            reason: "must be at least 1".to_string(),
        });
    }

    let config = EffectiveConfig {
        manager_config_path: flags.manager_config_path.clone(),
        watches_file: first_set(flags.watches_file.clone(), env.watches_file.clone(), None)
            .unwrap_or_else(|| defaults.watches_file.clone()),
        metrics_bind_address: first_set(
            metrics_flag,
            env.metrics_bind_address.clone(),
            non_empty(&file.metrics.bind_address),
        )
        .unwrap_or_else(|| defaults.metrics_bind_address.clone()),
        health_probe_bind_address: first_set(
            flags.health_probe_bind_address.clone(),
            env.health_probe_bind_address.clone(),
            non_empty(&file.health.health_probe_bind_address),
        )
        .unwrap_or_else(|| defaults.health_probe_bind_address.clone()),
        leader_election: LeaderElectionConfig {
            enabled: first_set(leader_flag, env.leader_elect, file.leader_election.leader_elect)
                .unwrap_or(defaults.leader_election),
            id: leader_election_id,
            namespace: first_set(
                flags.leader_election_namespace.clone(),
                env.leader_election_namespace.clone(),
                non_empty(&file.leader_election.resource_namespace),
            ),
        },
        max_concurrent_reconciles,
        reconcile_period: first_set(flags.reconcile_period, env.reconcile_period, None)
            .unwrap_or(defaults.reconcile_period),
        namespace: non_empty(&file.cache_namespace),
        webhook: WebhookOptions {
            cert_dir: file.webhook.cert_dir.clone().unwrap_or_default(),
            host: file.webhook.host.clone().unwrap_or_default(),
            port: file.webhook.port.unwrap_or_default(),
        },
    };

    Ok(Resolution { config, notices })
}

fn first_set<T>(flag: Option<T>, env: Option<T>, file: Option<T>) -> Option<T> {
    flag.or(env).or(file)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
