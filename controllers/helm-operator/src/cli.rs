//! # Command line
//!
//! Every manager flag is an `Option` so the resolver can tell an explicitly
//! set flag apart from one left at its default.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "helm-operator", version, about = "Run a chart-driven Kubernetes operator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the operator against the current cluster
    Run(RunArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub flags: FlagConfig,

    #[command(flatten)]
    pub logging: LogArgs,
}

/// Manager flags as given on the command line
#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct FlagConfig {
    /// Manager config file; explicitly set flags take precedence over its values
    #[arg(long = "config", value_name = "PATH")]
    pub manager_config_path: Option<PathBuf>,

    /// Path to the file that maps watched kinds to charts
    #[arg(long, value_name = "PATH")]
    pub watches_file: Option<PathBuf>,

    /// Address the metrics endpoint binds to ("0" disables it)
    #[arg(long, value_name = "ADDR")]
    pub metrics_bind_address: Option<String>,

    /// Deprecated alias of --metrics-bind-address
    #[arg(long = "metrics-addr", value_name = "ADDR", hide = true)]
    pub metrics_addr: Option<String>,

    /// Address the health and readiness probes bind to ("0" disables them)
    #[arg(long, value_name = "ADDR")]
    pub health_probe_bind_address: Option<String>,

    /// Enable leader election for the manager
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub leader_elect: Option<bool>,

    /// Deprecated alias of --leader-elect
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        hide = true
    )]
    pub enable_leader_election: Option<bool>,

    /// Name of the leader election lock
    #[arg(long, value_name = "NAME")]
    pub leader_election_id: Option<String>,

    /// Namespace of the leader election lock
    #[arg(long, value_name = "NAMESPACE")]
    pub leader_election_namespace: Option<String>,

    /// Default number of concurrent reconciles per controller
    #[arg(long, value_name = "N")]
    pub max_concurrent_reconciles: Option<usize>,

    /// Default interval between periodic reconciles, e.g. "1m" or "90s"
    #[arg(long, value_name = "DURATION", value_parser = watches::parse_duration)]
    pub reconcile_period: Option<Duration>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Log filter, e.g. "debug" or "helm_operator=debug,kube=info" (falls back to RUST_LOG, then "info")
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
