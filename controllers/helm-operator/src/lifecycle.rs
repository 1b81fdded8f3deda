//! # Startup
//!
//! Runs the startup stages in order and stops at the first failure:
//!
//! 1. Resolve configuration
//! 2. Reject unsupported options
//! 3. Decide the namespace scope
//! 4. Build the manager and attach its probes
//! 5. Bind every watch to a controller
//! 6. Run the manager until a termination signal
//!
//! Stages 1 to 3 touch nothing outside the process, so a bad configuration
//! fails before any cluster client exists.

use crate::binder::{ReconcileTuning, WatchBinder};
use crate::capability;
use crate::cli::{FlagConfig, RunArgs};
use crate::config::{self, Defaults, EffectiveConfig, EnvConfig, FileConfig, Notice, Resolution};
use crate::constants::{HEALTHZ_CHECK_NAME, READYZ_CHECK_NAME, WATCH_NAMESPACE_ENV};
use crate::error::OperatorError;
use crate::healthz::ping;
use crate::manager::{Manager, ManagerOptions};
use crate::scope::ScopeDecision;
use crate::shutdown;
use chart_loader::DirChartLoader;
use kube::Client;
use tracing::{Instrument, info, info_span, warn};

/// Everything decided before the cluster is contacted
#[derive(Debug, Clone, PartialEq)]
pub struct StartupPlan {
    pub config: EffectiveConfig,
    pub scope: ScopeDecision,
    pub notices: Vec<Notice>,
}

impl StartupPlan {
    pub fn tuning(&self) -> ReconcileTuning {
        ReconcileTuning {
            max_concurrent_reconciles: self.config.max_concurrent_reconciles,
            reconcile_period: self.config.reconcile_period,
        }
    }
}

/// Resolve configuration, validate it and decide the scope.
///
/// `lookup` reads environment variables.
pub fn plan<F>(flags: &FlagConfig, lookup: F) -> Result<StartupPlan, OperatorError>
where
    F: Fn(&str) -> Option<String>,
{
    config::check_flag_conflicts(flags)?;

    let file = match &flags.manager_config_path {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let env = EnvConfig::from_lookup(&lookup)?;
    let Resolution { config, notices } = config::resolve(&file, &env, flags, &Defaults::default())?;

    capability::check(&config)?;

    let scope = ScopeDecision::decide(
        lookup(WATCH_NAMESPACE_ENV).as_deref(),
        config.namespace.as_deref(),
    );

    Ok(StartupPlan {
        config,
        scope,
        notices,
    })
}

pub async fn run(args: RunArgs) -> Result<(), OperatorError> {
    let span = info_span!("helm-operator");
    async move {
        print_version();

        let plan = plan(&args.flags, |name| std::env::var(name).ok())?;
        for notice in &plan.notices {
            warn!("{}", notice);
        }
        log_scope(&plan.scope);

        let _ = rustls::crypto::ring::default_provider().install_default();
        let kube_config = kube::Config::infer().await?;
        let client = Client::try_from(kube_config).map_err(OperatorError::Client)?;

        let options = ManagerOptions::from_config(&plan.config, plan.scope.cache_strategy())?;
        let mut manager = Manager::new(client, options)?;
        manager
            .add_healthz_check(HEALTHZ_CHECK_NAME, ping)
            .map_err(OperatorError::HealthCheck)?;
        manager
            .add_readyz_check(READYZ_CHECK_NAME, ping)
            .map_err(OperatorError::HealthCheck)?;

        let watches = watches::load(&plan.config.watches_file)?;
        info!(
            "Loaded {} watches from {}",
            watches.len(),
            plan.config.watches_file.display()
        );
        let bound = WatchBinder::new(DirChartLoader)
            .bind(&watches, &mut manager, &plan.tuning())
            .await?;

        info!(controllers = bound, "Starting the operator");
        manager
            .start(shutdown::termination_signal())
            .await
            .map_err(OperatorError::RunLoop)?;
        info!("Manager stopped");
        Ok(())
    }
    .instrument(span)
    .await
}

fn log_scope(scope: &ScopeDecision) {
    match scope {
        ScopeDecision::AllNamespaces => info!("Watching all namespaces"),
        ScopeDecision::SingleNamespace(namespace) => {
            info!(namespace = %namespace, "Watching single namespace")
        }
        ScopeDecision::NamespaceSet(_) => info!(namespaces = %scope, "Watching namespaces"),
    }
}

fn print_version() {
    info!(
        version = crate::VERSION,
        commit = crate::GIT_COMMIT,
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        "Version"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::BindError;
    use crate::config::ConfigError;
    use crate::scope::CacheStrategy;
    use crate::test_utils::{MockRegistry, chart_root, watch_entry};
    use std::collections::{BTreeSet, HashMap};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[tokio::test]
    async fn test_unset_scope_binds_one_controller_for_all_namespaces() {
        let plan = plan(&FlagConfig::default(), lookup(&[])).unwrap();
        assert_eq!(plan.scope, ScopeDecision::AllNamespaces);

        let charts = chart_root(&["myapp"]);
        let watches = vec![watch_entry("MyApp", charts.path().join("myapp"))];
        let mut registry = MockRegistry::default();
        let bound = WatchBinder::new(DirChartLoader)
            .bind(&watches, &mut registry, &plan.tuning())
            .await
            .unwrap();

        assert_eq!(bound, 1);
        assert_eq!(registry.registered[0].gvk().kind, "MyApp");
        assert_eq!(registry.registered[0].gvk().version, "v1");
    }

    #[test]
    fn test_namespace_list_selects_multi_namespace_cache() {
        let plan = plan(
            &FlagConfig::default(),
            lookup(&[(WATCH_NAMESPACE_ENV, "team-a,team-b")]),
        )
        .unwrap();
        let expected: BTreeSet<String> =
            ["team-a", "team-b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(plan.scope, ScopeDecision::NamespaceSet(expected.clone()));
        assert_eq!(
            plan.scope.cache_strategy(),
            CacheStrategy::MultiNamespace(expected)
        );
    }

    #[test]
    fn test_conflicting_leader_flags_fail_before_anything_else() {
        let flags = FlagConfig {
            leader_elect: Some(true),
            enable_leader_election: Some(false),
            manager_config_path: Some("/nonexistent/config.yaml".into()),
            ..FlagConfig::default()
        };
        let err = plan(&flags, lookup(&[])).unwrap_err();
        assert!(matches!(
            err,
            OperatorError::Config(ConfigError::ConflictingFlags { .. })
        ));
    }

    #[test]
    fn test_webhook_options_in_config_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "webhook:\n  port: 9443\n  host: 0.0.0.0\n").unwrap();
        let flags = FlagConfig {
            manager_config_path: Some(path),
            ..FlagConfig::default()
        };

        match plan(&flags, lookup(&[])) {
            Err(OperatorError::Unsupported(unsupported)) => {
                assert_eq!(unsupported.fields, vec!["host", "port"]);
            }
            other => panic!("expected unsupported fields, got {other:?}"),
        }
    }

    #[test]
    fn test_config_file_namespace_used_without_scope_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "cacheNamespace: ops\n").unwrap();
        let flags = FlagConfig {
            manager_config_path: Some(path),
            ..FlagConfig::default()
        };

        let plan_without_env = plan(&flags, lookup(&[])).unwrap();
        assert_eq!(
            plan_without_env.scope,
            ScopeDecision::SingleNamespace("ops".to_string())
        );

        let plan_with_wildcard = plan(&flags, lookup(&[(WATCH_NAMESPACE_ENV, "*")])).unwrap();
        assert_eq!(plan_with_wildcard.scope, ScopeDecision::AllNamespaces);
    }

    #[test]
    fn test_invalid_environment_value_fails_planning() {
        let err = plan(
            &FlagConfig::default(),
            lookup(&[(crate::constants::RECONCILE_PERIOD_ENV, "often")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            OperatorError::Config(ConfigError::InvalidEnv { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_chart_aborts_binding() {
        let plan = plan(&FlagConfig::default(), lookup(&[])).unwrap();
        let charts = chart_root(&[]);
        let watches = vec![watch_entry("MyApp", charts.path().join("myapp"))];
        let mut registry = MockRegistry::default();

        let err: OperatorError = WatchBinder::new(DirChartLoader)
            .bind(&watches, &mut registry, &plan.tuning())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, OperatorError::Bind(BindError::Chart { .. })));
        assert!(registry.registered.is_empty());
    }
}
