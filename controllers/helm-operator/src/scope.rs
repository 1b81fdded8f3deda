//! # Namespace scope
//!
//! Decides which namespaces the operator watches and how the manager's
//! watches are laid out to cover them.
//!
//! The `WATCH_NAMESPACE` variable is authoritative when present. Without it
//! the config file's `cacheNamespace` applies, and with neither the operator
//! watches every namespace.

use std::collections::BTreeSet;
use std::fmt;

const NAMESPACE_DELIMITER: char = ',';
const ALL_NAMESPACES_WILDCARD: &str = "*";

/// The namespaces the operator watches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeDecision {
    AllNamespaces,
    /// Built from a delimited scope signal, even when one name survives parsing
    NamespaceSet(BTreeSet<String>),
    SingleNamespace(String),
}

/// How the manager lays out its watches for a scope decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStrategy {
    /// One watch per kind, cluster-wide (`None`) or limited to one namespace
    Scoped(Option<String>),
    /// One watch per kind and namespace
    MultiNamespace(BTreeSet<String>),
}

impl ScopeDecision {
    /// Decide the scope from the scope signal and the configured namespace.
    ///
    /// `env` is `None` when the variable is absent; an empty value or `*`
    /// selects every namespace. A value containing `,` is split into a set of
    /// trimmed, non-empty names; if nothing survives, every namespace is
    /// watched.
    pub fn decide(env: Option<&str>, explicit: Option<&str>) -> Self {
        match env {
            Some(value) => Self::from_signal(value),
            None => match explicit.filter(|ns| !ns.is_empty()) {
                Some(namespace) => ScopeDecision::SingleNamespace(namespace.to_string()),
                None => ScopeDecision::AllNamespaces,
            },
        }
    }

    fn from_signal(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == ALL_NAMESPACES_WILDCARD {
            return ScopeDecision::AllNamespaces;
        }
        if !value.contains(NAMESPACE_DELIMITER) {
            return ScopeDecision::SingleNamespace(value.to_string());
        }

        let namespaces: BTreeSet<String> = value
            .split(NAMESPACE_DELIMITER)
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string)
            .collect();
        if namespaces.is_empty() {
            ScopeDecision::AllNamespaces
        } else {
            ScopeDecision::NamespaceSet(namespaces)
        }
    }

    pub fn cache_strategy(&self) -> CacheStrategy {
        match self {
            ScopeDecision::AllNamespaces => CacheStrategy::Scoped(None),
            ScopeDecision::SingleNamespace(ns) => CacheStrategy::Scoped(Some(ns.clone())),
            ScopeDecision::NamespaceSet(set) => CacheStrategy::MultiNamespace(set.clone()),
        }
    }
}

impl fmt::Display for ScopeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeDecision::AllNamespaces => write!(f, "all namespaces"),
            ScopeDecision::SingleNamespace(ns) => write!(f, "namespace {ns}"),
            ScopeDecision::NamespaceSet(set) => {
                let names: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "namespaces {}", names.join(","))
            }
        }
    }
}

impl CacheStrategy {
    /// Namespaces a watch for one kind covers. `None` means cluster-wide.
    ///
    /// Cluster-scoped kinds are always watched cluster-wide.
    pub fn watch_namespaces(&self, namespaced: bool) -> Vec<Option<String>> {
        if !namespaced {
            return vec![None];
        }
        match self {
            CacheStrategy::Scoped(namespace) => vec![namespace.clone()],
            CacheStrategy::MultiNamespace(set) => set.iter().cloned().map(Some).collect(),
        }
    }
}

#[cfg(test)]
#[path = "scope_test.rs"]
mod scope_test;
