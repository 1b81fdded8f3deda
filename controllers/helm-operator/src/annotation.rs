//! Release lifecycle annotations.
//!
//! Setting one of these on a custom resource tunes how its release is
//! installed, upgraded or uninstalled.

pub const INSTALL_DISABLE_HOOKS: &str = "helm.sdk.operatorframework.io/install-disable-hooks";
pub const UPGRADE_FORCE: &str = "helm.sdk.operatorframework.io/upgrade-force";
pub const UPGRADE_DISABLE_HOOKS: &str = "helm.sdk.operatorframework.io/upgrade-disable-hooks";
pub const UNINSTALL_DISABLE_HOOKS: &str = "helm.sdk.operatorframework.io/uninstall-disable-hooks";

pub const DEFAULT_INSTALL_ANNOTATIONS: &[&str] = &[INSTALL_DISABLE_HOOKS];
pub const DEFAULT_UPGRADE_ANNOTATIONS: &[&str] = &[UPGRADE_FORCE, UPGRADE_DISABLE_HOOKS];
pub const DEFAULT_UNINSTALL_ANNOTATIONS: &[&str] = &[UNINSTALL_DISABLE_HOOKS];
