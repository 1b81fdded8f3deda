//! Rejects manager options this operator cannot serve.
//!
//! The operator hosts no webhook server, so any webhook setting is a
//! misconfiguration rather than something to silently drop.

use crate::config::EffectiveConfig;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("manager option(s) {} set but unsupported: this operator does not serve webhooks", .fields.join(", "))]
pub struct UnsupportedFields {
    /// Offending fields in the order they were checked
    pub fields: Vec<&'static str>,
}

/// Fail if any unsupported field holds a non-default value.
///
/// All offending fields are reported at once.
pub fn check(config: &EffectiveConfig) -> Result<(), UnsupportedFields> {
    let webhook = &config.webhook;
    let fields: Vec<&'static str> = [
        ("certDir", !webhook.cert_dir.is_empty()),
        ("host", !webhook.host.is_empty()),
        ("port", webhook.port != 0),
    ]
    .into_iter()
    .filter_map(|(name, set)| set.then_some(name))
    .collect();

    if fields.is_empty() {
        Ok(())
    } else {
        Err(UnsupportedFields { fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Defaults, EnvConfig, FileConfig, WebhookOptions, resolve};
    use crate::cli::FlagConfig;

    fn config_with(webhook: WebhookOptions) -> EffectiveConfig {
        let mut config = resolve(
            &FileConfig::default(),
            &EnvConfig::default(),
            &FlagConfig::default(),
            &Defaults::default(),
        )
        .unwrap()
        .config;
        config.webhook = webhook;
        config
    }

    #[test]
    fn test_defaults_pass() {
        assert!(check(&config_with(WebhookOptions::default())).is_ok());
    }

    #[test]
    fn test_single_field_reported() {
        let err = check(&config_with(WebhookOptions {
            port: 9443,
            ..WebhookOptions::default()
        }))
        .unwrap_err();
        assert_eq!(err.fields, vec!["port"]);
    }

    #[test]
    fn test_all_fields_reported_in_order() {
        let err = check(&config_with(WebhookOptions {
            cert_dir: "/tmp/certs".to_string(),
            host: "0.0.0.0".to_string(),
            port: 9443,
        }))
        .unwrap_err();
        assert_eq!(err.fields, vec!["certDir", "host", "port"]);
        assert!(err.to_string().contains("certDir, host, port"));
    }
}
