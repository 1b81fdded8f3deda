//! Logging setup.

use crate::cli::{LogArgs, LogFormat};
use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber.
///
/// `--log-level` wins over `RUST_LOG`; with neither set, `info` is used.
pub fn init(args: &LogArgs) -> anyhow::Result<()> {
    let filter = match args.log_level.as_deref() {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| anyhow::anyhow!("invalid --log-level '{directives}': {e}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match args.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}
