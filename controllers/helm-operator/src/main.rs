//! Helm Operator
//!
//! Watches custom resources and reconciles each one into a release of the
//! chart mapped to its kind in the watches file.

mod annotation;
mod binder;
mod capability;
mod cli;
mod config;
mod constants;
mod error;
mod healthz;
mod lifecycle;
mod logging;
mod manager;
mod metrics;
mod reconciler;
mod scope;
mod server;
mod shutdown;
mod watcher;

#[cfg(test)]
mod test_utils;

use clap::Parser;
use cli::{Cli, Commands};
use std::process::ExitCode;
use tracing::error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const GIT_COMMIT: &str = match option_env!("GIT_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            if let Err(e) = logging::init(&args.logging) {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }

            match lifecycle::run(args).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("{}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
