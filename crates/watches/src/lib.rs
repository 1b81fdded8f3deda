//! Watch File Loader
//!
//! Parses the declarative watch list consumed by the Helm operator.
//! Each entry binds one Kubernetes kind (group/version/kind) to a chart
//! directory plus its reconcile tuning.
//!
//! # Example
//!
//! ```no_run
//! # fn example() -> Result<(), watches::WatchesError> {
//! let entries = watches::load("./watches.yaml")?;
//! for entry in &entries {
//!     println!("{} -> {}", entry.gvk_label(), entry.chart_dir.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod duration;
pub mod error;
pub mod watch;

pub use duration::{parse_duration, ParseDurationError};
pub use error::WatchesError;
pub use watch::{expand_env, load, parse_watches, WatchEntry};
