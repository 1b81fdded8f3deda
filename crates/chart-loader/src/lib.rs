//! Chart Loader
//!
//! Loads a chart directory (`Chart.yaml`, `values.yaml`, `templates/`,
//! `charts/`) into an in-memory [`ChartArtifact`].
//!
//! Rendering and release management are not part of this crate; the artifact
//! is handed to a reconciler which owns it from then on.

pub mod chart;
pub mod error;
pub mod ignore;
pub mod loader;

pub use chart::{ChartArtifact, ChartDependency, ChartFile, ChartMetadata};
pub use error::ChartError;
pub use ignore::IgnoreRules;
pub use loader::{load_dir, ChartLoader, DirChartLoader};
