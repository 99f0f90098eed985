pub mod config;
pub mod error;

pub use config::{ExporterConfig, MetricDefinition, ServiceEndpoints};
pub use error::{CmsError, Result};
