pub mod collector;
pub mod datapoint;
pub mod meta;
pub mod namespace;
pub mod observation;
pub mod resource;

#[cfg(test)]
mod testing;

pub use collector::{MetricCollector, READ_TIMEOUT};
pub use datapoint::{Datapoint, FieldError, FieldValue, parse_datapoints};
pub use meta::MetaListFetcher;
pub use namespace::NamespaceCatalog;
pub use observation::{Observation, ObservationDescriptor, sanitize_label_name};
pub use resource::{
    DatabaseIndexBuilder, EnrichmentTable, LoadBalancerIndexBuilder, ResourceIndex,
    ResourceIndexBuilder,
};
