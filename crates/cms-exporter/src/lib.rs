pub mod handlers;
pub mod metrics;
pub mod router;
pub mod scrape;

pub use router::{ExporterState, exporter_router};
pub use scrape::{ScrapeTarget, Scraper};
