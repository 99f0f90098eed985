use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use cms_client::{CmsClient, RdsClient, SlbClient, Transport, rate_limiter};
use cms_collector::{EnrichmentTable, MetaListFetcher, MetricCollector, NamespaceCatalog};
use cms_common::config::ExporterConfig;
use cms_exporter::{ExporterState, Scraper, exporter_router};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "cms-exporter.yaml";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9527";

#[derive(Parser)]
#[command(name = "cms-exporter", about = "Prometheus exporter for cloud monitor metrics")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    listen: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve metrics over HTTP (default).
    Serve,
    /// Print the metrics available per namespace as JSON.
    Describe {
        #[arg(long = "namespace")]
        namespaces: Vec<String>,
    },
    /// Print the known namespaces.
    Namespaces,
}

struct Clients {
    cms: Arc<CmsClient>,
    slb: Arc<SlbClient>,
    rds: Arc<RdsClient>,
}

impl Clients {
    fn from_config(config: &ExporterConfig) -> Self {
        let endpoints = config.service_endpoints();
        let limiter = rate_limiter(config.rate_limit);
        let transport = Transport::new(config.region.trim(), limiter);

        Self {
            cms: Arc::new(CmsClient::new(endpoints.cms, transport.clone())),
            slb: Arc::new(SlbClient::new(endpoints.slb, transport.clone())),
            rds: Arc::new(RdsClient::new(endpoints.rds, transport)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::from_default_env().add_directive("cms=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let catalog = Arc::new(NamespaceCatalog::standard());

    if let Some(Command::Namespaces) = cli.command {
        for (namespace, description) in catalog.all() {
            println!("{namespace}\t{description}");
        }
        return Ok(());
    }

    let config_path = cli
        .config
        .or_else(|| std::env::var("CMS_EXPORTER_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = ExporterConfig::load(&config_path)?;
    info!(path = %config_path.display(), cloud_id = %config.cloud_id, "configuration loaded");

    let clients = Clients::from_config(&config);

    if let Some(Command::Describe { namespaces }) = cli.command {
        let fetcher = MetaListFetcher::new(clients.cms, catalog);
        let described = fetcher.describe_metrics(namespaces.as_slice()).await?;
        println!("{}", serde_json::to_string_pretty(&described)?);
        return Ok(());
    }

    let collector = MetricCollector::new(
        config.cloud_id.clone(),
        clients.cms,
        EnrichmentTable::standard(clients.slb, clients.rds),
    );
    let scraper = Arc::new(Scraper::from_config(&config, &catalog, collector));
    let app = exporter_router(Arc::new(ExporterState::new(scraper)));

    let addr = cli
        .listen
        .or_else(|| std::env::var("CMS_EXPORTER_LISTEN").ok())
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("cms exporter listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
