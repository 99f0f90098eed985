use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("invalid metric definition: {0}")]
    InvalidMetric(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("request {action} failed: {reason}")]
    Request { action: String, reason: String },
    #[error("{action} returned error code {code}: {message}")]
    Api {
        action: String,
        code: String,
        message: String,
    },
    #[error("failed to retrieve datapoints: namespace={namespace}, metric={metric}: {source}")]
    Retrieval {
        namespace: String,
        metric: String,
        #[source]
        source: Box<CmsError>,
    },
    #[error("malformed datapoints: namespace={namespace}, metric={metric}: {source}")]
    Parse {
        namespace: String,
        metric: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to list resources for namespace {namespace}: {source}")]
    Enrichment {
        namespace: String,
        #[source]
        source: Box<CmsError>,
    },
    #[error("failed to describe metric meta list for namespace {namespace}: {source}")]
    Discovery {
        namespace: String,
        #[source]
        source: Box<CmsError>,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CmsError {
    /// Short, stable name of the error class. Used as a metric label value.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidMetric(_) => "configuration",
            Self::Config(_) => "configuration",
            Self::Request { .. } => "request",
            Self::Api { .. } => "api",
            Self::Retrieval { .. } => "retrieval",
            Self::Parse { .. } => "parse",
            Self::Enrichment { .. } => "enrichment",
            Self::Discovery { .. } => "discovery",
            Self::Io(_) => "io",
        }
    }

    /// Parse failures are reported through the same channel as retrieval failures.
    pub fn is_retrieval(&self) -> bool {
        matches!(self, Self::Retrieval { .. } | Self::Parse { .. })
    }
}

pub type Result<T> = std::result::Result<T, CmsError>;
