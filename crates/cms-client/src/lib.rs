pub mod api;
pub mod cms;
pub mod ratelimit;
pub mod rds;
pub mod slb;
pub mod transport;

pub use api::{
    DatabaseApi, DbInstance, LoadBalancer, LoadBalancerApi, MetricLastRequest,
    MetricLastResponse, MetricMeta, MetricMetaListRequest, MetricMetaListResponse, MonitoringApi,
    PageRequest,
};
pub use cms::CmsClient;
pub use ratelimit::{RateLimiter, rate_limiter};
pub use rds::RdsClient;
pub use slb::SlbClient;
pub use transport::Transport;
