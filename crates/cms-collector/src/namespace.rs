use std::collections::{BTreeMap, HashSet};

/// Sentinel that selects every known namespace.
pub const ALL_NAMESPACES: &str = "all";

const STANDARD_NAMESPACES: &[(&str, &str)] = &[
    ("acs_ecs_dashboard", "Elastic Compute Service (ECS)"),
    ("acs_containerservice_dashboard", "Container Service for Swarm"),
    ("acs_kubernetes", "Container Service for Kubernetes (ACK)"),
    ("acs_oss_dashboard", "Object Storage Service (OSS)"),
    ("acs_slb_dashboard", "Server Load Balancer (SLB)"),
    ("acs_vpc_eip", "Elastic IP addresses (EIPs)"),
    ("acs_nat_gateway", "NAT Gateway"),
    ("acs_anycast_eip", "Anycast Elastic IP address (EIP)"),
    ("acs_rds_dashboard", "ApsaraDB RDS"),
    ("acs_mongodb", "ApsaraDB for MongoDB"),
    ("acs_memcache", "ApsaraDB for Memcache"),
    ("acs_kvstore", "ApsaraDB for Redis"),
    ("acs_hitsdb", "Time Series Database (TSDB)"),
    ("acs_clickhouse", "ClickHouse"),
    ("acs_cds", "ApsaraDB for Cassandra"),
    ("waf", "Web Application Firewall (WAF)"),
    ("acs_elasticsearch", "Elasticsearch"),
    ("acs_mns_new", "queues of Message Service (MNS)"),
    ("acs_kafka", "Message Queue for Apache Kafka"),
    ("acs_amqp", "Alibaba Cloud Message Queue for AMQP instances"),
];

/// Immutable table of monitoring namespaces and their descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceCatalog {
    entries: BTreeMap<String, String>,
}

impl NamespaceCatalog {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(id, description)| (id.into(), description.into()))
                .collect(),
        }
    }

    pub fn standard() -> Self {
        Self::new(STANDARD_NAMESPACES.iter().copied())
    }

    pub fn all(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn describe(&self, namespace: &str) -> Option<&str> {
        self.entries.get(namespace).map(String::as_str)
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.entries.contains_key(namespace)
    }

    /// Narrows `requested` down to known namespaces.
    ///
    /// An empty request, or one containing [`ALL_NAMESPACES`], selects the whole
    /// catalog. Otherwise unknown names are dropped and the remaining ones keep
    /// their input order.
    pub fn filter<S: AsRef<str>>(&self, requested: &[S]) -> Vec<String> {
        if requested.is_empty() {
            return self.ids();
        }

        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        for namespace in requested {
            let namespace = namespace.as_ref();
            if namespace == ALL_NAMESPACES {
                return self.ids();
            }
            if self.contains(namespace) && seen.insert(namespace) {
                selected.push(namespace.to_string());
            }
        }
        selected
    }

    fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

impl Default for NamespaceCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
