//! The DAG's entity types (§3 DATA MODEL).

use std::collections::BTreeMap;

use crate::conditions::MatchConditions;
use crate::duration::Timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    V1_1,
    V1_2,
    V1_3,
}

impl TlsVersion {
    /// Invalid values silently fall back to 1.1 (§4.2).
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "1.2" => TlsVersion::V1_2,
            "1.3" => TlsVersion::V1_3,
            _ => TlsVersion::V1_1,
        }
    }
}

impl Default for TlsVersion {
    fn default() -> Self {
        TlsVersion::V1_1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Protocol {
    Plain,
    H2,
    H2c,
    Tls,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecretRef {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceRef {
    pub namespace: String,
    pub name: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamValidation {
    pub ca_secret: SecretRef,
    pub subject_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheck {
    pub path: String,
    pub interval: std::time::Duration,
    pub unhealthy_threshold: u32,
    pub healthy_threshold: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlowStart {
    pub window: std::time::Duration,
    pub aggression: f64,
    pub min_weight_percent: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionLimits {
    pub max_connections: u32,
    pub max_pending_requests: u32,
    pub max_requests: u32,
    pub max_retries: u32,
}

/// One weighted backend behind a route (§3 "Cluster (weighted service
/// set)"). Named `Cluster` to match the proxy-facing vocabulary the
/// spec and the upstream system both use for this concept.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub service: ServiceRef,
    pub weight: u32,
    pub protocol: Protocol,
    pub upstream_validation: Option<UpstreamValidation>,
    pub health_check: Option<HealthCheck>,
    pub slow_start: Option<SlowStart>,
    pub limits: ConnectionLimits,
    pub mirror: bool,
    /// Derived SNI for a TLS cluster (§9 GLOSSARY "SNI"); `None` for
    /// non-TLS protocols.
    pub sni: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub num_retries: u32,
    pub per_try_timeout: Option<std::time::Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorsPolicy {
    pub allow_origin: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age: Option<std::time::Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitPolicy {
    pub requests_per_unit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionCluster {
    pub namespace: String,
    pub name: String,
    pub response_timeout: Timeout,
}

/// One HTTP match and what happens for it: either a weighted cluster set
/// or nothing (an include/delegate that contributed no reachable
/// service is simply absent from the finished route set — see §4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub conditions: MatchConditions,
    pub clusters: Vec<Cluster>,
    pub timeout: Timeout,
    pub idle_timeout: Timeout,
    pub retry: Option<RetryPolicy>,
    pub https_upgrade: bool,
    pub websocket: bool,
    pub cors: Option<CorsPolicy>,
    pub rate_limit: Option<RateLimitPolicy>,
}

impl Route {
    /// A stable key derived from the merged match conditions, used both
    /// to dedupe/override routes on one vhost and to order them in the
    /// finished DAG deterministically, independent of arrival order
    /// (§4.4 "Tie-breaking and ordering").
    pub fn signature(&self) -> String {
        let mut sig = self.conditions.prefix.clone().unwrap_or_default();
        for h in &self.conditions.headers {
            sig.push_str(&format!("|h:{}={:?}", h.name, h.op));
        }
        for q in &self.conditions.query_params {
            sig.push_str(&format!("|q:{}={:?}", q.name, q.op));
        }
        sig
    }

    /// A route is only worth keeping once at least one cluster resolves
    /// to a reachable service (§4.6).
    pub fn is_reachable(&self) -> bool {
        !self.clusters.is_empty()
    }

    pub fn mirror_count(&self) -> usize {
        self.clusters.iter().filter(|c| c.mirror).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualHost {
    pub fqdn: String,
    pub routes: BTreeMap<String, Route>,
    /// External-authorization reference resolved from the root's
    /// `authorization` policy, if any (§4.5 "External-auth extension
    /// reference").
    pub authorization: Option<ExtensionCluster>,
}

impl VirtualHost {
    pub fn new(fqdn: impl Into<String>) -> Self {
        Self {
            fqdn: fqdn.into(),
            routes: BTreeMap::new(),
            authorization: None,
        }
    }

    pub fn add_route(&mut self, route: Route) {
        self.routes.insert(route.signature(), route);
    }

    /// Valid iff at least one route has at least one reachable service
    /// (§4.6).
    pub fn is_valid(&self) -> bool {
        self.routes.values().any(Route::is_reachable)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TcpProxy {
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecureVirtualHost {
    pub fqdn: String,
    pub min_tls_version: TlsVersion,
    pub secret: Option<SecretRef>,
    pub client_validation: Option<UpstreamValidation>,
    pub fallback_certificate: bool,
    pub passthrough: bool,
    pub routes: BTreeMap<String, Route>,
    pub tcp_proxy: Option<TcpProxy>,
    /// External-authorization reference resolved from the root's
    /// `authorization` policy, if any (§4.5 "External-auth extension
    /// reference").
    pub authorization: Option<ExtensionCluster>,
}

impl SecureVirtualHost {
    pub fn new(fqdn: impl Into<String>) -> Self {
        Self {
            fqdn: fqdn.into(),
            min_tls_version: TlsVersion::default(),
            ..Default::default()
        }
    }

    pub fn add_route(&mut self, route: Route) {
        self.routes.insert(route.signature(), route);
    }

    pub fn is_valid(&self) -> bool {
        self.passthrough
            || self.tcp_proxy.as_ref().is_some_and(|t| !t.clusters.is_empty())
            || self.routes.values().any(Route::is_reachable)
    }
}
