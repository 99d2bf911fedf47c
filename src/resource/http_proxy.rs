//! `HTTPProxy` — the current root+delegate CRD (`projectcontour.io/v1`).
//!
//! Superset of `IngressRoute`: inclusion carries match conditions
//! (`conditions`, not a single `match` string), the vhost can set CORS,
//! fallback-certificate and external-authorization policy, and the
//! `tcpproxy` leaf can itself `include` a child rather than only
//! delegating.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{
    AuthorizationConfig, CorsPolicy, DownstreamValidation, HealthCheckPolicy, PortRef,
    RateLimitPolicy, RequestHeadersPolicy, RetryPolicy, SlowStartPolicy, TimeoutPolicy,
    UpstreamValidation,
};
use super::schemas;

#[derive(CustomResource, Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "projectcontour.io",
    version = "v1",
    kind = "HTTPProxy",
    plural = "httpproxies",
    namespaced,
    status = "HttpProxyStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct HttpProxySpec {
    pub virtualhost: Option<HttpProxyVirtualHost>,
    #[serde(default)]
    pub routes: Vec<HttpProxyRoute>,
    #[serde(default)]
    pub includes: Vec<HttpProxyInclude>,
    pub tcpproxy: Option<HttpProxyTcpProxy>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpProxyVirtualHost {
    pub fqdn: String,
    pub tls: Option<HttpProxyTls>,
    pub cors_policy: Option<CorsPolicy>,
    pub authorization: Option<AuthorizationConfig>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpProxyTls {
    pub secret_name: Option<String>,
    pub minimum_protocol_version: Option<String>,
    #[serde(default)]
    pub passthrough: bool,
    #[serde(default)]
    pub enable_fallback_certificate: bool,
    pub client_validation: Option<DownstreamValidation>,
}

/// One entry in a path/header/query-parameter match aggregate. Contour
/// models each as a one-of object; callers build an AND-of-these list.
#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct MatchCondition {
    pub prefix: Option<String>,
    pub header: Option<HeaderMatchCondition>,
    pub query_parameter: Option<QueryParameterMatchCondition>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMatchCondition {
    pub name: String,
    #[serde(default)]
    pub present: bool,
    pub exact: Option<String>,
    pub not_exact: Option<String>,
    pub contains: Option<String>,
    pub not_contains: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameterMatchCondition {
    pub name: String,
    #[serde(default)]
    pub present: bool,
    pub exact: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpProxyRoute {
    #[serde(default)]
    pub conditions: Vec<MatchCondition>,
    #[serde(default)]
    pub services: Vec<HttpProxyService>,
    pub timeout_policy: Option<TimeoutPolicy>,
    pub retry_policy: Option<RetryPolicy>,
    pub rate_limit_policy: Option<RateLimitPolicy>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpProxyService {
    pub name: String,
    #[schemars(schema_with = "schemas::port")]
    pub port: PortRef,
    #[serde(default)]
    pub weight: i64,
    #[serde(default)]
    pub mirror: bool,
    pub protocol: Option<String>,
    pub upstream_validation: Option<UpstreamValidation>,
    pub health_check_policy: Option<HealthCheckPolicy>,
    pub slow_start_policy: Option<SlowStartPolicy>,
    pub request_headers_policy: Option<RequestHeadersPolicy>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpProxyInclude {
    pub name: String,
    pub namespace: Option<String>,
    #[serde(default)]
    pub conditions: Vec<MatchCondition>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TcpProxyInclude {
    pub name: String,
    pub namespace: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct HttpProxyTcpProxy {
    pub include: Option<TcpProxyInclude>,
    /// Deprecated plural form; accepted equivalently to `include`. If
    /// both are set, `include` (singular) wins — preserves upstream's
    /// historical precedence (§9 DESIGN NOTES open question).
    pub includes_deprecated: Option<TcpProxyInclude>,
    #[serde(default)]
    pub services: Vec<HttpProxyService>,
}

impl HttpProxyTcpProxy {
    pub fn effective_include(&self) -> Option<&TcpProxyInclude> {
        self.include.as_ref().or(self.includes_deprecated.as_ref())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpProxyStatus {
    pub current_status: Option<String>,
    pub description: Option<String>,
}
