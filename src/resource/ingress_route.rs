//! `IngressRoute` — the legacy root+delegate CRD (`contour.heptio.com/v1beta1`).
//!
//! Modeled after the `kopium`-shaped CRD structs in the retrieved example
//! pack (e.g. Traefik's `IngressRoute`): a plain spec struct with
//! `kube::CustomResource`, doc comments on every field, `camelCase` wire
//! names.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{PortRef, RetryPolicy, TimeoutPolicy, UpstreamValidation};
use super::schemas;

#[derive(CustomResource, Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "contour.heptio.com",
    version = "v1beta1",
    kind = "IngressRoute",
    plural = "ingressroutes",
    namespaced,
    status = "IngressRouteStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct IngressRouteSpec {
    /// Present only on a root: declares the FQDN this object is the sole
    /// entry point for.
    pub virtualhost: Option<IngressRouteVirtualHost>,
    /// Routes contributed directly by this object.
    #[serde(default)]
    pub routes: Vec<IngressRouteRoute>,
    /// TCP passthrough/termination, mutually exclusive with `routes`
    /// carrying non-ACME HTTP on a passthrough vhost.
    pub tcpproxy: Option<IngressRouteTcpProxy>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressRouteVirtualHost {
    pub fqdn: String,
    pub tls: Option<IngressRouteTls>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressRouteTls {
    pub secret_name: Option<String>,
    pub minimum_protocol_version: Option<String>,
    #[serde(default)]
    pub passthrough: bool,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressRouteRoute {
    /// Path prefix this route matches; must start with `/`.
    #[serde(rename = "match")]
    pub match_: String,
    #[serde(default)]
    pub services: Vec<IngressRouteService>,
    pub delegate: Option<RouteDelegate>,
    pub timeout_policy: Option<TimeoutPolicy>,
    pub retry_policy: Option<RetryPolicy>,
    #[serde(default)]
    pub enable_websocket: bool,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteDelegate {
    pub name: String,
    pub namespace: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressRouteService {
    pub name: String,
    #[schemars(schema_with = "schemas::port")]
    pub port: PortRef,
    #[serde(default)]
    pub weight: i64,
    #[serde(default)]
    pub mirror: bool,
    pub upstream_validation: Option<UpstreamValidation>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressRouteTcpProxy {
    pub delegate: Option<RouteDelegate>,
    #[serde(default)]
    pub services: Vec<IngressRouteService>,
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressRouteStatus {
    pub current_status: Option<String>,
    pub description: Option<String>,
}
