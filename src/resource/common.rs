//! Spec fragments shared by more than one CRD (`IngressRoute` and
//! `HTTPProxy` both carry timeout/retry/upstream-validation blocks with
//! an identical shape).

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A Go-style duration string (`"1m30s"`, `"infinite"`, ...), parsed by
/// [`crate::duration::parse`].
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutPolicy {
    pub response: Option<String>,
    pub idle: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub num_retries: Option<i64>,
    pub per_try_timeout: Option<String>,
}

/// Pins the backend certificate this cluster is allowed to present.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamValidation {
    pub ca_secret: String,
    pub subject_name: String,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownstreamValidation {
    pub ca_secret: String,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CorsPolicy {
    pub allow_origin: Vec<String>,
    pub allow_methods: Vec<String>,
    #[serde(default)]
    pub allow_headers: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
    pub max_age: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalRateLimitPolicy {
    pub requests: u32,
    pub unit: String,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitPolicy {
    pub local: Option<LocalRateLimitPolicy>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlowStartPolicy {
    pub window: String,
    pub aggression: Option<String>,
    pub min_weight_percent: Option<i32>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckPolicy {
    pub path: String,
    pub interval_seconds: Option<i64>,
    pub unhealthy_threshold_count: Option<i64>,
    pub healthy_threshold_count: Option<i64>,
}

/// Rewrites applied to requests forwarded to a cluster; only the piece
/// the SNI-determination rule needs (§9 GLOSSARY "SNI") is modeled.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequestHeadersPolicy {
    pub host_rewrite: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionServiceRef {
    pub api_version: Option<String>,
    pub namespace: Option<String>,
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationConfig {
    pub extension_ref: ExtensionServiceRef,
    pub response_timeout: Option<String>,
    #[serde(default)]
    pub fail_open: bool,
}

/// A port, addressable by number or by name — mirrors the cache's
/// `lookupService` resolution rule (§4.1).
pub type PortRef = IntOrString;
