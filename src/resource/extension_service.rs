//! `ExtensionService` — a reference to an external gRPC service (e.g. an
//! external-authorization server).

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{PortRef, TimeoutPolicy};
use super::schemas;

#[derive(CustomResource, Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "projectcontour.io",
    version = "v1alpha1",
    kind = "ExtensionService",
    plural = "extensionservices",
    namespaced,
    status = "ExtensionServiceStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionServiceSpec {
    pub services: Vec<ExtensionServiceTarget>,
    pub timeout_policy: Option<TimeoutPolicy>,
    pub protocol: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionServiceTarget {
    pub name: String,
    #[schemars(schema_with = "schemas::port")]
    pub port: PortRef,
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionServiceStatus {
    pub current_status: Option<String>,
    pub description: Option<String>,
}
