//! `TLSCertificateDelegation` — authorizes a secret's namespace to let
//! other namespaces reference it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "projectcontour.io",
    version = "v1",
    kind = "TLSCertificateDelegation",
    plural = "tlscertificatedelegations",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct TlsCertificateDelegationSpec {
    pub delegations: Vec<CertificateDelegation>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDelegation {
    pub secret_name: String,
    /// Namespaces permitted to reference the secret; `"*"` permits any.
    pub target_namespaces: Vec<String>,
}
