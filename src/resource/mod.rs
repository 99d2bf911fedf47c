//! Typed representations of the objects the builder consumes.
//!
//! Ingress, Service and Secret are the real `k8s-openapi` types. The
//! remaining kinds are CRDs owned by this crate and modeled the same way
//! upstream operators model theirs: a `kube::CustomResource` spec struct
//! plus a hand-written status type where one is needed.

pub mod common;
mod extension_service;
mod http_proxy;
mod http_route;
mod ingress_route;
mod schemas;
mod tls_delegation;

pub use common::{
    AuthorizationConfig, CorsPolicy, DownstreamValidation, ExtensionServiceRef,
    HealthCheckPolicy, LocalRateLimitPolicy, PortRef, RateLimitPolicy, RequestHeadersPolicy,
    RetryPolicy, SlowStartPolicy, TimeoutPolicy, UpstreamValidation,
};
pub use extension_service::{
    ExtensionService, ExtensionServiceSpec, ExtensionServiceStatus, ExtensionServiceTarget,
};
pub use http_proxy::{
    HeaderMatchCondition, HttpProxy, HttpProxyInclude, HttpProxyRoute, HttpProxyService,
    HttpProxySpec, HttpProxyStatus, HttpProxyTcpProxy, HttpProxyTls, HttpProxyVirtualHost,
    MatchCondition, QueryParameterMatchCondition, TcpProxyInclude,
};
pub use http_route::{
    HttpRoute, HttpRouteBackendRef, HttpRouteMatch, HttpRoutePathMatch, HttpRouteRule,
    HttpRouteSpec,
};
pub use ingress_route::{
    IngressRoute, IngressRouteRoute, IngressRouteService, IngressRouteSpec, IngressRouteStatus,
    IngressRouteTcpProxy, IngressRouteTls, IngressRouteVirtualHost, RouteDelegate,
};
pub use tls_delegation::{
    CertificateDelegation, TlsCertificateDelegation, TlsCertificateDelegationSpec,
};

/// The one known api-version tag an [`ExtensionService`] reference must
/// carry (§4.5 — "api-version equals the known literal").
pub const EXTENSION_SERVICE_API_VERSION: &str = "projectcontour.io/v1alpha1";

/// `(namespace, name)` — the identity used throughout the cache, the
/// status map and every cross-object reference.
pub type NamespacedName = (String, String);

pub fn namespaced_name(namespace: &str, name: &str) -> NamespacedName {
    (namespace.to_owned(), name.to_owned())
}
