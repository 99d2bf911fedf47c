//! Processors (§4.4): one per source kind, each walking the cache and
//! contributing fragments into a shared [`crate::context::BuildContext`].
//!
//! A processor doesn't implement a trait in the Go sense — `run` is a
//! plain function taking `(&ObjectCache, &mut BuildContext)` — but the
//! shape is the same one described as "a shared processor interface
//! exposing only `run(context)`" (§9 DESIGN NOTES): the context is the
//! only channel back into the build, so no processor ever reaches past
//! it into another processor's state.

mod http_proxy;
mod http_route;
mod ingress;
mod ingress_route;

pub use http_proxy::run as run_http_proxy;
pub use http_route::run as run_http_route;
pub use ingress::run as run_ingress;
pub use ingress_route::run as run_ingress_route;

use crate::cache::{ObjectCache, PortQuery};
use crate::dag::{Cluster, ConnectionLimits, HealthCheck, Protocol, SlowStart, ServiceRef, UpstreamValidation};

/// Resolves one weighted backend reference into a [`Cluster`], looking
/// the service up in the cache and matching its port by the cache's
/// three-way rule (§4.1). `None` means the service or port could not be
/// resolved — the caller surfaces `Service [name:port] is invalid or
/// missing` (§7) and drops the cluster from the route.
#[allow(clippy::too_many_arguments)]
pub fn resolve_cluster(
    cache: &ObjectCache,
    namespace: &str,
    name: &str,
    port_query: &PortQuery,
    weight: u32,
    protocol: Protocol,
    mirror: bool,
    upstream_validation: Option<UpstreamValidation>,
    health_check: Option<HealthCheck>,
    slow_start: Option<SlowStart>,
    host_rewrite: Option<&str>,
    limits: ConnectionLimits,
) -> Option<Cluster> {
    let (svc, port) = cache.lookup_service(namespace, name, port_query)?;
    let port_number = u16::try_from(port.port).ok()?;
    if port_number == 0 {
        return None;
    }
    let sni = (protocol == Protocol::Tls).then(|| {
        let external_name = svc.spec.as_ref().and_then(|s| s.external_name.as_deref());
        crate::validators::tls::determine_sni(host_rewrite, external_name, name).to_owned()
    });
    Some(Cluster {
        service: ServiceRef {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            port: port_number,
        },
        weight,
        protocol,
        upstream_validation,
        health_check,
        slow_start,
        limits,
        mirror,
        sni,
    })
}

/// A human-readable `name:port` tag for the "invalid or missing"
/// diagnostic (§7).
pub fn service_tag(name: &str, port_query: &PortQuery) -> String {
    match port_query {
        PortQuery::Number(n) => format!("{name}:{n}"),
        PortQuery::Name(s) => format!("{name}:{s}"),
    }
}
