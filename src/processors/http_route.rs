//! The Gateway-API `HTTPRoute` processor (§4.4 "Gateway-API HTTPRoute
//! processor (computeHosts)"). Unlike `IngressRoute`/`HTTPProxy`,
//! `HTTPRoute` carries no delegation chain and no FQDN-uniqueness claim
//! of its own — it attaches routes directly to whichever hosts its
//! `hostnames` list validates to.

use std::net::IpAddr;

use thiserror::Error;

use crate::cache::{ObjectCache, PortQuery};
use crate::conditions::MatchConditions;
use crate::context::{object_reference, BuildContext};
use crate::dag::{ConnectionLimits, Protocol, Route};
use crate::duration::Timeout;
use crate::resource::{HttpRoute, HttpRouteBackendRef, HttpRouteRule};
use crate::status::ObjectKind;

const WILDCARD_HOST: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostnameError {
    #[error("hostname \"{0}\" must not be an IP address")]
    IsIpAddress(String),
    #[error("hostname \"{0}\" is not a valid DNS name")]
    InvalidDnsName(String),
    #[error("wildcard hostname \"{0}\" must be of the form *.<valid-subdomain>")]
    InvalidWildcard(String),
}

impl HostnameError {
    fn hostname(&self) -> &str {
        match self {
            HostnameError::IsIpAddress(h)
            | HostnameError::InvalidDnsName(h)
            | HostnameError::InvalidWildcard(h) => h,
        }
    }
}

fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }
    let bytes = label.as_bytes();
    if bytes[0] == b'-' || bytes[bytes.len() - 1] == b'-' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
}

fn is_valid_dns_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 253 {
        return false;
    }
    name.split('.').all(is_valid_label)
}

fn validate_hostname(hostname: &str) -> Result<(), HostnameError> {
    if hostname.parse::<IpAddr>().is_ok() {
        return Err(HostnameError::IsIpAddress(hostname.to_owned()));
    }
    if let Some(sub) = hostname.strip_prefix("*.") {
        return if is_valid_dns_name(sub) {
            Ok(())
        } else {
            Err(HostnameError::InvalidWildcard(hostname.to_owned()))
        };
    }
    if hostname.contains('*') {
        return Err(HostnameError::InvalidWildcard(hostname.to_owned()));
    }
    if is_valid_dns_name(hostname) {
        Ok(())
    } else {
        Err(HostnameError::InvalidDnsName(hostname.to_owned()))
    }
}

/// Validates a `HTTPRoute.spec.hostnames` list into the set of FQDNs
/// this route attaches to (§4.4 "computeHosts"): an empty list accepts
/// the wildcard host; IPs are rejected; wildcards accept only a
/// left-most `*.` followed by a valid sub-domain; everything else must
/// be a valid DNS name. Returns the accepted hosts alongside one error
/// per offending hostname, rather than failing the whole list on the
/// first bad entry.
pub fn compute_hosts(hostnames: &[String]) -> (Vec<String>, Vec<HostnameError>) {
    if hostnames.is_empty() {
        return (vec![WILDCARD_HOST.to_owned()], Vec::new());
    }
    let mut accepted = Vec::new();
    let mut errors = Vec::new();
    for hostname in hostnames {
        match validate_hostname(hostname) {
            Ok(()) => accepted.push(hostname.clone()),
            Err(err) => errors.push(err),
        }
    }
    (accepted, errors)
}

fn resolve_backend(cache: &ObjectCache, namespace: &str, backend: &HttpRouteBackendRef) -> Option<crate::dag::Cluster> {
    let port_query = match &backend.port {
        Some(p) => PortQuery::from_int_or_string(p),
        None => return None,
    };
    let weight = u32::try_from(backend.weight.unwrap_or(1).max(0)).unwrap_or(0);
    super::resolve_cluster(
        cache,
        namespace,
        &backend.name,
        &port_query,
        weight,
        Protocol::Plain,
        false,
        None,
        None,
        None,
        None,
        ConnectionLimits::default(),
    )
}

fn path_prefix(rule: &HttpRouteRule) -> &str {
    rule.matches
        .first()
        .and_then(|m| m.path.as_ref())
        .and_then(|p| p.value.as_deref())
        .unwrap_or("/")
}

fn build_route(rule: &HttpRouteRule, clusters: Vec<crate::dag::Cluster>) -> Route {
    Route {
        conditions: MatchConditions {
            prefix: Some(path_prefix(rule).to_owned()),
            headers: Vec::new(),
            query_params: Vec::new(),
        },
        clusters,
        timeout: Timeout::Disabled,
        idle_timeout: Timeout::Disabled,
        retry: None,
        https_upgrade: false,
        websocket: false,
        cors: None,
        rate_limit: None,
    }
}

pub fn run(cache: &ObjectCache, ctx: &mut BuildContext) {
    for route in cache.http_routes() {
        process_one(cache, ctx, route);
    }
}

fn process_one(cache: &ObjectCache, ctx: &mut BuildContext, route: &HttpRoute) {
    let namespace = route.metadata.namespace.as_deref().unwrap_or_default();
    let name = route.metadata.name.as_deref().unwrap_or_default();
    let mut writer = ctx
        .status
        .for_object(object_reference(ObjectKind::HttpRoute, namespace, name));

    let (hosts, errors) = compute_hosts(&route.spec.hostnames);

    let mut any_route = false;
    for host in &hosts {
        for rule in &route.spec.rules {
            let clusters: Vec<_> = rule
                .backend_refs
                .iter()
                .filter_map(|b| resolve_backend(cache, namespace, b))
                .collect();
            if clusters.is_empty() {
                continue;
            }
            any_route = true;
            ctx.vhost_mut(host).add_route(build_route(rule, clusters));
        }
    }

    if any_route {
        if errors.is_empty() {
            writer.set_valid("valid HTTPRoute", None);
        } else {
            let bad: Vec<&str> = errors.iter().map(HostnameError::hostname).collect();
            writer.set_valid(
                format!("valid HTTPRoute, ignoring invalid hostnames: {}", bad.join(", ")),
                None,
            );
        }
    } else if !errors.is_empty() {
        let descriptions: Vec<String> = errors.iter().map(ToString::to_string).collect();
        writer.set_invalid(descriptions.join("; "));
    } else {
        writer.set_invalid("HTTPRoute has no resolvable backend");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Object;
    use crate::resource::{HttpRouteMatch, HttpRoutePathMatch, HttpRouteSpec};
    use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

    #[test]
    fn empty_hostnames_default_to_wildcard() {
        let (hosts, errors) = compute_hosts(&[]);
        assert_eq!(hosts, vec!["*".to_owned()]);
        assert!(errors.is_empty());
    }

    #[test]
    fn rejects_ip_addresses() {
        let (hosts, errors) = compute_hosts(&["10.0.0.1".to_owned()]);
        assert!(hosts.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], HostnameError::IsIpAddress(_)));
    }

    #[test]
    fn accepts_single_label_and_multi_label_names() {
        let (hosts, errors) = compute_hosts(&["localhost".to_owned(), "kuard.example.com".to_owned()]);
        assert_eq!(hosts, vec!["localhost", "kuard.example.com"]);
        assert!(errors.is_empty());
    }

    #[test]
    fn accepts_left_most_wildcard_only() {
        let (hosts, errors) = compute_hosts(&["*.example.com".to_owned()]);
        assert_eq!(hosts, vec!["*.example.com"]);
        assert!(errors.is_empty());

        let (hosts, errors) = compute_hosts(&["foo.*.example.com".to_owned()]);
        assert!(hosts.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], HostnameError::InvalidWildcard(_)));
    }

    #[test]
    fn rejects_non_dns_characters() {
        let (hosts, errors) = compute_hosts(&["exa mple!.com".to_owned()]);
        assert!(hosts.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], HostnameError::InvalidDnsName(_)));
    }

    fn kuard_service() -> Service {
        Service {
            metadata: ObjectMeta {
                namespace: Some("default".into()),
                name: Some("kuard".into()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                ports: Some(vec![ServicePort {
                    name: Some("http".into()),
                    port: 8080,
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn attaches_routes_for_each_accepted_host() {
        let mut cache = ObjectCache::new(["default".to_owned()]);
        cache.insert(Object::Service(kuard_service()));
        cache.insert(Object::HttpRoute(HttpRoute {
            metadata: ObjectMeta {
                namespace: Some("default".into()),
                name: Some("kuard".into()),
                ..Default::default()
            },
            spec: HttpRouteSpec {
                hostnames: vec!["kuard.example.com".into()],
                rules: vec![HttpRouteRule {
                    matches: vec![HttpRouteMatch {
                        path: Some(HttpRoutePathMatch {
                            type_: Some("PathPrefix".into()),
                            value: Some("/".into()),
                        }),
                    }],
                    backend_refs: vec![HttpRouteBackendRef {
                        name: "kuard".into(),
                        port: Some(IntOrString::Int(8080)),
                        weight: None,
                    }],
                }],
            },
        }));

        let mut ctx = BuildContext::new(80, 443);
        run(&cache, &mut ctx);
        let dag = ctx.finalize();

        assert!(dag.virtual_hosts().iter().any(|v| v.fqdn == "kuard.example.com"));
    }
}
