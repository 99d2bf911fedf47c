//! The legacy `IngressRoute` processor (§4.4 "IngressRoute processor"):
//! root+delegate trees with cycle detection. `HTTPProxy` repeats this
//! shape with match conditions layered on top (see `http_proxy.rs`).

use std::collections::BTreeSet;

use crate::cache::{ObjectCache, PortQuery};
use crate::conditions::{validate_delegate_prefix, MatchConditions};
use crate::context::{object_reference, BuildContext};
use crate::dag::{Route, SecretRef, TcpProxy, TlsVersion};
use crate::duration::Timeout;
use crate::resource::{IngressRoute, IngressRouteService};
use crate::status::ObjectKind;
use crate::validators::tls::certificate_delegation_permitted;

type NodeKey = (String, String);

fn split_secret_ref(secret_name: &str, default_namespace: &str) -> (String, String) {
    match secret_name.split_once('/') {
        Some((ns, name)) => (ns.to_owned(), name.to_owned()),
        None => (default_namespace.to_owned(), secret_name.to_owned()),
    }
}

fn resolve_service(
    cache: &ObjectCache,
    namespace: &str,
    svc: &IngressRouteService,
) -> Option<crate::dag::Cluster> {
    let port_query = PortQuery::from_int_or_string(&svc.port);
    super::resolve_cluster(
        cache,
        namespace,
        &svc.name,
        &port_query,
        u32::try_from(svc.weight.max(0)).unwrap_or(0),
        crate::dag::Protocol::Plain,
        svc.mirror,
        svc.upstream_validation.as_ref().map(|uv| crate::dag::UpstreamValidation {
            ca_secret: {
                let (ns, name) = split_secret_ref(&uv.ca_secret, namespace);
                SecretRef { namespace: ns, name }
            },
            subject_name: uv.subject_name.clone(),
        }),
        None,
        None,
        None,
        crate::dag::ConnectionLimits::default(),
    )
}

pub fn run(cache: &ObjectCache, ctx: &mut BuildContext) {
    let mut reachable_valid: BTreeSet<NodeKey> = BTreeSet::new();

    for root in cache.ingress_routes() {
        if root.spec.virtualhost.is_some() {
            process_root(cache, ctx, root, &mut reachable_valid);
        }
    }

    for child in cache.ingress_routes() {
        if child.spec.virtualhost.is_some() {
            continue;
        }
        let ns = child.metadata.namespace.as_deref().unwrap_or_default();
        let name = child.metadata.name.as_deref().unwrap_or_default();
        let key = (ns.to_owned(), name.to_owned());
        let object = object_reference(ObjectKind::IngressRoute, ns, name);
        if reachable_valid.contains(&key) {
            ctx.status.for_object(object).set_valid("valid IngressRoute", None);
        } else if !ctx.status.has_status(&object) {
            ctx.status
                .for_object(object)
                .set_orphaned("this IngressRoute is not part of a delegation chain from a root IngressRoute");
        }
    }
}

fn process_root(
    cache: &ObjectCache,
    ctx: &mut BuildContext,
    root: &IngressRoute,
    reachable_valid: &mut BTreeSet<NodeKey>,
) {
    let ns = root.metadata.namespace.as_deref().unwrap_or_default();
    let name = root.metadata.name.as_deref().unwrap_or_default();
    let object = object_reference(ObjectKind::IngressRoute, ns, name);
    let vh = root.spec.virtualhost.as_ref().unwrap();

    if vh.fqdn.is_empty() {
        ctx.status
            .for_object(object)
            .set_invalid("Spec.VirtualHost.Fqdn must be specified");
        return;
    }
    if !cache.is_allowed_root_namespace(ns) {
        ctx.status
            .for_object(object)
            .set_invalid("root IngressRoute cannot be defined in this namespace");
        return;
    }

    ctx.claim_fqdn(&vh.fqdn, object, "IngressRoute", "IngressRoutes");

    let mut path = Vec::new();
    let routes = collect_routes(cache, ctx, ns, name, None, &mut path, reachable_valid);
    for route in &routes {
        ctx.vhost_mut(&vh.fqdn).add_route(route.clone());
    }

    if let Some(tls) = &vh.tls {
        let min_tls = tls
            .minimum_protocol_version
            .as_deref()
            .map(TlsVersion::parse_or_default)
            .unwrap_or_default();
        if tls.passthrough {
            let secure = ctx.secure_vhost_mut(&vh.fqdn);
            secure.passthrough = true;
            secure.min_tls_version = min_tls;
        } else if let Some(secret_name) = &tls.secret_name {
            let (secret_ns, secret_nm) = split_secret_ref(secret_name, ns);
            let resolvable = cache.lookup_secret(&secret_ns, &secret_nm).is_some();
            let permitted = certificate_delegation_permitted(cache, &secret_ns, &secret_nm, ns);
            if resolvable && permitted {
                let secure = ctx.secure_vhost_mut(&vh.fqdn);
                secure.min_tls_version = min_tls;
                secure.secret = Some(SecretRef {
                    namespace: secret_ns,
                    name: secret_nm,
                });
                for route in &routes {
                    secure.add_route(route.clone());
                }
            }
        }
    }

    if let Some(tcpproxy) = &root.spec.tcpproxy {
        let clusters: Vec<_> = tcpproxy
            .services
            .iter()
            .filter_map(|svc| resolve_service(cache, ns, svc))
            .collect();
        if !clusters.is_empty() {
            ctx.secure_vhost_mut(&vh.fqdn).tcp_proxy = Some(TcpProxy { clusters });
        }
    }
}

/// Recursively resolves one node's contribution to the root's route set,
/// validating the path-prefix-monotonicity rule at each delegation edge
/// and detecting cycles (including self-edges) via `path`, the list of
/// `ns/name` nodes visited on the current descent (§4.4 state machine).
fn collect_routes(
    cache: &ObjectCache,
    ctx: &mut BuildContext,
    namespace: &str,
    name: &str,
    parent_match: Option<&str>,
    path: &mut Vec<NodeKey>,
    reachable_valid: &mut BTreeSet<NodeKey>,
) -> Vec<Route> {
    let key = (namespace.to_owned(), name.to_owned());
    if path.contains(&key) {
        let mut trail: Vec<String> = path.iter().map(|(n, m)| format!("{n}/{m}")).collect();
        trail.push(format!("{namespace}/{name}"));
        let description = format!("include creates a delegation cycle: {}", trail.join(" -> "));
        ctx.status
            .for_object(object_reference(ObjectKind::IngressRoute, namespace, name))
            .set_invalid(description);
        return Vec::new();
    }

    let Some(node) = cache.get_ingress_route(namespace, name) else {
        return Vec::new();
    };
    if node.spec.virtualhost.is_some() && !path.is_empty() {
        ctx.status
            .for_object(object_reference(ObjectKind::IngressRoute, namespace, name))
            .set_invalid("a delegate route must not itself be a root");
        return Vec::new();
    }

    path.push(key.clone());
    let mut out = Vec::new();
    let mut any_ok = false;

    for route in &node.spec.routes {
        if !route.match_.starts_with('/') {
            ctx.status
                .for_object(object_reference(ObjectKind::IngressRoute, namespace, name))
                .set_invalid(format!(
                    "route: prefix conditions must start with /, {} was supplied",
                    route.match_
                ));
            continue;
        }
        if let Some(parent) = parent_match {
            if let Err(err) = validate_delegate_prefix(parent, &route.match_) {
                ctx.status
                    .for_object(object_reference(ObjectKind::IngressRoute, namespace, name))
                    .set_invalid(err.to_string());
                continue;
            }
        }

        if let Some(delegate) = &route.delegate {
            let child_ns = delegate
                .namespace
                .clone()
                .unwrap_or_else(|| namespace.to_owned());
            let child_routes = collect_routes(
                cache,
                ctx,
                &child_ns,
                &delegate.name,
                Some(&route.match_),
                path,
                reachable_valid,
            );
            if !child_routes.is_empty() {
                any_ok = true;
            }
            out.extend(child_routes);
        } else {
            let clusters: Vec<_> = route
                .services
                .iter()
                .filter_map(|svc| resolve_service(cache, namespace, svc))
                .collect();
            if clusters.is_empty() {
                continue;
            }
            let built = Route {
                conditions: MatchConditions {
                    prefix: Some(route.match_.clone()),
                    headers: Vec::new(),
                    query_params: Vec::new(),
                },
                clusters,
                timeout: route
                    .timeout_policy
                    .as_ref()
                    .and_then(|t| t.response.as_deref())
                    .map(crate::duration::parse)
                    .unwrap_or(Timeout::Disabled),
                idle_timeout: route
                    .timeout_policy
                    .as_ref()
                    .and_then(|t| t.idle.as_deref())
                    .map(crate::duration::parse)
                    .unwrap_or(Timeout::Disabled),
                retry: route.retry_policy.as_ref().map(|r| crate::dag::RetryPolicy {
                    num_retries: u32::try_from(r.num_retries.unwrap_or(0).max(0)).unwrap_or(0),
                    per_try_timeout: r
                        .per_try_timeout
                        .as_deref()
                        .and_then(|s| crate::duration::parse_strict(s).ok()),
                }),
                https_upgrade: false,
                websocket: route.enable_websocket,
                cors: None,
                rate_limit: None,
            };
            if built.mirror_count() > 1 {
                ctx.status
                    .for_object(object_reference(ObjectKind::IngressRoute, namespace, name))
                    .set_invalid("only one service per route may be nominated as mirror");
                continue;
            }
            any_ok = true;
            out.push(built);
        }
    }

    path.pop();
    if any_ok {
        reachable_valid.insert(key);
    }
    out
}
