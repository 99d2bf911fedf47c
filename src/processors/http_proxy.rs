//! The `HTTPProxy` processor (§4.4 "HTTPProxy processor"): the same
//! root+delegate discipline as `IngressRoute`, with match-condition
//! merging (§4.3) instead of single-prefix matching, plus CORS,
//! fallback-certificate, and external-authorization policy.

use std::collections::BTreeSet;

use crate::cache::{ObjectCache, PortQuery};
use crate::conditions::{
    self, ConditionError, HeaderCondition, HeaderMatch, MatchConditions, QueryCondition, QueryMatch,
};
use crate::context::{object_reference, BuildContext};
use crate::dag::{Route, SecretRef, TcpProxy, TlsVersion, UpstreamValidation};
use crate::duration::Timeout;
use crate::resource::{HeaderMatchCondition, HttpProxy, HttpProxyService, MatchCondition, QueryParameterMatchCondition};
use crate::status::ObjectKind;
use crate::validators::tls::{certificate_delegation_permitted, validate_fallback_certificate};

type NodeKey = (String, String);

fn wire_header_match(h: &HeaderMatchCondition) -> Option<HeaderMatch> {
    if let Some(v) = &h.exact {
        return Some(HeaderMatch::Exact(v.clone()));
    }
    if let Some(v) = &h.not_exact {
        return Some(HeaderMatch::NotExact(v.clone()));
    }
    if let Some(v) = &h.contains {
        return Some(HeaderMatch::Contains(v.clone()));
    }
    if let Some(v) = &h.not_contains {
        return Some(HeaderMatch::NotContains(v.clone()));
    }
    if h.present {
        return Some(HeaderMatch::Present);
    }
    None
}

fn wire_query_match(q: &QueryParameterMatchCondition) -> Option<QueryMatch> {
    if let Some(v) = &q.exact {
        return Some(QueryMatch::Exact(v.clone()));
    }
    if q.present {
        return Some(QueryMatch::Present);
    }
    None
}

/// Folds a `MatchCondition` list (Contour's wire shape: one-of
/// prefix/header/query-parameter per entry) into one aggregate,
/// rejecting more than one prefix in the block (§4.3).
fn condition_list(list: &[MatchCondition]) -> Result<MatchConditions, ConditionError> {
    let mut prefix = None;
    let mut headers = Vec::new();
    let mut query_params = Vec::new();
    for item in list {
        if let Some(p) = &item.prefix {
            if prefix.is_some() {
                return Err(ConditionError::MultiplePrefixes);
            }
            if !p.starts_with('/') {
                return Err(ConditionError::PrefixMustStartWithSlash(p.clone()));
            }
            prefix = Some(p.clone());
        }
        if let Some(h) = &item.header {
            if let Some(op) = wire_header_match(h) {
                headers.push(HeaderCondition {
                    name: h.name.clone(),
                    op,
                });
            }
        }
        if let Some(q) = &item.query_parameter {
            if let Some(op) = wire_query_match(q) {
                query_params.push(QueryCondition {
                    name: q.name.clone(),
                    op,
                });
            }
        }
    }
    Ok(MatchConditions {
        prefix,
        headers,
        query_params,
    })
}

/// Converts the wire `HealthCheckPolicy` into the DAG's `HealthCheck`
/// (§3 Cluster). Unset numeric fields fall back to Envoy-style
/// defaults rather than zero, since a zero interval/threshold would be
/// meaningless.
fn resolve_health_check(policy: &crate::resource::HealthCheckPolicy) -> crate::dag::HealthCheck {
    crate::dag::HealthCheck {
        path: policy.path.clone(),
        interval: std::time::Duration::from_secs(
            policy.interval_seconds.filter(|v| *v > 0).unwrap_or(10) as u64,
        ),
        unhealthy_threshold: u32::try_from(policy.unhealthy_threshold_count.unwrap_or(3).max(0))
            .unwrap_or(3),
        healthy_threshold: u32::try_from(policy.healthy_threshold_count.unwrap_or(3).max(0))
            .unwrap_or(3),
    }
}

/// Resolves one weighted backend reference, validating its slow-start
/// policy (if any) and folding a validation failure into `owner`'s
/// status (§4.5 "Valid results are wired into Route/Cluster entities;
/// errors raise invalid status"). `namespace` is the namespace the
/// service itself lives in (may differ from `owner` for a `tcpproxy`
/// include that targets another namespace).
fn resolve_service(
    cache: &ObjectCache,
    ctx: &mut BuildContext,
    owner: (&str, &str),
    namespace: &str,
    svc: &HttpProxyService,
) -> Option<crate::dag::Cluster> {
    let port_query = PortQuery::from_int_or_string(&svc.port);
    let protocol = match svc.protocol.as_deref() {
        Some("h2") => crate::dag::Protocol::H2,
        Some("h2c") => crate::dag::Protocol::H2c,
        Some("tls") => crate::dag::Protocol::Tls,
        _ => crate::dag::Protocol::Plain,
    };

    let slow_start = match &svc.slow_start_policy {
        None => None,
        Some(policy) => match crate::validators::slow_start::validate(policy) {
            Ok(resolved) => Some(resolved),
            Err(err) => {
                ctx.status
                    .for_object(object_reference(ObjectKind::HttpProxy, owner.0, owner.1))
                    .set_invalid(err.to_string());
                return None;
            }
        },
    };

    let host_rewrite = svc
        .request_headers_policy
        .as_ref()
        .and_then(|p| p.host_rewrite.as_deref());

    super::resolve_cluster(
        cache,
        namespace,
        &svc.name,
        &port_query,
        u32::try_from(svc.weight.max(0)).unwrap_or(0),
        protocol,
        svc.mirror,
        svc.upstream_validation.as_ref().map(|uv| UpstreamValidation {
            ca_secret: SecretRef {
                namespace: namespace.to_owned(),
                name: uv.ca_secret.clone(),
            },
            subject_name: uv.subject_name.clone(),
        }),
        svc.health_check_policy.as_ref().map(resolve_health_check),
        slow_start,
        host_rewrite,
        crate::dag::ConnectionLimits::default(),
    )
}

pub fn run(cache: &ObjectCache, ctx: &mut BuildContext) {
    let mut reachable_valid: BTreeSet<NodeKey> = BTreeSet::new();

    for root in cache.http_proxies() {
        if root.spec.virtualhost.is_some() {
            process_root(cache, ctx, root, &mut reachable_valid);
        }
    }

    for child in cache.http_proxies() {
        if child.spec.virtualhost.is_some() {
            continue;
        }
        let ns = child.metadata.namespace.as_deref().unwrap_or_default();
        let name = child.metadata.name.as_deref().unwrap_or_default();
        let key = (ns.to_owned(), name.to_owned());
        let object = object_reference(ObjectKind::HttpProxy, ns, name);
        if reachable_valid.contains(&key) {
            ctx.status.for_object(object).set_valid("valid HTTPProxy", None);
        } else if !ctx.status.has_status(&object) {
            ctx.status
                .for_object(object)
                .set_orphaned("this HTTPProxy is not part of a delegation chain from a root HTTPProxy");
        }
    }
}

fn process_root(
    cache: &ObjectCache,
    ctx: &mut BuildContext,
    root: &HttpProxy,
    reachable_valid: &mut BTreeSet<NodeKey>,
) {
    let ns = root.metadata.namespace.as_deref().unwrap_or_default();
    let name = root.metadata.name.as_deref().unwrap_or_default();
    let object = object_reference(ObjectKind::HttpProxy, ns, name);
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
            .set_invalid("root HTTPProxy cannot be defined in this namespace");
        return;
    }

    ctx.claim_fqdn(&vh.fqdn, object, "HTTPProxy", "HTTPProxies");

    let mut path = Vec::new();
    let base = MatchConditions::default();
    let mut routes = collect_routes(cache, ctx, ns, name, &base, &mut path, reachable_valid);

    if let Some(cors_spec) = &vh.cors_policy {
        match crate::validators::cors::validate(cors_spec) {
            Ok(cors) => {
                for route in &mut routes {
                    route.cors = Some(cors.clone());
                }
            }
            Err(err) => {
                ctx.status
                    .for_object(object_reference(ObjectKind::HttpProxy, ns, name))
                    .set_invalid(err.to_string());
            }
        }
    }

    let authorization = vh.authorization.as_ref().and_then(|auth| {
        match crate::validators::extension::resolve(cache, ns, auth) {
            Ok(resolved) => Some(resolved),
            Err(err) => {
                ctx.status
                    .for_object(object_reference(ObjectKind::HttpProxy, ns, name))
                    .set_invalid(err.to_string());
                None
            }
        }
    });

    let plain_vhost = ctx.vhost_mut(&vh.fqdn);
    plain_vhost.authorization = authorization.clone();
    for route in &routes {
        plain_vhost.add_route(route.clone());
    }

    if let Some(tls) = &vh.tls {
        let min_tls = tls
            .minimum_protocol_version
            .as_deref()
            .map(TlsVersion::parse_or_default)
            .unwrap_or_default();
        let client_validation = tls.client_validation.as_ref().map(|dv| UpstreamValidation {
            ca_secret: SecretRef {
                namespace: ns.to_owned(),
                name: dv.ca_secret.clone(),
            },
            subject_name: String::new(),
        });

        if tls.passthrough {
            let secure = ctx.secure_vhost_mut(&vh.fqdn);
            secure.passthrough = true;
            secure.min_tls_version = min_tls;
            secure.authorization = authorization.clone();
        } else if let Some(secret_name) = &tls.secret_name {
            let (secret_ns, secret_nm) = secret_name.split_once('/').map_or_else(
                || (ns.to_owned(), secret_name.clone()),
                |(n, s)| (n.to_owned(), s.to_owned()),
            );
            let resolvable = cache.lookup_secret(&secret_ns, &secret_nm).is_some();
            let permitted = certificate_delegation_permitted(cache, &secret_ns, &secret_nm, ns);
            if resolvable && permitted {
                let secure = ctx.secure_vhost_mut(&vh.fqdn);
                secure.min_tls_version = min_tls;
                secure.secret = Some(SecretRef {
                    namespace: secret_ns,
                    name: secret_nm,
                });
                secure.client_validation = client_validation;
                secure.authorization = authorization.clone();
                for route in &routes {
                    secure.add_route(route.clone());
                }
            } else {
                ctx.status
                    .for_object(object_reference(ObjectKind::HttpProxy, ns, name))
                    .set_invalid(format!(
                        "Spec.VirtualHost.TLS Secret \"{secret_name}\" certificate delegation not permitted"
                    ));
            }
        } else if tls.enable_fallback_certificate {
            let fallback_configured = ctx.fallback_secret().is_some();
            let fallback_secret_ref = ctx.fallback_secret().map(|(fb_ns, fb_name)| SecretRef {
                namespace: fb_ns.to_owned(),
                name: fb_name.to_owned(),
            });
            match validate_fallback_certificate(fallback_configured, client_validation.is_some()) {
                Ok(()) => {
                    let secure = ctx.secure_vhost_mut(&vh.fqdn);
                    secure.min_tls_version = min_tls;
                    secure.fallback_certificate = true;
                    secure.client_validation = client_validation;
                    secure.authorization = authorization.clone();
                    secure.secret = fallback_secret_ref;
                    for route in &routes {
                        secure.add_route(route.clone());
                    }
                }
                Err(err) => {
                    ctx.status
                        .for_object(object_reference(ObjectKind::HttpProxy, ns, name))
                        .set_invalid(err.to_string());
                }
            }
        }
    }

    if let Some(tcpproxy) = &root.spec.tcpproxy {
        let has_services = !tcpproxy.services.is_empty();
        let has_include = tcpproxy.effective_include().is_some();
        match (has_services, has_include) {
            (true, true) => {
                ctx.status
                    .for_object(object_reference(ObjectKind::HttpProxy, ns, name))
                    .set_invalid("tcpproxy: cannot specify services and include in the same httpproxy");
            }
            (true, false) => {
                let clusters: Vec<_> = tcpproxy
                    .services
                    .iter()
                    .filter_map(|svc| resolve_service(cache, ctx, (ns, name), ns, svc))
                    .collect();
                if !clusters.is_empty() {
                    ctx.secure_vhost_mut(&vh.fqdn).tcp_proxy = Some(TcpProxy { clusters });
                }
            }
            (false, true) => {
                let include = tcpproxy.effective_include().unwrap();
                let target_ns = include.namespace.clone().unwrap_or_else(|| ns.to_owned());
                if let Some(target) = cache.get_http_proxy(&target_ns, &include.name) {
                    if let Some(target_tcp) = &target.spec.tcpproxy {
                        let clusters: Vec<_> = target_tcp
                            .services
                            .iter()
                            .filter_map(|svc| resolve_service(cache, ctx, (ns, name), &target_ns, svc))
                            .collect();
                        if !clusters.is_empty() {
                            ctx.secure_vhost_mut(&vh.fqdn).tcp_proxy = Some(TcpProxy { clusters });
                        }
                    }
                }
            }
            (false, false) => {
                ctx.status
                    .for_object(object_reference(ObjectKind::HttpProxy, ns, name))
                    .set_invalid("tcpproxy: either services or include must be specified");
            }
        }
    }
}

/// Recursively resolves one node's contribution to the root's route
/// set, merging match conditions down the inclusion chain (§4.3) and
/// detecting cycles the same way `ingress_route::collect_routes` does.
fn collect_routes(
    cache: &ObjectCache,
    ctx: &mut BuildContext,
    namespace: &str,
    name: &str,
    inherited: &MatchConditions,
    path: &mut Vec<NodeKey>,
    reachable_valid: &mut BTreeSet<NodeKey>,
) -> Vec<Route> {
    let key = (namespace.to_owned(), name.to_owned());
    if path.contains(&key) {
        let mut trail: Vec<String> = path.iter().map(|(n, m)| format!("{n}/{m}")).collect();
        trail.push(format!("{namespace}/{name}"));
        let description = format!("include creates a delegation cycle: {}", trail.join(" -> "));
        ctx.status
            .for_object(object_reference(ObjectKind::HttpProxy, namespace, name))
            .set_invalid(description);
        return Vec::new();
    }

    let Some(node) = cache.get_http_proxy(namespace, name) else {
        return Vec::new();
    };
    if node.spec.virtualhost.is_some() && !path.is_empty() {
        ctx.status
            .for_object(object_reference(ObjectKind::HttpProxy, namespace, name))
            .set_invalid("a delegate route must not itself be a root");
        return Vec::new();
    }

    path.push(key.clone());
    let mut out = Vec::new();
    let mut any_ok = false;

    for route in &node.spec.routes {
        let own = match condition_list(&route.conditions) {
            Ok(c) => c,
            Err(err) => {
                ctx.status
                    .for_object(object_reference(ObjectKind::HttpProxy, namespace, name))
                    .set_invalid(err.to_string());
                continue;
            }
        };
        let mut merged = conditions::merge(inherited, &own);
        if merged.prefix.is_none() {
            merged.prefix = Some("/".to_owned());
        }
        if let Err(err) = conditions::validate_no_duplicate_headers(&merged.headers) {
            ctx.status
                .for_object(object_reference(ObjectKind::HttpProxy, namespace, name))
                .set_invalid(err.to_string());
            continue;
        }

        let clusters: Vec<_> = route
            .services
            .iter()
            .filter_map(|svc| resolve_service(cache, ctx, (namespace, name), namespace, svc))
            .collect();
        if clusters.is_empty() {
            continue;
        }
        let built = Route {
            conditions: merged,
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
            websocket: false,
            cors: None,
            rate_limit: route.rate_limit_policy.as_ref().and_then(|r| {
                r.local.as_ref().map(|l| crate::dag::RateLimitPolicy {
                    requests_per_unit: l.requests,
                })
            }),
        };
        if built.mirror_count() > 1 {
            ctx.status
                .for_object(object_reference(ObjectKind::HttpProxy, namespace, name))
                .set_invalid("only one service per route may be nominated as mirror");
            continue;
        }
        any_ok = true;
        out.push(built);
    }

    let mut sibling_merged: Vec<MatchConditions> = Vec::new();
    for include in &node.spec.includes {
        let own = match condition_list(&include.conditions) {
            Ok(c) => c,
            Err(err) => {
                ctx.status
                    .for_object(object_reference(ObjectKind::HttpProxy, namespace, name))
                    .set_invalid(err.to_string());
                continue;
            }
        };
        let merged = conditions::merge(inherited, &own);
        if sibling_merged.iter().any(|m| conditions::includes_identical(m, &merged)) {
            ctx.status
                .for_object(object_reference(ObjectKind::HttpProxy, namespace, name))
                .set_invalid("duplicate conditions defined on an include");
            continue;
        }
        sibling_merged.push(merged.clone());

        let child_ns = include.namespace.clone().unwrap_or_else(|| namespace.to_owned());
        let child_routes = collect_routes(cache, ctx, &child_ns, &include.name, &merged, path, reachable_valid);
        if !child_routes.is_empty() {
            any_ok = true;
        }
        out.extend(child_routes);
    }

    path.pop();
    if any_ok {
        reachable_valid.insert(key);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Object;
    use crate::resource::{
        AuthorizationConfig, ExtensionServiceRef, ExtensionServiceSpec, ExtensionServiceTarget,
        HealthCheckPolicy, HttpProxyInclude, HttpProxyRoute, HttpProxySpec, HttpProxyVirtualHost,
        RequestHeadersPolicy, SlowStartPolicy,
    };
    use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

    fn proxy(ns: &str, name: &str, spec: HttpProxySpec) -> HttpProxy {
        HttpProxy {
            metadata: ObjectMeta {
                namespace: Some(ns.into()),
                name: Some(name.into()),
                ..Default::default()
            },
            spec,
            status: None,
        }
    }

    fn root_spec(routes: Vec<HttpProxyRoute>) -> HttpProxySpec {
        HttpProxySpec {
            virtualhost: Some(HttpProxyVirtualHost {
                fqdn: "example.com".into(),
                tls: None,
                cors_policy: None,
                authorization: None,
            }),
            routes,
            includes: vec![],
            tcpproxy: None,
        }
    }

    fn service(ns: &str, name: &str, port: i32, external_name: Option<&str>) -> Service {
        Service {
            metadata: ObjectMeta {
                namespace: Some(ns.into()),
                name: Some(name.into()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                ports: Some(vec![ServicePort {
                    port,
                    ..Default::default()
                }]),
                external_name: external_name.map(str::to_owned),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn plain_service(name: &str, mirror: bool) -> HttpProxyService {
        HttpProxyService {
            name: name.into(),
            port: IntOrString::Int(8080),
            weight: 0,
            mirror,
            protocol: None,
            upstream_validation: None,
            health_check_policy: None,
            slow_start_policy: None,
            request_headers_policy: None,
        }
    }

    #[test]
    fn scenario_s3_fqdn_collision() {
        let mut cache = ObjectCache::new(["roots".to_owned()]);
        for name in ["example-com", "other-example"] {
            cache.insert(Object::HttpProxy(proxy(
                "roots",
                name,
                HttpProxySpec {
                    virtualhost: Some(HttpProxyVirtualHost {
                        fqdn: "example.com".into(),
                        tls: None,
                        cors_policy: None,
                        authorization: None,
                    }),
                    routes: vec![],
                    includes: vec![],
                    tcpproxy: None,
                },
            )));
        }

        let mut ctx = BuildContext::new(80, 443);
        run(&cache, &mut ctx);
        let map = ctx.status.clone().into_map();
        let descriptions: Vec<_> = map.values().map(|s| s.description.clone()).collect();
        assert!(descriptions
            .iter()
            .all(|d| d.contains("fqdn \"example.com\" is used in multiple HTTPProxies")));
        assert!(descriptions.iter().any(|d| d.contains("roots/example-com")));
        assert!(descriptions.iter().any(|d| d.contains("roots/other-example")));

        let dag = ctx.finalize();
        assert!(dag.virtual_hosts().is_empty());
    }

    #[test]
    fn duplicate_include_conditions_are_rejected() {
        let mut cache = ObjectCache::new(["roots".to_owned()]);
        cache.insert(Object::HttpProxy(proxy(
            "roots",
            "parent",
            HttpProxySpec {
                virtualhost: Some(HttpProxyVirtualHost {
                    fqdn: "example.com".into(),
                    tls: None,
                    cors_policy: None,
                    authorization: None,
                }),
                routes: vec![],
                includes: vec![
                    HttpProxyInclude {
                        name: "child".into(),
                        namespace: None,
                        conditions: vec![MatchCondition {
                            prefix: Some("/foo".into()),
                            ..Default::default()
                        }],
                    },
                    HttpProxyInclude {
                        name: "child2".into(),
                        namespace: None,
                        conditions: vec![MatchCondition {
                            prefix: Some("/foo".into()),
                            ..Default::default()
                        }],
                    },
                ],
                tcpproxy: None,
            },
        )));

        let mut ctx = BuildContext::new(80, 443);
        run(&cache, &mut ctx);
        let map = ctx.status.clone().into_map();
        assert!(map
            .values()
            .any(|s| s.description.contains("duplicate conditions defined on an include")));
    }

    #[test]
    fn more_than_one_mirror_service_invalidates_the_root() {
        let mut cache = ObjectCache::new(["roots".to_owned()]);
        cache.insert(Object::Service(service("roots", "a", 8080, None)));
        cache.insert(Object::Service(service("roots", "b", 8080, None)));
        cache.insert(Object::HttpProxy(proxy(
            "roots",
            "parent",
            root_spec(vec![HttpProxyRoute {
                conditions: vec![],
                services: vec![plain_service("a", true), plain_service("b", true)],
                timeout_policy: None,
                retry_policy: None,
                rate_limit_policy: None,
            }]),
        )));

        let mut ctx = BuildContext::new(80, 443);
        run(&cache, &mut ctx);
        let map = ctx.status.clone().into_map();
        assert!(map
            .values()
            .any(|s| s.description.contains("only one service per route may be nominated as mirror")));

        let dag = ctx.finalize();
        assert!(dag.virtual_hosts().is_empty());
    }

    #[test]
    fn invalid_slow_start_policy_invalidates_the_root_and_drops_the_cluster() {
        let mut cache = ObjectCache::new(["roots".to_owned()]);
        cache.insert(Object::Service(service("roots", "a", 8080, None)));
        let mut svc = plain_service("a", false);
        svc.slow_start_policy = Some(SlowStartPolicy {
            window: "0s".into(),
            aggression: None,
            min_weight_percent: None,
        });
        cache.insert(Object::HttpProxy(proxy(
            "roots",
            "parent",
            root_spec(vec![HttpProxyRoute {
                conditions: vec![],
                services: vec![svc],
                timeout_policy: None,
                retry_policy: None,
                rate_limit_policy: None,
            }]),
        )));

        let mut ctx = BuildContext::new(80, 443);
        run(&cache, &mut ctx);
        let map = ctx.status.clone().into_map();
        assert!(map
            .values()
            .any(|s| s.description.contains("slow start window")));
        let dag = ctx.finalize();
        assert!(dag.virtual_hosts().is_empty());
    }

    #[test]
    fn valid_slow_start_and_health_check_are_wired_onto_the_cluster() {
        let mut cache = ObjectCache::new(["roots".to_owned()]);
        cache.insert(Object::Service(service("roots", "a", 8080, None)));
        let mut svc = plain_service("a", false);
        svc.slow_start_policy = Some(SlowStartPolicy {
            window: "10s".into(),
            aggression: Some("1.5".into()),
            min_weight_percent: Some(10),
        });
        svc.health_check_policy = Some(HealthCheckPolicy {
            path: "/healthz".into(),
            interval_seconds: Some(5),
            unhealthy_threshold_count: Some(2),
            healthy_threshold_count: Some(2),
        });
        cache.insert(Object::HttpProxy(proxy(
            "roots",
            "parent",
            root_spec(vec![HttpProxyRoute {
                conditions: vec![],
                services: vec![svc],
                timeout_policy: None,
                retry_policy: None,
                rate_limit_policy: None,
            }]),
        )));

        let mut ctx = BuildContext::new(80, 443);
        run(&cache, &mut ctx);
        let dag = ctx.finalize();
        let vhost = dag.virtual_hosts().iter().find(|v| v.fqdn == "example.com").unwrap();
        let cluster = &vhost.routes.values().next().unwrap().clusters[0];
        let slow_start = cluster.slow_start.expect("slow start resolved");
        assert_eq!(slow_start.min_weight_percent, 10);
        let health_check = cluster.health_check.as_ref().expect("health check resolved");
        assert_eq!(health_check.path, "/healthz");
        assert_eq!(health_check.unhealthy_threshold, 2);
    }

    #[test]
    fn tls_cluster_sni_prefers_host_rewrite_then_external_name_then_service_name() {
        let mut cache = ObjectCache::new(["roots".to_owned()]);
        cache.insert(Object::Service(service("roots", "a", 8080, Some("a.external"))));
        cache.insert(Object::Service(service("roots", "b", 8080, None)));

        let mut rewritten = plain_service("a", false);
        rewritten.protocol = Some("tls".into());
        rewritten.request_headers_policy = Some(RequestHeadersPolicy {
            host_rewrite: Some("rewritten.example.com".into()),
        });
        let mut external_only = plain_service("b", false);
        external_only.protocol = Some("tls".into());

        cache.insert(Object::HttpProxy(proxy(
            "roots",
            "parent",
            root_spec(vec![
                HttpProxyRoute {
                    conditions: vec![MatchCondition {
                        prefix: Some("/a".into()),
                        ..Default::default()
                    }],
                    services: vec![rewritten],
                    timeout_policy: None,
                    retry_policy: None,
                    rate_limit_policy: None,
                },
                HttpProxyRoute {
                    conditions: vec![MatchCondition {
                        prefix: Some("/b".into()),
                        ..Default::default()
                    }],
                    services: vec![external_only],
                    timeout_policy: None,
                    retry_policy: None,
                    rate_limit_policy: None,
                },
            ]),
        )));

        let mut ctx = BuildContext::new(80, 443);
        run(&cache, &mut ctx);
        let dag = ctx.finalize();
        let vhost = dag.virtual_hosts().iter().find(|v| v.fqdn == "example.com").unwrap();
        let sni_a = vhost.routes["/a"].clusters[0].sni.as_deref();
        let sni_b = vhost.routes["/b"].clusters[0].sni.as_deref();
        assert_eq!(sni_a, Some("rewritten.example.com"));
        assert_eq!(sni_b, Some("b"));
    }

    #[test]
    fn resolved_authorization_extension_is_wired_onto_the_vhost() {
        let mut cache = ObjectCache::new(["roots".to_owned()]);
        cache.insert(Object::ExtensionService(crate::resource::ExtensionService {
            metadata: ObjectMeta {
                namespace: Some("projectcontour-auth".into()),
                name: Some("authorizer".into()),
                ..Default::default()
            },
            spec: ExtensionServiceSpec {
                services: vec![ExtensionServiceTarget {
                    name: "authorizer".into(),
                    port: IntOrString::Int(9001),
                }],
                timeout_policy: None,
                protocol: None,
            },
            status: None,
        }));

        cache.insert(Object::Service(service("roots", "a", 8080, None)));
        let mut spec = root_spec(vec![HttpProxyRoute {
            conditions: vec![],
            services: vec![plain_service("a", false)],
            timeout_policy: None,
            retry_policy: None,
            rate_limit_policy: None,
        }]);
        spec.virtualhost.as_mut().unwrap().authorization = Some(AuthorizationConfig {
            extension_ref: ExtensionServiceRef {
                api_version: None,
                namespace: Some("projectcontour-auth".into()),
                name: "authorizer".into(),
            },
            response_timeout: None,
            fail_open: false,
        });
        cache.insert(Object::HttpProxy(proxy("roots", "parent", spec)));

        let mut ctx = BuildContext::new(80, 443);
        run(&cache, &mut ctx);
        let dag = ctx.finalize();
        let vhost = dag.virtual_hosts().iter().find(|v| v.fqdn == "example.com").unwrap();
        let auth = vhost.authorization.as_ref().expect("authorization resolved");
        assert_eq!(auth.name, "authorizer");
        assert_eq!(auth.namespace, "projectcontour-auth");
    }
}
