//! The Ingress processor (§4.4 "Ingress processor"): the simplest
//! source kind — every Ingress is independently a root, there is no
//! delegation, and FQDN collisions are left to the cluster's own
//! admission story rather than this builder's uniqueness check (an
//! Ingress is conventionally one of several objects sharing a host,
//! unlike `IngressRoute`/`HTTPProxy` roots).

use std::collections::BTreeMap;

use k8s_openapi::api::networking::v1::Ingress;

use crate::annotations;
use crate::cache::{ObjectCache, PortQuery};
use crate::conditions::MatchConditions;
use crate::context::BuildContext;
use crate::dag::{ConnectionLimits, Protocol, Route};
use crate::duration::Timeout;
use crate::status::ObjectKind;

const WILDCARD_HOST: &str = "*";

fn annotation_map(ingress: &Ingress) -> BTreeMap<String, String> {
    ingress
        .metadata
        .annotations
        .clone()
        .unwrap_or_default()
        .into_iter()
        .collect()
}

fn protocol_for_port(
    upstream_protocols: &[(annotations::UpstreamProtocolKind, String)],
    port: &PortQuery,
) -> Protocol {
    let token = match port {
        PortQuery::Number(n) => n.to_string(),
        PortQuery::Name(s) => s.clone(),
    };
    for (kind, p) in upstream_protocols {
        if *p == token {
            return match kind {
                annotations::UpstreamProtocolKind::H2 => Protocol::H2,
                annotations::UpstreamProtocolKind::H2c => Protocol::H2c,
                annotations::UpstreamProtocolKind::Tls => Protocol::Tls,
            };
        }
    }
    Protocol::Plain
}

fn build_route(
    prefix: &str,
    cluster: Option<crate::dag::Cluster>,
    https_upgrade: bool,
    websocket: bool,
    timeout: Timeout,
) -> Route {
    Route {
        conditions: MatchConditions {
            prefix: Some(prefix.to_owned()),
            headers: Vec::new(),
            query_params: Vec::new(),
        },
        clusters: cluster.into_iter().collect(),
        timeout,
        idle_timeout: Timeout::Disabled,
        retry: None,
        https_upgrade,
        websocket,
        cors: None,
        rate_limit: None,
    }
}

pub fn run(cache: &ObjectCache, ctx: &mut BuildContext) {
    for ingress in cache.ingresses() {
        process_one(cache, ctx, ingress);
    }
}

fn process_one(cache: &ObjectCache, ctx: &mut BuildContext, ingress: &Ingress) {
    let namespace = ingress.metadata.namespace.as_deref().unwrap_or_default();
    let name = ingress.metadata.name.as_deref().unwrap_or_default();
    let mut writer = ctx
        .status
        .for_object(crate::context::object_reference(ObjectKind::Ingress, namespace, name));

    let Some(spec) = &ingress.spec else {
        writer.set_invalid("Ingress has no spec");
        return;
    };

    let annotations = annotation_map(ingress);
    let allow_http = annotations::allow_http(&annotations);
    let https_upgrade = annotations::force_ssl_redirect(&annotations);
    let websocket_paths = annotations::websocket_routes(&annotations);
    let upstream_protocols = annotations::upstream_protocol(&annotations);
    let timeout = annotations::request_timeout(&annotations).unwrap_or(Timeout::Disabled);
    let min_tls = annotations::tls_minimum_protocol_version(&annotations);
    let limits = {
        let c = annotations::connection_limits(&annotations);
        ConnectionLimits {
            max_connections: c.max_connections,
            max_pending_requests: c.max_pending_requests,
            max_requests: c.max_requests,
            max_retries: c.max_retries,
        }
    };

    let tls_hosts: Vec<&str> = spec
        .tls
        .iter()
        .flatten()
        .flat_map(|t| t.hosts.iter().flatten())
        .map(String::as_str)
        .collect();
    let tls_secret = spec
        .tls
        .iter()
        .flatten()
        .find_map(|t| t.secret_name.as_deref());

    let mut any_route = false;

    if let Some(backend) = &spec.default_backend {
        if let Some(cluster) = resolve_backend(cache, namespace, backend, &upstream_protocols, limits) {
            let route = build_route(
                "/",
                Some(cluster),
                https_upgrade,
                websocket_paths.iter().any(|p| p == "/"),
                timeout,
            );
            any_route = true;
            if allow_http {
                ctx.vhost_mut(WILDCARD_HOST).add_route(route.clone());
            }
            if tls_hosts.contains(&WILDCARD_HOST) {
                if let Some(secret_name) = tls_secret {
                    add_secure_route(cache, ctx, namespace, WILDCARD_HOST, secret_name, min_tls, route);
                }
            }
        }
    }

    for rule in spec.rules.iter().flatten() {
        let Some(http) = &rule.http else { continue };
        let host = rule.host.as_deref().unwrap_or(WILDCARD_HOST);

        for path in &http.paths {
            let prefix = path.path.as_deref().unwrap_or("/");
            let cluster = resolve_backend(cache, namespace, &path.backend, &upstream_protocols, limits);
            if cluster.is_none() {
                continue;
            }
            any_route = true;
            let route = build_route(
                prefix,
                cluster,
                https_upgrade,
                websocket_paths.iter().any(|p| p == prefix),
                timeout,
            );

            if allow_http {
                ctx.vhost_mut(host).add_route(route.clone());
            }
            if tls_hosts.contains(&host) {
                if let Some(secret_name) = tls_secret {
                    add_secure_route(cache, ctx, namespace, host, secret_name, min_tls, route);
                }
            }
        }
    }

    if any_route {
        writer.set_valid("valid Ingress", None);
    } else {
        writer.set_invalid("Ingress has no resolvable backend");
    }
}

fn resolve_backend(
    cache: &ObjectCache,
    namespace: &str,
    backend: &k8s_openapi::api::networking::v1::IngressBackend,
    upstream_protocols: &[(annotations::UpstreamProtocolKind, String)],
    limits: ConnectionLimits,
) -> Option<crate::dag::Cluster> {
    let svc = backend.service.as_ref()?;
    let port_query = match &svc.port {
        Some(p) => {
            if let Some(n) = p.number {
                PortQuery::Number(u16::try_from(n).ok()?)
            } else {
                PortQuery::Name(p.name.clone()?)
            }
        }
        None => return None,
    };
    let protocol = protocol_for_port(upstream_protocols, &port_query);
    super::resolve_cluster(
        cache,
        namespace,
        &svc.name,
        &port_query,
        1,
        protocol,
        false,
        None,
        None,
        None,
        None,
        limits,
    )
}

fn add_secure_route(
    cache: &ObjectCache,
    ctx: &mut BuildContext,
    namespace: &str,
    host: &str,
    secret_name: &str,
    min_tls: crate::dag::TlsVersion,
    route: Route,
) {
    if cache.lookup_secret(namespace, secret_name).is_none() {
        return;
    }
    let secure = ctx.secure_vhost_mut(host);
    secure.min_tls_version = min_tls;
    secure.secret = Some(crate::dag::SecretRef {
        namespace: namespace.to_owned(),
        name: secret_name.to_owned(),
    });
    secure.add_route(route);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Object;
    use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
    use k8s_openapi::api::networking::v1::{
        HTTPIngressPath, HTTPIngressRuleValue, IngressBackend, IngressRule, IngressServiceBackend,
        IngressSpec, IngressTLS, ServiceBackendPort,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

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

    fn backend(port: i32) -> IngressBackend {
        IngressBackend {
            service: Some(IngressServiceBackend {
                name: "kuard".into(),
                port: Some(ServiceBackendPort {
                    number: Some(port),
                    name: None,
                }),
            }),
            resource: None,
        }
    }

    #[test]
    fn scenario_s1_simple_default_backend() {
        let mut cache = ObjectCache::new(["default".to_owned()]);
        cache.insert(Object::Service(kuard_service()));
        cache.insert(Object::Ingress(Ingress {
            metadata: ObjectMeta {
                namespace: Some("default".into()),
                name: Some("kuard".into()),
                ..Default::default()
            },
            spec: Some(IngressSpec {
                default_backend: Some(backend(8080)),
                ..Default::default()
            }),
            ..Default::default()
        }));

        let mut ctx = BuildContext::new(80, 443);
        run(&cache, &mut ctx);
        let dag = ctx.finalize();

        let vhost = dag
            .virtual_hosts()
            .iter()
            .find(|v| v.fqdn == "*")
            .expect("wildcard vhost");
        assert_eq!(vhost.routes.len(), 1);
        let route = vhost.routes.values().next().unwrap();
        assert_eq!(route.clusters[0].service.port, 8080);
    }

    #[test]
    fn scenario_s2_tls_host_with_secret() {
        let mut cache = ObjectCache::new(["default".to_owned()]);
        cache.insert(Object::Service(kuard_service()));
        cache.insert(Object::Secret(k8s_openapi::api::core::v1::Secret {
            metadata: ObjectMeta {
                namespace: Some("default".into()),
                name: Some("secret".into()),
                ..Default::default()
            },
            type_: Some("kubernetes.io/tls".into()),
            ..Default::default()
        }));
        cache.insert(Object::Ingress(Ingress {
            metadata: ObjectMeta {
                namespace: Some("default".into()),
                name: Some("kuard".into()),
                ..Default::default()
            },
            spec: Some(IngressSpec {
                tls: Some(vec![IngressTLS {
                    hosts: Some(vec!["kuard.example.com".into()]),
                    secret_name: Some("secret".into()),
                }]),
                rules: Some(vec![IngressRule {
                    host: Some("kuard.example.com".into()),
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            path: Some("/".into()),
                            path_type: "Prefix".into(),
                            backend: backend(8080),
                        }],
                    }),
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }));

        let mut ctx = BuildContext::new(80, 443);
        run(&cache, &mut ctx);
        let dag = ctx.finalize();

        assert!(dag.virtual_hosts().iter().any(|v| v.fqdn == "kuard.example.com"));
        let secure = dag
            .secure_virtual_hosts()
            .iter()
            .find(|v| v.fqdn == "kuard.example.com")
            .expect("secure vhost");
        assert_eq!(secure.secret.as_ref().unwrap().name, "secret");
    }

    #[test]
    fn allow_http_false_suppresses_cleartext() {
        let annotations: BTreeMap<String, String> =
            [("projectcontour.io/ingress.allow-http".to_owned(), "false".to_owned())]
                .into_iter()
                .collect();
        assert!(!annotations::allow_http(&annotations));
    }
}
