//! The Object Cache (§4.1): an in-memory snapshot of cluster objects,
//! keyed by `(kind, namespace, name)`, with typed lookups the processors
//! use to resolve cross-references.

use std::collections::{BTreeMap, BTreeSet};

use k8s_openapi::api::core::v1::{Secret, Service, ServicePort};
use k8s_openapi::api::networking::v1::Ingress;

use crate::resource::{
    namespaced_name, ExtensionService, HttpProxy, HttpRoute, IngressRoute, NamespacedName,
    TlsCertificateDelegation,
};

/// Any object kind the cache accepts.
#[derive(Debug, Clone)]
pub enum Object {
    Ingress(Ingress),
    IngressRoute(IngressRoute),
    HttpProxy(HttpProxy),
    HttpRoute(HttpRoute),
    Service(Service),
    Secret(Secret),
    TlsCertificateDelegation(TlsCertificateDelegation),
    ExtensionService(ExtensionService),
}

impl Object {
    fn namespace(&self) -> &str {
        let meta = match self {
            Object::Ingress(o) => &o.metadata,
            Object::IngressRoute(o) => &o.metadata,
            Object::HttpProxy(o) => &o.metadata,
            Object::HttpRoute(o) => &o.metadata,
            Object::Service(o) => &o.metadata,
            Object::Secret(o) => &o.metadata,
            Object::TlsCertificateDelegation(o) => &o.metadata,
            Object::ExtensionService(o) => &o.metadata,
        };
        meta.namespace.as_deref().unwrap_or_default()
    }

    fn name(&self) -> &str {
        let meta = match self {
            Object::Ingress(o) => &o.metadata,
            Object::IngressRoute(o) => &o.metadata,
            Object::HttpProxy(o) => &o.metadata,
            Object::HttpRoute(o) => &o.metadata,
            Object::Service(o) => &o.metadata,
            Object::Secret(o) => &o.metadata,
            Object::TlsCertificateDelegation(o) => &o.metadata,
            Object::ExtensionService(o) => &o.metadata,
        };
        meta.name.as_deref().unwrap_or_default()
    }

    fn key(&self) -> NamespacedName {
        namespaced_name(self.namespace(), self.name())
    }
}

/// How a backend port is addressed, mirroring the three ways a CRD
/// `services[].port` field or an Ingress backend can specify one.
#[derive(Debug, Clone)]
pub enum PortQuery {
    Number(u16),
    Name(String),
}

impl PortQuery {
    pub fn from_int_or_string(v: &k8s_openapi::apimachinery::pkg::util::intstr::IntOrString) -> Self {
        use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
        match v {
            IntOrString::Int(n) => PortQuery::Number(*n as u16),
            IntOrString::String(s) => PortQuery::Name(s.clone()),
        }
    }
}

/// Resolves a service port descriptor by the cache's three-way rule: a
/// numeric query matches `port`, a name matches `name`, and a
/// stringified integer falls back to matching `port` numerically
/// (§4.1).
fn resolve_port<'a>(ports: &'a [ServicePort], query: &PortQuery) -> Option<&'a ServicePort> {
    match query {
        PortQuery::Number(n) => ports.iter().find(|p| p.port == i32::from(*n)),
        PortQuery::Name(s) => {
            if let Some(p) = ports.iter().find(|p| p.name.as_deref() == Some(s.as_str())) {
                return Some(p);
            }
            if let Ok(n) = s.parse::<i32>() {
                return ports.iter().find(|p| p.port == n);
            }
            None
        }
    }
}

fn changed<T: PartialEq>(old: Option<T>, new: &T) -> bool {
    match old {
        None => true,
        Some(old) => &old != new,
    }
}

#[derive(Debug, Default)]
pub struct ObjectCache {
    root_namespaces: BTreeSet<String>,

    ingresses: BTreeMap<NamespacedName, Ingress>,
    ingress_routes: BTreeMap<NamespacedName, IngressRoute>,
    http_proxies: BTreeMap<NamespacedName, HttpProxy>,
    http_routes: BTreeMap<NamespacedName, HttpRoute>,
    services: BTreeMap<NamespacedName, Service>,
    secrets: BTreeMap<NamespacedName, Secret>,
    delegations: BTreeMap<NamespacedName, TlsCertificateDelegation>,
    extension_services: BTreeMap<NamespacedName, ExtensionService>,
}

impl ObjectCache {
    pub fn new(root_namespaces: impl IntoIterator<Item = String>) -> Self {
        Self {
            root_namespaces: root_namespaces.into_iter().collect(),
            ..Default::default()
        }
    }

    /// A root CRD (one declaring a virtual host) is only a valid entry
    /// point when its namespace is in the configured root set (§4.1).
    pub fn is_allowed_root_namespace(&self, namespace: &str) -> bool {
        self.root_namespaces.contains(namespace)
    }

    /// Inserts an object, returning whether the snapshot changed (the
    /// object is new, or differs from what was previously stored under
    /// the same identity). Inserting an unchanged object twice leaves
    /// the cache — and so the next build's DAG — unchanged (§8
    /// invariant 2).
    pub fn insert(&mut self, object: Object) -> bool {
        let key = object.key();
        match object {
            Object::Ingress(o) => changed(self.ingresses.insert(key, o.clone()), &o),
            Object::IngressRoute(o) => changed(self.ingress_routes.insert(key, o.clone()), &o),
            Object::HttpProxy(o) => changed(self.http_proxies.insert(key, o.clone()), &o),
            Object::HttpRoute(o) => changed(self.http_routes.insert(key, o.clone()), &o),
            Object::Service(o) => changed(self.services.insert(key, o.clone()), &o),
            Object::Secret(o) => changed(self.secrets.insert(key, o.clone()), &o),
            Object::TlsCertificateDelegation(o) => {
                changed(self.delegations.insert(key, o.clone()), &o)
            }
            Object::ExtensionService(o) => {
                changed(self.extension_services.insert(key, o.clone()), &o)
            }
        }
    }

    /// Removes an object by kind + identity, returning whether it was
    /// present.
    pub fn remove(&mut self, kind: ObjectRefKind, namespace: &str, name: &str) -> bool {
        let key = namespaced_name(namespace, name);
        match kind {
            ObjectRefKind::Ingress => self.ingresses.remove(&key).is_some(),
            ObjectRefKind::IngressRoute => self.ingress_routes.remove(&key).is_some(),
            ObjectRefKind::HttpProxy => self.http_proxies.remove(&key).is_some(),
            ObjectRefKind::HttpRoute => self.http_routes.remove(&key).is_some(),
            ObjectRefKind::Service => self.services.remove(&key).is_some(),
            ObjectRefKind::Secret => self.secrets.remove(&key).is_some(),
            ObjectRefKind::TlsCertificateDelegation => self.delegations.remove(&key).is_some(),
            ObjectRefKind::ExtensionService => self.extension_services.remove(&key).is_some(),
        }
    }

    pub fn ingresses(&self) -> impl Iterator<Item = &Ingress> {
        self.ingresses.values()
    }

    pub fn ingress_routes(&self) -> impl Iterator<Item = &IngressRoute> {
        self.ingress_routes.values()
    }

    pub fn http_proxies(&self) -> impl Iterator<Item = &HttpProxy> {
        self.http_proxies.values()
    }

    pub fn http_routes(&self) -> impl Iterator<Item = &HttpRoute> {
        self.http_routes.values()
    }

    pub fn get_ingress_route(&self, namespace: &str, name: &str) -> Option<&IngressRoute> {
        self.ingress_routes.get(&namespaced_name(namespace, name))
    }

    pub fn get_http_proxy(&self, namespace: &str, name: &str) -> Option<&HttpProxy> {
        self.http_proxies.get(&namespaced_name(namespace, name))
    }

    pub fn lookup_service(
        &self,
        namespace: &str,
        name: &str,
        port: &PortQuery,
    ) -> Option<(&Service, &ServicePort)> {
        let svc = self.services.get(&namespaced_name(namespace, name))?;
        let ports = svc.spec.as_ref()?.ports.as_deref().unwrap_or_default();
        let port = resolve_port(ports, port)?;
        Some((svc, port))
    }

    pub fn lookup_secret(&self, namespace: &str, name: &str) -> Option<&Secret> {
        self.secrets.get(&namespaced_name(namespace, name))
    }

    /// All delegations declared in `secret_namespace`, used to check
    /// whether a consumer namespace may reference a secret that lives
    /// there (§4.5).
    pub fn lookup_delegations(
        &self,
        secret_namespace: &str,
    ) -> impl Iterator<Item = &TlsCertificateDelegation> {
        self.delegations
            .values()
            .filter(move |d| d.metadata.namespace.as_deref() == Some(secret_namespace))
    }

    pub fn lookup_extension_cluster(&self, namespace: &str, name: &str) -> Option<&ExtensionService> {
        self.extension_services.get(&namespaced_name(namespace, name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRefKind {
    Ingress,
    IngressRoute,
    HttpProxy,
    HttpRoute,
    Service,
    Secret,
    TlsCertificateDelegation,
    ExtensionService,
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn service(ports: Vec<ServicePort>) -> Service {
        Service {
            metadata: ObjectMeta {
                namespace: Some("default".into()),
                name: Some("kuard".into()),
                ..Default::default()
            },
            spec: Some(k8s_openapi::api::core::v1::ServiceSpec {
                ports: Some(ports),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn port(name: Option<&str>, number: i32) -> ServicePort {
        ServicePort {
            name: name.map(str::to_owned),
            port: number,
            ..Default::default()
        }
    }

    #[test]
    fn resolves_port_by_number_name_or_stringified_number() {
        let svc = service(vec![port(Some("http"), 8080)]);
        let ports = svc.spec.as_ref().unwrap().ports.as_deref().unwrap();

        assert!(resolve_port(ports, &PortQuery::Number(8080)).is_some());
        assert!(resolve_port(ports, &PortQuery::Name("http".into())).is_some());
        assert!(resolve_port(ports, &PortQuery::Name("8080".into())).is_some());
        assert!(resolve_port(ports, &PortQuery::Name("nope".into())).is_none());
    }

    #[test]
    fn insert_idempotence() {
        let mut cache = ObjectCache::new(["roots".to_owned()]);
        assert!(cache.insert(Object::Service(service(vec![port(Some("http"), 8080)]))));
        assert!(!cache.insert(Object::Service(service(vec![port(Some("http"), 8080)]))));
    }

    #[test]
    fn root_namespace_restriction() {
        let cache = ObjectCache::new(["roots".to_owned()]);
        assert!(cache.is_allowed_root_namespace("roots"));
        assert!(!cache.is_allowed_root_namespace("default"));
    }
}
