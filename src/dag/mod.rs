//! The DAG Assembler (§4.6): finalizes a build into two listener
//! vertices with sorted virtual-host lists, and a deterministic visitor.

mod vertex;

pub use vertex::{
    Cluster, ConnectionLimits, CorsPolicy, ExtensionCluster, HealthCheck, Protocol,
    RateLimitPolicy, RetryPolicy, Route, SecretRef, SecureVirtualHost, ServiceRef, SlowStart,
    TcpProxy, TlsVersion, UpstreamValidation, VirtualHost,
};

/// A single vertex emitted by [`Dag::visit`]. Each vertex is yielded
/// exactly once, in a deterministic order (§4.6, §8 invariant 1).
pub enum Vertex<'a> {
    Listener { port: u16 },
    VirtualHost(&'a VirtualHost),
    SecureVirtualHost(&'a SecureVirtualHost),
}

/// The build's immutable, read-only output: two listeners — port 80 for
/// plain virtual hosts, port 443 for TLS-terminated ones — each holding
/// its valid virtual hosts sorted by FQDN ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dag {
    pub http_port: u16,
    pub https_port: u16,
    virtual_hosts: Vec<VirtualHost>,
    secure_virtual_hosts: Vec<SecureVirtualHost>,
}

impl Dag {
    pub fn new(http_port: u16, https_port: u16) -> Self {
        Self {
            http_port,
            https_port,
            virtual_hosts: Vec::new(),
            secure_virtual_hosts: Vec::new(),
        }
    }

    pub fn set_virtual_hosts(&mut self, mut vhosts: Vec<VirtualHost>) {
        vhosts.sort_by(|a, b| a.fqdn.cmp(&b.fqdn));
        self.virtual_hosts = vhosts;
    }

    pub fn set_secure_virtual_hosts(&mut self, mut vhosts: Vec<SecureVirtualHost>) {
        vhosts.sort_by(|a, b| a.fqdn.cmp(&b.fqdn));
        self.secure_virtual_hosts = vhosts;
    }

    pub fn virtual_hosts(&self) -> &[VirtualHost] {
        &self.virtual_hosts
    }

    pub fn secure_virtual_hosts(&self) -> &[SecureVirtualHost] {
        &self.secure_virtual_hosts
    }

    /// Visits every vertex exactly once: the port-80 listener, then its
    /// virtual hosts in FQDN order, then the port-443 listener, then its
    /// secure virtual hosts in FQDN order.
    pub fn visit<F: FnMut(Vertex<'_>)>(&self, mut f: F) {
        f(Vertex::Listener {
            port: self.http_port,
        });
        for vhost in &self.virtual_hosts {
            f(Vertex::VirtualHost(vhost));
        }
        f(Vertex::Listener {
            port: self.https_port,
        });
        for vhost in &self.secure_virtual_hosts {
            f(Vertex::SecureVirtualHost(vhost));
        }
    }
}
