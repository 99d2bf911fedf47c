//! The BuildContext (§4 item 5): the mutable workspace a build fills in
//! as processors run, and the FQDN-uniqueness resolution that can only
//! happen once every root has been seen.

use std::collections::BTreeMap;

use crate::dag::{Dag, SecureVirtualHost, VirtualHost};
use crate::status::{ObjectKind, ObjectReference, StatusWriter};

/// One root object's claim on an FQDN, recorded as processors run so
/// collisions across kinds can be resolved after every root has been
/// seen (§8 invariant 3, §7 "Uniqueness").
#[derive(Debug, Clone)]
struct FqdnClaim {
    object: ObjectReference,
    /// Plural form used in the collision message (§8 S3), e.g.
    /// `"HTTPProxies"`.
    kind_plural: &'static str,
    /// Singular form used in the single-owner valid description, e.g.
    /// `"HTTPProxy"`.
    kind_singular: &'static str,
}

#[derive(Debug)]
pub struct BuildContext {
    pub status: StatusWriter,
    http_port: u16,
    https_port: u16,
    fallback_secret: Option<(String, String)>,
    vhosts: BTreeMap<String, VirtualHost>,
    secure_vhosts: BTreeMap<String, SecureVirtualHost>,
    fqdn_claims: BTreeMap<String, Vec<FqdnClaim>>,
}

impl BuildContext {
    pub fn new(http_port: u16, https_port: u16) -> Self {
        Self {
            status: StatusWriter::new(),
            http_port,
            https_port,
            fallback_secret: None,
            vhosts: BTreeMap::new(),
            secure_vhosts: BTreeMap::new(),
            fqdn_claims: BTreeMap::new(),
        }
    }

    pub fn with_fallback_secret(mut self, secret: Option<(String, String)>) -> Self {
        self.fallback_secret = secret;
        self
    }

    pub fn fallback_secret(&self) -> Option<(&str, &str)> {
        self.fallback_secret
            .as_ref()
            .map(|(ns, name)| (ns.as_str(), name.as_str()))
    }

    pub fn vhost_mut(&mut self, fqdn: &str) -> &mut VirtualHost {
        self.vhosts
            .entry(fqdn.to_owned())
            .or_insert_with(|| VirtualHost::new(fqdn))
    }

    pub fn secure_vhost_mut(&mut self, fqdn: &str) -> &mut SecureVirtualHost {
        self.secure_vhosts
            .entry(fqdn.to_owned())
            .or_insert_with(|| SecureVirtualHost::new(fqdn))
    }

    pub fn has_vhost(&self, fqdn: &str) -> bool {
        self.vhosts.contains_key(fqdn)
    }

    pub fn has_secure_vhost(&self, fqdn: &str) -> bool {
        self.secure_vhosts.contains_key(fqdn)
    }

    /// Records that `object` (a root of kind `kind_singular`/`kind_plural`,
    /// e.g. `"HTTPProxy"`/`"HTTPProxies"`) claims `fqdn`. Claims are
    /// reconciled once, in [`BuildContext::finalize`]; a root that turns
    /// out to share its FQDN with another root is invalidated there, not
    /// here, since the full contributor set isn't known until every
    /// processor has run.
    pub fn claim_fqdn(
        &mut self,
        fqdn: &str,
        object: ObjectReference,
        kind_singular: &'static str,
        kind_plural: &'static str,
    ) {
        self.fqdn_claims.entry(fqdn.to_owned()).or_default().push(FqdnClaim {
            object,
            kind_plural,
            kind_singular,
        });
    }

    /// Resolves FQDN collisions, drops the vhosts of every invalidated
    /// root, and assembles the listeners. Returns the finished [`Dag`];
    /// status commits for collided roots happen here since the
    /// contributor list can only be known after every processor ran.
    pub fn finalize(mut self) -> Dag {
        for (fqdn, claims) in &self.fqdn_claims {
            if claims.len() > 1 {
                let mut names: Vec<String> = claims.iter().map(|c| c.object.to_string()).collect();
                names.sort();
                let kind_plural = claims[0].kind_plural;
                let description = format!(
                    "fqdn \"{fqdn}\" is used in multiple {kind_plural}: {}",
                    names.join(", ")
                );
                for claim in claims {
                    let mut writer = self.status.for_object(claim.object.clone());
                    writer.set_invalid(description.clone());
                }
                self.vhosts.remove(fqdn);
                self.secure_vhosts.remove(fqdn);
            } else if let [claim] = claims.as_slice() {
                let mut writer = self.status.for_object(claim.object.clone());
                writer.set_valid(format!("valid {}", claim.kind_singular), Some(fqdn.clone()));
            }
        }

        let mut dag = Dag::new(self.http_port, self.https_port);
        dag.set_virtual_hosts(
            self.vhosts
                .into_values()
                .filter(VirtualHost::is_valid)
                .collect(),
        );
        dag.set_secure_virtual_hosts(
            self.secure_vhosts
                .into_values()
                .filter(SecureVirtualHost::is_valid)
                .collect(),
        );
        dag
    }
}

/// Builds the [`ObjectReference`] a processor uses to scope its status
/// writer, from the kind and the object's own namespace/name.
pub fn object_reference(kind: ObjectKind, namespace: &str, name: &str) -> ObjectReference {
    ObjectReference::new(kind, namespace, name)
}
