//! Certificate-delegation and SNI validators (§4.5).

use crate::cache::ObjectCache;

/// A secret referenced from a namespace other than its own is
/// permitted iff a delegation object in the secret's namespace lists
/// the consumer's namespace (or `*`) and the secret's name.
pub fn certificate_delegation_permitted(
    cache: &ObjectCache,
    secret_namespace: &str,
    secret_name: &str,
    consumer_namespace: &str,
) -> bool {
    if secret_namespace == consumer_namespace {
        return true;
    }
    cache.lookup_delegations(secret_namespace).any(|d| {
        d.spec.delegations.iter().any(|deleg| {
            deleg.secret_name == secret_name
                && deleg
                    .target_namespaces
                    .iter()
                    .any(|ns| ns == "*" || ns == consumer_namespace)
        })
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FallbackCertificateError {
    #[error("fallback certificate is enabled but no cluster-wide fallback secret is configured")]
    NotConfigured,
    #[error("fallback certificate is incompatible with client certificate validation")]
    IncompatibleWithClientValidation,
}

/// A root may enable the cluster-wide fallback certificate iff one is
/// configured and client-certificate validation is not also enabled on
/// the same vhost (§4.4).
pub fn validate_fallback_certificate(
    fallback_secret_configured: bool,
    client_validation_enabled: bool,
) -> Result<(), FallbackCertificateError> {
    if client_validation_enabled {
        return Err(FallbackCertificateError::IncompatibleWithClientValidation);
    }
    if !fallback_secret_configured {
        return Err(FallbackCertificateError::NotConfigured);
    }
    Ok(())
}

/// SNI is derived from a header rewrite if present, else from the
/// service's `externalName`, else from the service name itself (§9
/// GLOSSARY "SNI").
pub fn determine_sni<'a>(
    host_rewrite: Option<&'a str>,
    external_name: Option<&'a str>,
    service_name: &'a str,
) -> &'a str {
    host_rewrite.or(external_name).unwrap_or(service_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ObjectCache;
    use crate::resource::{CertificateDelegation, TlsCertificateDelegation, TlsCertificateDelegationSpec};
    use kube::api::ObjectMeta;

    fn cache_with_delegation() -> ObjectCache {
        let mut cache = ObjectCache::new(["roots".to_owned()]);
        cache.insert(crate::cache::Object::TlsCertificateDelegation(
            TlsCertificateDelegation {
                metadata: ObjectMeta {
                    namespace: Some("heptio-contour".into()),
                    name: Some("delegation".into()),
                    ..Default::default()
                },
                spec: TlsCertificateDelegationSpec {
                    delegations: vec![CertificateDelegation {
                        secret_name: "default-ssl-cert".into(),
                        target_namespaces: vec!["roots".into()],
                    }],
                },
            },
        ));
        cache
    }

    #[test]
    fn scenario_s6_denied_without_delegation() {
        let cache = ObjectCache::new(["roots".to_owned()]);
        assert!(!certificate_delegation_permitted(
            &cache,
            "heptio-contour",
            "default-ssl-cert",
            "roots"
        ));
    }

    #[test]
    fn permitted_with_matching_delegation() {
        let cache = cache_with_delegation();
        assert!(certificate_delegation_permitted(
            &cache,
            "heptio-contour",
            "default-ssl-cert",
            "roots"
        ));
    }

    #[test]
    fn same_namespace_never_needs_delegation() {
        let cache = ObjectCache::new(["roots".to_owned()]);
        assert!(certificate_delegation_permitted(
            &cache, "roots", "cert", "roots"
        ));
    }

    #[test]
    fn fallback_cert_requires_config_and_excludes_client_validation() {
        assert_eq!(
            validate_fallback_certificate(false, false),
            Err(FallbackCertificateError::NotConfigured)
        );
        assert_eq!(
            validate_fallback_certificate(true, true),
            Err(FallbackCertificateError::IncompatibleWithClientValidation)
        );
        assert_eq!(validate_fallback_certificate(true, false), Ok(()));
    }

    #[test]
    fn sni_prefers_header_rewrite_then_external_name_then_service_name() {
        assert_eq!(determine_sni(Some("a"), Some("b"), "c"), "a");
        assert_eq!(determine_sni(None, Some("b"), "c"), "b");
        assert_eq!(determine_sni(None, None, "c"), "c");
    }
}
