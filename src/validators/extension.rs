//! External-authorization extension-service reference validation
//! (§4.5).

use thiserror::Error;

use crate::cache::ObjectCache;
use crate::dag::ExtensionCluster;
use crate::duration::Timeout;
use crate::resource::{AuthorizationConfig, EXTENSION_SERVICE_API_VERSION};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtensionError {
    #[error("invalid apiVersion {0:?} for authorization extension reference")]
    UnknownApiVersion(String),
    #[error("extension service \"{0}\" not found")]
    NotFound(String),
}

/// Resolves an `Authorization.ExtensionRef` into an [`ExtensionCluster`]:
/// the api-version must equal the one known tag, namespace+name must
/// resolve to an `ExtensionService`, and the effective timeout comes
/// from the referencing field if it parses, else from the
/// `ExtensionService`'s own timeout policy (§4.5).
pub fn resolve(
    cache: &ObjectCache,
    default_namespace: &str,
    auth: &AuthorizationConfig,
) -> Result<ExtensionCluster, ExtensionError> {
    let api_version = auth
        .extension_ref
        .api_version
        .as_deref()
        .unwrap_or(EXTENSION_SERVICE_API_VERSION);
    if api_version != EXTENSION_SERVICE_API_VERSION {
        return Err(ExtensionError::UnknownApiVersion(api_version.to_owned()));
    }

    let namespace = auth
        .extension_ref
        .namespace
        .as_deref()
        .unwrap_or(default_namespace);
    let name = &auth.extension_ref.name;
    let ext = cache
        .lookup_extension_cluster(namespace, name)
        .ok_or_else(|| ExtensionError::NotFound(format!("{namespace}/{name}")))?;

    let response_timeout = auth
        .response_timeout
        .as_deref()
        .map(crate::duration::parse)
        .unwrap_or_else(|| {
            ext.spec
                .timeout_policy
                .as_ref()
                .and_then(|t| t.response.as_deref())
                .map(crate::duration::parse)
                .unwrap_or(Timeout::Disabled)
        });

    Ok(ExtensionCluster {
        namespace: namespace.to_owned(),
        name: name.clone(),
        response_timeout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Object, ObjectCache};
    use crate::resource::{ExtensionServiceRef, ExtensionServiceSpec, ExtensionServiceTarget};
    use kube::api::ObjectMeta;

    fn cache_with_ext() -> ObjectCache {
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
                    port: k8s_openapi::apimachinery::pkg::util::intstr::IntOrString::Int(9001),
                }],
                timeout_policy: None,
                protocol: None,
            },
            status: None,
        }));
        cache
    }

    #[test]
    fn rejects_unknown_api_version() {
        let cache = cache_with_ext();
        let auth = AuthorizationConfig {
            extension_ref: ExtensionServiceRef {
                api_version: Some("bogus/v1".into()),
                namespace: Some("projectcontour-auth".into()),
                name: "authorizer".into(),
            },
            response_timeout: None,
            fail_open: false,
        };
        assert!(matches!(
            resolve(&cache, "default", &auth),
            Err(ExtensionError::UnknownApiVersion(_))
        ));
    }

    #[test]
    fn resolves_with_known_api_version() {
        let cache = cache_with_ext();
        let auth = AuthorizationConfig {
            extension_ref: ExtensionServiceRef {
                api_version: None,
                namespace: Some("projectcontour-auth".into()),
                name: "authorizer".into(),
            },
            response_timeout: None,
            fail_open: false,
        };
        let resolved = resolve(&cache, "default", &auth).unwrap();
        assert_eq!(resolved.namespace, "projectcontour-auth");
    }
}
