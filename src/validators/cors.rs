//! CORS policy validation (§4.5).

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::dag::CorsPolicy;
use crate::resource::CorsPolicy as CorsPolicySpec;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorsError {
    #[error("CORS allow-origins must not be empty")]
    EmptyAllowOrigins,
    #[error("CORS allow-methods must not be empty")]
    EmptyAllowMethods,
    #[error("CORS allow-origin {0:?} is not \"*\", a fully-qualified URI, or a valid regex")]
    InvalidOrigin(String),
    #[error("CORS max-age {0:?} is not a valid non-negative duration")]
    InvalidMaxAge(String),
}

static SCHEME_HOST_PORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://[^/]+$").unwrap());

fn is_valid_origin(origin: &str) -> bool {
    if origin == "*" {
        return true;
    }
    if SCHEME_HOST_PORT.is_match(origin) {
        return true;
    }
    Regex::new(origin).is_ok()
}

/// Validates a CORS policy's wire representation into the DAG's
/// resolved form: allowed origins are `*`, fully-qualified URIs
/// (`scheme://host[:port]`), or regular expressions; allow-methods and
/// allow-origins must both be non-empty; `max-age` parses as a
/// non-negative duration.
pub fn validate(spec: &CorsPolicySpec) -> Result<CorsPolicy, CorsError> {
    if spec.allow_origin.is_empty() {
        return Err(CorsError::EmptyAllowOrigins);
    }
    if spec.allow_methods.is_empty() {
        return Err(CorsError::EmptyAllowMethods);
    }
    for origin in &spec.allow_origin {
        if !is_valid_origin(origin) {
            return Err(CorsError::InvalidOrigin(origin.clone()));
        }
    }
    let max_age = match &spec.max_age {
        None => None,
        Some(s) => match crate::duration::parse_strict(s) {
            Ok(d) => Some(d),
            Err(_) if s == "0" || s.is_empty() => Some(std::time::Duration::ZERO),
            Err(_) => return Err(CorsError::InvalidMaxAge(s.clone())),
        },
    };

    Ok(CorsPolicy {
        allow_origin: spec.allow_origin.clone(),
        allow_methods: spec.allow_methods.clone(),
        allow_headers: spec.allow_headers.clone(),
        allow_credentials: spec.allow_credentials,
        max_age,
    })
}
