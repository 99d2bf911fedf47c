//! The Annotation Decoder (§4.2): pure functions that parse legacy and
//! current annotation keys into typed policy fragments.
//!
//! Dual-prefix policy: `projectcontour.io/<key>` and
//! `contour.heptio.com/<key>` are both recognized; when both are present
//! on the same object, the current (`projectcontour.io/`) prefix wins.
//! This is deliberately the single place that walks the prefix list, so
//! the precedence rule can't drift between call sites (§9 DESIGN NOTES).

use std::collections::BTreeMap;

use crate::dag::TlsVersion;
use crate::duration::Timeout;

const CURRENT_PREFIX: &str = "projectcontour.io/";
const LEGACY_PREFIX: &str = "contour.heptio.com/";

fn lookup<'a>(annotations: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    annotations
        .get(&format!("{CURRENT_PREFIX}{key}"))
        .or_else(|| annotations.get(&format!("{LEGACY_PREFIX}{key}")))
        .map(String::as_str)
}

/// `ingress.allow-http=false` drops non-TLS routes for the Ingress.
/// Absent (or any value other than exactly `"false"`) means HTTP stays
/// allowed.
pub fn allow_http(annotations: &BTreeMap<String, String>) -> bool {
    lookup(annotations, "ingress.allow-http") != Some("false")
}

/// `force-ssl-redirect=true` marks every route of the Ingress with
/// `HTTPSUpgrade`.
pub fn force_ssl_redirect(annotations: &BTreeMap<String, String>) -> bool {
    lookup(annotations, "force-ssl-redirect") == Some("true")
}

/// `tls-minimum-protocol-version`; invalid values silently fall back to
/// 1.1 (handled inside `TlsVersion::parse_or_default`).
pub fn tls_minimum_protocol_version(annotations: &BTreeMap<String, String>) -> TlsVersion {
    lookup(annotations, "tls-minimum-protocol-version")
        .map(TlsVersion::parse_or_default)
        .unwrap_or_default()
}

/// `websocket-routes`: a comma-separated path list; spaces are trimmed
/// and empty tokens dropped.
pub fn websocket_routes(annotations: &BTreeMap<String, String>) -> Vec<String> {
    lookup(annotations, "websocket-routes")
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UpstreamProtocolKind {
    H2,
    H2c,
    Tls,
}

impl UpstreamProtocolKind {
    fn annotation_suffix(self) -> &'static str {
        match self {
            UpstreamProtocolKind::H2 => "upstream-protocol.h2",
            UpstreamProtocolKind::H2c => "upstream-protocol.h2c",
            UpstreamProtocolKind::Tls => "upstream-protocol.tls",
        }
    }
}

/// `upstream-protocol.{h2,h2c,tls}`: each a comma-separated list of port
/// names or port numbers to mark with that protocol.
pub fn upstream_protocol(annotations: &BTreeMap<String, String>) -> Vec<(UpstreamProtocolKind, String)> {
    let mut out = Vec::new();
    for kind in [
        UpstreamProtocolKind::H2,
        UpstreamProtocolKind::H2c,
        UpstreamProtocolKind::Tls,
    ] {
        if let Some(v) = lookup(annotations, kind.annotation_suffix()) {
            for token in v.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                out.push((kind, token.to_owned()));
            }
        }
    }
    out
}

/// `request-timeout`: a Go-style duration. Returns `None` when the
/// annotation isn't present at all (no override); `Some(Timeout)`
/// otherwise, where malformed values and the literal `"infinite"` both
/// map to `Timeout::Disabled` (§8 S7).
pub fn request_timeout(annotations: &BTreeMap<String, String>) -> Option<Timeout> {
    lookup(annotations, "request-timeout").map(crate::duration::parse)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionLimitAnnotations {
    pub max_connections: u32,
    pub max_pending_requests: u32,
    pub max_requests: u32,
    pub max_retries: u32,
}

/// Parses `max-connections` / `max-pending-requests` / `max-requests` /
/// `max-retries` to `u32`; negative values, non-numeric input, and
/// overflow all fall back to `0` (§4.2).
pub fn connection_limits(annotations: &BTreeMap<String, String>) -> ConnectionLimitAnnotations {
    ConnectionLimitAnnotations {
        max_connections: parse_nonneg_u32(lookup(annotations, "max-connections")),
        max_pending_requests: parse_nonneg_u32(lookup(annotations, "max-pending-requests")),
        max_requests: parse_nonneg_u32(lookup(annotations, "max-requests")),
        max_retries: parse_nonneg_u32(lookup(annotations, "max-retries")),
    }
}

fn parse_nonneg_u32(value: Option<&str>) -> u32 {
    value
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn current_prefix_wins_over_legacy() {
        let a = annotations(&[
            ("contour.heptio.com/force-ssl-redirect", "false"),
            ("projectcontour.io/force-ssl-redirect", "true"),
        ]);
        assert!(force_ssl_redirect(&a));
    }

    #[test]
    fn legacy_prefix_used_when_current_absent() {
        let a = annotations(&[("contour.heptio.com/force-ssl-redirect", "true")]);
        assert!(force_ssl_redirect(&a));
    }

    #[test]
    fn websocket_routes_trims_and_drops_empty() {
        let a = annotations(&[("projectcontour.io/websocket-routes", " /a, /b ,,/c")]);
        assert_eq!(websocket_routes(&a), vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn connection_limits_default_negative_and_overflow_to_zero() {
        let a = annotations(&[
            ("projectcontour.io/max-connections", "-1"),
            ("projectcontour.io/max-requests", "99999999999999999999"),
            ("projectcontour.io/max-retries", "3"),
        ]);
        let limits = connection_limits(&a);
        assert_eq!(limits.max_connections, 0);
        assert_eq!(limits.max_requests, 0);
        assert_eq!(limits.max_retries, 3);
        assert_eq!(limits.max_pending_requests, 0);
    }

    #[test]
    fn scenario_s7_request_timeout() {
        let a = annotations(&[("projectcontour.io/request-timeout", "1m30s")]);
        assert_eq!(
            request_timeout(&a),
            Some(Timeout::Duration(std::time::Duration::from_secs(90)))
        );

        let bad = annotations(&[("projectcontour.io/request-timeout", "peanut")]);
        assert_eq!(request_timeout(&bad), Some(Timeout::Disabled));

        let inf = annotations(&[("projectcontour.io/request-timeout", "infinite")]);
        assert_eq!(request_timeout(&inf), Some(Timeout::Disabled));
    }
}
