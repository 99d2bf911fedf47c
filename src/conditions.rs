//! Condition Algebra (§4.3): merges path/header/query-parameter match
//! conditions along an inclusion chain, and the two duplicate checks
//! that guard it — the per-route duplicate-header rule and the
//! per-parent include-overlap rule.

use std::collections::BTreeSet;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConditionError {
    #[error("route: prefix conditions must start with /, {0} was supplied")]
    PrefixMustStartWithSlash(String),
    #[error("route: more than one prefix is not allowed in a single condition block")]
    MultiplePrefixes,
    #[error(
        "the path prefix \"{child}\" does not match the parent's path prefix \"{parent}\""
    )]
    NotAPathPrefix { parent: String, child: String },
    #[error("duplicate conditions defined on an include")]
    DuplicateInclude,
    #[error("cannot specify duplicate header \"{0}\" with the same exact match value")]
    DuplicateHeader(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum HeaderMatch {
    Present,
    Exact(String),
    NotExact(String),
    Contains(String),
    NotContains(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct HeaderCondition {
    pub name: String,
    pub op: HeaderMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum QueryMatch {
    Present,
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct QueryCondition {
    pub name: String,
    pub op: QueryMatch,
}

/// The match conditions contributed by one object on the delegation
/// chain: a path fragment plus header/query aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchConditions {
    /// Empty means "no prefix condition was declared here"; the merge
    /// step defaults an empty overall path to `/`.
    pub prefix: Option<String>,
    pub headers: Vec<HeaderCondition>,
    pub query_params: Vec<QueryCondition>,
}

impl MatchConditions {
    pub fn is_empty(&self) -> bool {
        self.prefix.is_none() && self.headers.is_empty() && self.query_params.is_empty()
    }

    /// Validates a single condition block: at most one prefix, and it
    /// must start with `/`.
    pub fn validate(&self) -> Result<(), ConditionError> {
        if let Some(p) = &self.prefix {
            if !p.starts_with('/') {
                return Err(ConditionError::PrefixMustStartWithSlash(p.clone()));
            }
        }
        Ok(())
    }
}

/// Joins a parent path and a child path fragment on a single slash,
/// collapsing the boundary so `/foo` + `/bar` => `/foo/bar` and never
/// `/foo//bar`.
pub fn join_path(parent: &str, child: &str) -> String {
    let parent = parent.strip_suffix('/').unwrap_or(parent);
    let child = child.strip_prefix('/').unwrap_or(child);
    if child.is_empty() {
        if parent.is_empty() {
            "/".to_owned()
        } else {
            parent.to_owned()
        }
    } else if parent.is_empty() {
        format!("/{child}")
    } else {
        format!("{parent}/{child}")
    }
}

/// Path-prefix-of check at component boundaries: `/foo` is a path
/// prefix of `/foo/bar` but not of `/foobar` (§4.3, §8 invariant 5).
pub fn is_path_prefix_of(ancestor: &str, descendant: &str) -> bool {
    if ancestor == "/" {
        return descendant.starts_with('/');
    }
    if !descendant.starts_with(ancestor) {
        return false;
    }
    match descendant.as_bytes().get(ancestor.len()) {
        None => true,
        Some(b'/') => true,
        _ => false,
    }
}

/// Validates that a child's stated prefix is a path-prefix extension of
/// its parent's (legacy `IngressRoute` delegation — §8 S5).
pub fn validate_delegate_prefix(parent: &str, child: &str) -> Result<(), ConditionError> {
    if is_path_prefix_of(parent, child) {
        Ok(())
    } else {
        Err(ConditionError::NotAPathPrefix {
            parent: parent.to_owned(),
            child: child.to_owned(),
        })
    }
}

/// Merges one step of an `HTTPProxy` inclusion chain: concatenates
/// paths, unions header/query aggregates.
pub fn merge(parent: &MatchConditions, child: &MatchConditions) -> MatchConditions {
    let prefix = match (&parent.prefix, &child.prefix) {
        (None, None) => None,
        (Some(p), None) => Some(p.clone()),
        (None, Some(c)) => Some(c.clone()),
        (Some(p), Some(c)) => Some(join_path(p, c)),
    };
    let mut headers = parent.headers.clone();
    for h in &child.headers {
        if !headers.contains(h) {
            headers.push(h.clone());
        }
    }
    let mut query_params = parent.query_params.clone();
    for q in &child.query_params {
        if !query_params.contains(q) {
            query_params.push(q.clone());
        }
    }
    MatchConditions {
        prefix,
        headers,
        query_params,
    }
}

/// Folds a full root-to-leaf chain of condition blocks into one merged
/// set, defaulting the path to `/` if nothing on the chain set one.
pub fn merge_chain<'a>(chain: impl IntoIterator<Item = &'a MatchConditions>) -> MatchConditions {
    let mut acc = MatchConditions::default();
    for c in chain {
        acc = merge(&acc, c);
    }
    if acc.prefix.is_none() {
        acc.prefix = Some("/".to_owned());
    }
    acc
}

/// The per-route duplicate-header rule: no two header conditions may
/// share a name and the same exact-match value (§4.3).
pub fn validate_no_duplicate_headers(headers: &[HeaderCondition]) -> Result<(), ConditionError> {
    let mut seen: BTreeSet<(&str, &str)> = BTreeSet::new();
    for h in headers {
        if let HeaderMatch::Exact(v) = &h.op {
            if !seen.insert((h.name.as_str(), v.as_str())) {
                return Err(ConditionError::DuplicateHeader(h.name.clone()));
            }
        }
    }
    Ok(())
}

/// The per-parent include-overlap rule: two include blocks on one
/// `HTTPProxy` must not merge to an identical (path, header-set,
/// query-set) tuple. Empty aggregates never count as duplicates of
/// anything.
pub fn includes_identical(a: &MatchConditions, b: &MatchConditions) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.prefix != b.prefix {
        return false;
    }
    let a_headers: BTreeSet<_> = a.headers.iter().collect();
    let b_headers: BTreeSet<_> = b.headers.iter().collect();
    if a_headers != b_headers {
        return false;
    }
    let a_query: BTreeSet<_> = a.query_params.iter().collect();
    let b_query: BTreeSet<_> = b.query_params.iter().collect();
    a_query == b_query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_path_collapses_slash_boundary() {
        assert_eq!(join_path("/foo", "/bar"), "/foo/bar");
        assert_eq!(join_path("/foo/", "/bar"), "/foo/bar");
        assert_eq!(join_path("/foo", ""), "/foo");
        assert_eq!(join_path("", "/bar"), "/bar");
    }

    #[test]
    fn path_prefix_is_component_bounded() {
        assert!(is_path_prefix_of("/foo", "/foo/bar"));
        assert!(!is_path_prefix_of("/foo", "/foobar"));
        assert!(is_path_prefix_of("/foo", "/foo"));
    }

    #[test]
    fn scenario_s5_prefix_mismatch() {
        let err = validate_delegate_prefix("/prefix", "/doesnotmatch").unwrap_err();
        assert_eq!(
            err,
            ConditionError::NotAPathPrefix {
                parent: "/prefix".into(),
                child: "/doesnotmatch".into()
            }
        );
    }

    #[test]
    fn duplicate_exact_header_is_rejected_but_not_exact_is_allowed() {
        let dup = vec![
            HeaderCondition {
                name: "x-env".into(),
                op: HeaderMatch::Exact("prod".into()),
            },
            HeaderCondition {
                name: "x-env".into(),
                op: HeaderMatch::Exact("prod".into()),
            },
        ];
        assert!(validate_no_duplicate_headers(&dup).is_err());

        let ok = vec![
            HeaderCondition {
                name: "x-env".into(),
                op: HeaderMatch::NotExact("prod".into()),
            },
            HeaderCondition {
                name: "x-env".into(),
                op: HeaderMatch::NotExact("staging".into()),
            },
        ];
        assert!(validate_no_duplicate_headers(&ok).is_ok());
    }

    #[test]
    fn empty_aggregates_never_duplicate() {
        let empty = MatchConditions::default();
        assert!(!includes_identical(&empty, &empty));
    }

    #[test]
    fn identical_merged_includes_are_flagged() {
        let a = MatchConditions {
            prefix: Some("/foo".into()),
            ..Default::default()
        };
        let b = a.clone();
        assert!(includes_identical(&a, &b));
    }
}
