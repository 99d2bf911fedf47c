//! The top-level `Builder` (§2 "Control flow", §6 `Builder.Build()`):
//! wires the configured processors together over one [`ObjectCache`]
//! snapshot and produces an immutable [`Dag`] plus [`StatusMap`].
//!
//! `build` is infallible by design (§9 "there is no global mutable
//! state; `Builder.Build()` is a pure function of the immutable
//! snapshot plus config") — every fallible step along the way folds its
//! error into a `Status` rather than bubbling out of this function.

use crate::cache::ObjectCache;
use crate::context::BuildContext;
use crate::dag::Dag;
use crate::processors;
use crate::status::StatusMap;

/// External configuration threaded into a build: the root-namespace
/// restriction lives on the [`ObjectCache`] itself, so only the
/// listener ports and the optional cluster-wide fallback secret remain
/// here (§6 "a configuration surface with: root-namespace set, optional
/// cluster-wide fallback secret, default HTTP/HTTPS port numbers").
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub http_port: u16,
    pub https_port: u16,
    pub fallback_certificate: Option<(String, String)>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            http_port: 80,
            https_port: 443,
            fallback_certificate: None,
        }
    }
}

/// Borrows an [`ObjectCache`] for the duration of one build. A `Builder`
/// carries no state of its own between calls to [`Builder::build`] — two
/// builds over the same cache snapshot and config produce structurally
/// equal output (§5 "Ordering guarantees").
pub struct Builder<'a> {
    cache: &'a ObjectCache,
    config: BuilderConfig,
}

impl<'a> Builder<'a> {
    pub fn new(cache: &'a ObjectCache, config: BuilderConfig) -> Self {
        Self { cache, config }
    }

    /// Runs every processor in a fixed order over the cache snapshot,
    /// resolves FQDN collisions, computes orphan statuses for any
    /// root-kind object referenced by no valid root, and finalizes the
    /// listeners (§2 "Control flow").
    ///
    /// Processor order is fixed (Ingress, then IngressRoute, then
    /// HTTPProxy, then HTTPRoute) but doesn't affect the output: every
    /// processor only ever interns into shared, keyed collections on
    /// [`BuildContext`], so insertion order never leaks into the
    /// finished DAG (§4.4 "Tie-breaking and ordering").
    #[tracing::instrument(skip_all, level = "debug")]
    pub fn build(&self) -> (Dag, StatusMap) {
        let mut ctx = BuildContext::new(self.config.http_port, self.config.https_port)
            .with_fallback_secret(self.config.fallback_certificate.clone());

        tracing::debug!("running ingress processor");
        processors::run_ingress(self.cache, &mut ctx);
        tracing::debug!("running ingress_route processor");
        processors::run_ingress_route(self.cache, &mut ctx);
        tracing::debug!("running http_proxy processor");
        processors::run_http_proxy(self.cache, &mut ctx);
        tracing::debug!("running http_route processor");
        processors::run_http_route(self.cache, &mut ctx);

        let status = ctx.status.clone();
        let dag = ctx.finalize();
        (dag, status.into_map())
    }
}
