#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

//! An ingress directed-acyclic-graph builder: given a snapshot of
//! cluster objects (`Ingress`, `IngressRoute`, `HTTPProxy`, `HTTPRoute`,
//! `Service`, `Secret`, certificate delegations and extension-service
//! references), [`Builder::build`] produces a validated, deterministic
//! [`Dag`] plus a per-object [`StatusMap`].
//!
//! The crate is organized leaves-first:
//! - [`cache`] — the snapshot processors read from.
//! - [`annotations`] and [`duration`] — annotation decoding.
//! - [`conditions`] — path/header/query-parameter match-condition algebra.
//! - [`resource`] — the typed wire objects (`k8s-openapi` types plus
//!   this crate's own CRDs).
//! - [`validators`] — policy validators used by more than one processor.
//! - [`processors`] — one module per source kind, each filling in a
//!   [`context::BuildContext`].
//! - [`dag`] — the finished, read-only output types.
//! - [`status`] — the write-once diagnostic sink and its public map type.
//! - [`builder`] — wires the above into `Builder::build`.

pub mod annotations;
mod builder;
pub mod cache;
pub mod conditions;
mod context;
pub mod dag;
pub mod duration;
mod processors;
pub mod resource;
pub mod status;
pub mod validators;

pub use builder::{Builder, BuilderConfig};
pub use cache::{Object, ObjectCache, ObjectRefKind, PortQuery};
pub use dag::{Dag, Vertex};
pub use status::{ObjectKind, ObjectReference, Status, StatusMap, StatusState};
