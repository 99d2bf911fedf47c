//! Per-object diagnostics (§4 item 6, §7, §9 "Status first-wins").
//!
//! Statuses are a write-once store keyed by object identity. A processor
//! gets a [`ObjectStatusWriter`] scoped to the object it's handling;
//! writing through it commits into the shared [`StatusMap`] exactly
//! once. Later writes for the same identity are dropped on the floor —
//! "the first committed status per object persists" (§7).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Identifies an object across kinds: an Ingress and an HTTPProxy with
/// the same `ns/name` must not collide in the status map (§"Supplemented
/// features" in SPEC_FULL.md — spec.md's `StatusMap[(namespace, name)]`
/// notation under-specifies this; DESIGN.md records the decision).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectReference {
    pub kind: ObjectKind,
    pub namespace: String,
    pub name: String,
}

impl ObjectReference {
    pub fn new(kind: ObjectKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    Ingress,
    IngressRoute,
    HttpProxy,
    HttpRoute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusState {
    Valid,
    Invalid,
    Orphaned,
}

impl StatusState {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusState::Valid => "valid",
            StatusState::Invalid => "invalid",
            StatusState::Orphaned => "orphaned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub object: ObjectReference,
    pub state: StatusState,
    pub description: String,
    pub vhost: Option<String>,
}

pub type StatusMap = BTreeMap<ObjectReference, Status>;

/// The build-wide, write-once status sink. Cloned (cheaply — it shares
/// the backing map through an `Rc<RefCell<_>>`) into every processor and
/// every scoped [`ObjectStatusWriter`] so a partial failure in one
/// subtree never clobbers a commit made elsewhere.
#[derive(Debug, Clone, Default)]
pub struct StatusWriter {
    inner: Rc<RefCell<StatusMap>>,
}

impl StatusWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scopes a writer to a single root-kind object. The returned
    /// [`ObjectStatusWriter`] inherits nothing from the parent context
    /// except the ability to commit into the same shared map — it is
    /// paired with object creation so a status commit function exists on
    /// every exit path, including early validation failures (§9 "scoped
    /// resource acquisition").
    pub fn for_object(&self, object: ObjectReference) -> ObjectStatusWriter {
        ObjectStatusWriter {
            shared: self.clone(),
            object,
            committed: false,
        }
    }

    fn commit(&self, status: Status) {
        // First-wins: never overwrite an existing entry for this identity.
        self.inner
            .borrow_mut()
            .entry(status.object.clone())
            .or_insert(status);
    }

    pub fn has_status(&self, object: &ObjectReference) -> bool {
        self.inner.borrow().contains_key(object)
    }

    pub fn into_map(self) -> StatusMap {
        Rc::try_unwrap(self.inner)
            .map(RefCell::into_inner)
            .unwrap_or_else(|rc| rc.borrow().clone())
    }
}

/// A single-use handle for committing the status of one object.
///
/// Cloning a writer (e.g. to hand a child route its own scope while
/// processing an inclusion chain) is cheap and safe: every clone still
/// commits into the same backing [`StatusWriter`], but each clone tracks
/// its own `committed` flag so a child's early return doesn't silently
/// suppress the parent's own commit.
#[derive(Debug, Clone)]
pub struct ObjectStatusWriter {
    shared: StatusWriter,
    object: ObjectReference,
    committed: bool,
}

impl ObjectStatusWriter {
    pub fn object(&self) -> &ObjectReference {
        &self.object
    }

    pub fn set_valid(&mut self, description: impl Into<String>, vhost: Option<String>) {
        self.set(StatusState::Valid, description, vhost);
    }

    pub fn set_invalid(&mut self, description: impl Into<String>) {
        self.set(StatusState::Invalid, description, None);
    }

    pub fn set_orphaned(&mut self, description: impl Into<String>) {
        self.set(StatusState::Orphaned, description, None);
    }

    fn set(&mut self, state: StatusState, description: impl Into<String>, vhost: Option<String>) {
        if self.committed {
            return;
        }
        self.committed = true;
        self.shared.commit(Status {
            object: self.object.clone(),
            state,
            description: description.into(),
            vhost,
        });
    }

    pub fn is_committed(&self) -> bool {
        self.committed || self.shared.has_status(&self.object)
    }
}
