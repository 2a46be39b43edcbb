//! Revisions and snapshots.
//!
//! A [`Revision`] is one append-only increment of a document. A [`Snapshot`] is
//! the document truncated at a revision's end offset and parsed into an
//! [`ObjectGraph`]. Snapshots own their byte window and graph; dropping one
//! releases both, so the orchestrator keeps at most two alive at a time.

use std::collections::BTreeSet;
use std::ops::Deref;

use bytes::Bytes;
use tracing::trace;

use crate::errors::{RevsigError, RevsigResult};
use crate::model::{ObjRef, ObjectGraph};

/// One cross-reference entry written by a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TouchedRef {
    pub reference: ObjRef,
    pub free: bool,
}

impl TouchedRef {
    pub fn used(reference: ObjRef) -> Self {
        Self {
            reference,
            free: false,
        }
    }

    pub fn freed(reference: ObjRef) -> Self {
        Self {
            reference,
            free: true,
        }
    }
}

/// One append-only increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub end_offset: u64,
    pub touched: BTreeSet<TouchedRef>,
}

impl Revision {
    pub fn new(end_offset: u64, touched: impl IntoIterator<Item = TouchedRef>) -> Self {
        Self {
            end_offset,
            touched: touched.into_iter().collect(),
        }
    }
}

/// Revisions must be strictly increasing by end offset.
pub fn ensure_ordered(revisions: &[Revision]) -> RevsigResult<()> {
    for w in revisions.windows(2) {
        if w[0].end_offset >= w[1].end_offset {
            return Err(RevsigError::invariant(format!(
                "revisions are not ordered by end offset ({} >= {})",
                w[0].end_offset, w[1].end_offset
            )));
        }
    }
    Ok(())
}

/// Read-only materialization of the document at one revision boundary.
#[derive(Debug)]
pub struct Snapshot {
    window: Bytes,
    graph: ObjectGraph,
}

impl Snapshot {
    pub fn new(window: Bytes, graph: ObjectGraph) -> Self {
        trace!(len = window.len(), objects = graph.len(), "snapshot opened");
        Self { window, graph }
    }

    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    /// Length of the byte window, i.e. the revision's end offset.
    pub fn len(&self) -> u64 {
        self.window.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn window(&self) -> &Bytes {
        &self.window
    }
}

impl Deref for Snapshot {
    type Target = ObjectGraph;

    fn deref(&self) -> &ObjectGraph {
        &self.graph
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        trace!(len = self.window.len(), "snapshot released");
    }
}

/// Revision reader + snapshot materializer for one document.
pub trait RevisionSource {
    /// All revisions, oldest first.
    fn read_revisions(&self) -> RevsigResult<Vec<Revision>>;

    /// Materialize the document truncated at `revision.end_offset`.
    fn open_snapshot(&self, revision: &Revision) -> RevsigResult<Snapshot>;
}
