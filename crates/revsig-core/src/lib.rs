//! revsig-core
//!
//! Incremental-revision integrity validation for signed documents:
//! - object model and cycle-safe structural comparison of two snapshots
//! - access-permission (DocMDP) and field-lock (FieldMDP) tracking
//! - per-subsystem catalog diffing and allowed-reference computation
//! - the revision-by-revision orchestrator producing a [`report::ValidationReport`]
//!
//! The crate does no file or network I/O. Callers hand in a
//! [`revision::RevisionSource`]; the bundled [`journal`] container (feature
//! `json`) is one such source.

pub mod access;
pub mod allowed;
pub mod catalog;
pub mod compare;
pub mod config;
pub mod errors;
pub mod forms;
#[cfg(feature = "json")]
pub mod journal;
pub mod messages;
pub mod model;
pub mod names;
pub mod page_tree;
pub mod report;
pub mod revision;
pub mod session;
pub mod signatures;
pub mod struct_tree;
pub mod validator;

pub use crate::errors::{RevsigError, RevsigResult};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::access::{AccessPermissions, FieldLock, LockAction, LockedFieldSet, PermissionTracker};
    pub use crate::allowed::{allowed_references, AllowedReferenceSet};
    pub use crate::compare::ObjectComparator;
    pub use crate::config::{ValidationContext, ValidatorConfig};
    #[cfg(feature = "json")]
    pub use crate::journal::{Increment, Journal, JournalWriter};
    pub use crate::model::{Dictionary, ObjRef, ObjectGraph, PdfObject, Stream};
    pub use crate::report::{ReportItem, ReportItemStatus, ValidationReport, ValidationResult};
    pub use crate::revision::{Revision, RevisionSource, Snapshot, TouchedRef};
    pub use crate::validator::RevisionValidator;
    pub use crate::{RevsigError, RevsigResult};
}
