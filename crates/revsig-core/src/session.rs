//! Call-scoped state of one revision-pair comparison.
//!
//! A session is built fresh for every pair from the permission tracker and
//! the two snapshots. Nothing in it outlives the pair.

use std::collections::BTreeSet;

use crate::access::{AccessPermissions, LockedFieldSet};
use crate::compare::{ExemptSet, ObjectComparator};
use crate::forms;
use crate::model::{ObjRef, ObjectGraph};
use crate::page_tree;
use crate::struct_tree::{self, StructIndex};

#[derive(Debug, Clone)]
pub struct ValidationSession {
    pub level: AccessPermissions,
    pub locked: LockedFieldSet,
    pub continue_after_failure: bool,
    pub prev_exempt: ExemptSet,
    pub curr_exempt: ExemptSet,
    /// Fields of the current snapshot that the previous one did not have.
    pub newly_added_fields: BTreeSet<ObjRef>,
    /// Widget annotations already validated as part of their fields.
    pub checked_annots: BTreeSet<ObjRef>,
    pub prev_struct: StructIndex,
    pub curr_struct: StructIndex,
    /// Targets of OBJR entries that came with a wholesale-added subtree.
    pub tagged_targets: BTreeSet<ObjRef>,
    /// Targets of OBJR entries that went away with a wholesale-removed subtree.
    pub untagged_targets: BTreeSet<ObjRef>,
}

impl ValidationSession {
    pub fn new(level: AccessPermissions, locked: &LockedFieldSet, continue_after_failure: bool) -> Self {
        Self {
            level,
            locked: locked.clone(),
            continue_after_failure,
            prev_exempt: ExemptSet::new(),
            curr_exempt: ExemptSet::new(),
            newly_added_fields: BTreeSet::new(),
            checked_annots: BTreeSet::new(),
            prev_struct: StructIndex::default(),
            curr_struct: StructIndex::default(),
            tagged_targets: BTreeSet::new(),
            untagged_targets: BTreeSet::new(),
        }
    }

    /// Derive everything that depends on the two snapshots.
    pub fn prepare(&mut self, prev: &ObjectGraph, curr: &ObjectGraph) {
        self.prev_struct = struct_tree::index(prev);
        self.curr_struct = struct_tree::index(curr);
        self.prev_exempt = exempt_set(prev, &self.prev_struct);
        self.curr_exempt = exempt_set(curr, &self.curr_struct);

        let before: BTreeSet<ObjRef> = forms::form_fields(prev).references().collect();
        self.newly_added_fields = forms::form_fields(curr)
            .references()
            .filter(|r| !before.contains(r))
            .collect();
    }

    pub fn comparator<'a>(&'a self, prev: &'a ObjectGraph, curr: &'a ObjectGraph) -> ObjectComparator<'a> {
        ObjectComparator::new(prev, curr).with_exemptions(&self.prev_exempt, &self.curr_exempt)
    }

    /// Whether checking must stop after a check returned `ok`.
    pub fn should_stop(&self, ok: bool) -> bool {
        !ok && !self.continue_after_failure
    }

    pub fn allows_annotations(&self) -> bool {
        self.level >= AccessPermissions::AnnotationModification
    }
}

/// Usually-modified objects of a snapshot: the catalog, every page-tree node
/// and leaf page, the structure-tree root and structure elements.
///
/// Leaf pages are compared by the page check; anywhere else only their
/// identity counts.
pub fn exempt_set(graph: &ObjectGraph, structure: &StructIndex) -> ExemptSet {
    let mut out = ExemptSet::new();
    if let Some(root) = graph.root() {
        out.insert(root);
    }
    let pages = page_tree::page_tree(graph);
    out.extend(pages.pages.iter().filter_map(|p| p.reference));
    out.extend(pages.nodes);
    out.extend(structure.root);
    out.extend(structure.elements.iter().copied());
    out
}
