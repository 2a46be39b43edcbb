//! References a revision is entitled to introduce or touch.
//!
//! The set is recomputed for every snapshot from its own catalog. Anything a
//! revision writes outside this set is an unexpected cross-reference entry.

use std::collections::{BTreeSet, HashSet};

use tracing::trace;

use crate::access::{AccessPermissions, LockedFieldSet};
use crate::forms::{self, FormField};
use crate::model::{Dictionary, ObjRef, ObjectGraph, PdfObject};
use crate::names;
use crate::page_tree;
use crate::session::ValidationSession;
use crate::signatures;
use crate::struct_tree::{self, StructKid, BACK_LINKS};

/// Keys never followed when collecting the nested references of a subtree.
const PARENT_LINKS: &[&str] = &[names::PARENT, names::P];

/// Keys of an object reference that point back into the document.
const OBJR_LINKS: &[&str] = &[names::OBJ, names::PG];

/// Indirect references only. A direct object has no identity of its own and
/// adds nothing; whatever it nests is collected by the walk instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedReferenceSet {
    refs: BTreeSet<ObjRef>,
}

impl AllowedReferenceSet {
    pub fn contains(&self, reference: ObjRef) -> bool {
        self.refs.contains(&reference)
    }

    /// True when any generation of `num` is allowed.
    pub fn contains_number(&self, num: u32) -> bool {
        self.refs
            .range(ObjRef::new(num, 0)..=ObjRef::new(num, ObjRef::MAX_GENERATION))
            .next()
            .is_some()
    }

    /// Whether a revision may write `reference`: allowed in its own snapshot
    /// and, when the object `existed` before, in the previous one too.
    pub fn admits(&self, previous: &AllowedReferenceSet, existed: bool, reference: ObjRef) -> bool {
        self.contains(reference) && (!existed || previous.contains(reference))
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjRef> + '_ {
        self.refs.iter().copied()
    }

    fn add(&mut self, reference: Option<ObjRef>) {
        if let Some(r) = reference {
            self.refs.insert(r);
        }
    }

    fn add_ref_of(&mut self, object: Option<&PdfObject>) {
        self.add(object.and_then(PdfObject::as_ref_id));
    }
}

/// Computes the allowed-reference set of one snapshot.
pub struct AllowedReferenceBuilder<'a> {
    graph: &'a ObjectGraph,
    level: AccessPermissions,
    locked: &'a LockedFieldSet,
    newly_added: &'a BTreeSet<ObjRef>,
    out: AllowedReferenceSet,
}

impl<'a> AllowedReferenceBuilder<'a> {
    pub fn new(graph: &'a ObjectGraph, session: &'a ValidationSession) -> Self {
        Self {
            graph,
            level: session.level,
            locked: &session.locked,
            newly_added: &session.newly_added_fields,
            out: AllowedReferenceSet::default(),
        }
    }

    pub fn build(mut self) -> AllowedReferenceSet {
        self.out.add(self.graph.info());
        if let Ok((root, catalog)) = self.graph.catalog() {
            self.out.add(Some(root));
            self.out.add_ref_of(catalog.get(names::METADATA));
            if let Some(dss) = catalog.get(names::DSS) {
                self.nested(dss, &[]);
            }
            self.form(catalog);
        }
        self.pages();
        self.structure();
        trace!(count = self.out.len(), "allowed references computed");
        self.out
    }

    fn nested(&mut self, object: &PdfObject, skip: &[&str]) {
        self.graph.reachable_refs(object, skip, &mut self.out.refs);
    }

    fn form(&mut self, catalog: &Dictionary) {
        let graph = self.graph;
        self.out.add_ref_of(catalog.get(names::ACRO_FORM));
        let Some(form) = forms::acro_form(graph).and_then(|n| n.as_dict()) else {
            return;
        };
        self.out.add_ref_of(form.get(names::FIELDS));
        if self.level >= AccessPermissions::AnnotationModification {
            if let Some(dr) = form.get(names::DR) {
                self.nested(dr, &[]);
            }
        }

        for field in forms::form_fields(graph).iter() {
            if field.reference.is_some_and(|r| self.newly_added.contains(&r)) {
                self.out.add(field.reference);
                for (key, value) in field.dict.iter() {
                    if !PARENT_LINKS.contains(&key.as_str()) {
                        self.nested(value, PARENT_LINKS);
                    }
                }
                continue;
            }
            if self.locked.covers(&field.name) {
                continue;
            }
            self.existing_field(field);
        }
    }

    fn existing_field(&mut self, field: &FormField<'_>) {
        let graph = self.graph;
        let value = field.value(graph);
        if self.level == AccessPermissions::NoChanges {
            let timestamp = value
                .and_then(|v| v.as_dict())
                .is_some_and(signatures::is_doc_timestamp);
            if timestamp {
                self.out.add(field.reference);
                if let Some(v) = field.dict.get(names::V) {
                    self.nested(v, PARENT_LINKS);
                }
            }
            return;
        }

        self.out.add(field.reference);
        if let Some(v) = field.dict.get(names::V) {
            self.nested(v, PARENT_LINKS);
        }
        for widget in &field.widgets {
            self.out.add(widget.reference);
            let Some(dict) = widget.as_dict() else {
                continue;
            };
            if self.level >= AccessPermissions::AnnotationModification {
                for (key, value) in dict.iter() {
                    if !names::FIELD_KEYS.contains(&key.as_str()) && !PARENT_LINKS.contains(&key.as_str()) {
                        self.nested(value, PARENT_LINKS);
                    }
                }
            } else {
                if let Some(ap) = dict.get(names::AP) {
                    self.nested(ap, PARENT_LINKS);
                }
                self.out.add_ref_of(dict.get(names::AS));
                self.out.add_ref_of(dict.get(names::M));
            }
        }
    }

    fn pages(&mut self) {
        let graph = self.graph;
        let annotations = self.level >= AccessPermissions::AnnotationModification;
        for page in page_tree::page_tree(graph).pages {
            let Some(dict) = page.as_dict() else {
                continue;
            };
            let Some(annots) = dict.get(names::ANNOTS) else {
                continue;
            };
            match annots {
                PdfObject::Ref(r) => self.out.add(Some(*r)),
                // A direct array lives in the page itself.
                _ => self.out.add(page.reference),
            }
            if annotations {
                // Field data of widgets stays under the form rules.
                let skip: Vec<&str> = names::FIELD_KEYS.iter().chain(PARENT_LINKS).copied().collect();
                if let Some(items) = graph.node(annots).and_then(|n| n.as_array()) {
                    for item in items {
                        self.nested(item, &skip);
                    }
                }
            }
        }
    }

    fn structure(&mut self) {
        let graph = self.graph;
        let Some(root) = struct_tree::struct_root(graph) else {
            return;
        };
        self.out.add(root.reference);
        let Some(root_dict) = root.as_dict() else {
            return;
        };
        for key in [names::ID_TREE, names::PARENT_TREE] {
            if let Some(tree) = root_dict.get(key) {
                self.name_or_number_tree(tree);
            }
        }

        let mut visited = HashSet::new();
        let mut stack = struct_tree::kids(graph, root_dict);
        while let Some(object) = stack.pop() {
            let kid = struct_tree::classify(graph, object);
            if let Some(r) = kid.reference() {
                if !visited.insert(r) {
                    continue;
                }
            }
            match kid {
                StructKid::Element(node) => {
                    self.out.add(node.reference);
                    let Some(dict) = node.as_dict() else {
                        continue;
                    };
                    for (key, value) in dict.iter() {
                        if !BACK_LINKS.contains(&key.as_str()) {
                            self.nested(value, BACK_LINKS);
                        }
                    }
                    self.out.add_ref_of(dict.get(names::K));
                    stack.extend(struct_tree::kids(graph, dict));
                }
                StructKid::ObjectRef(node) | StructKid::MarkedContent(node) => {
                    self.out.add(node.reference);
                    if let Some(dict) = node.as_dict() {
                        for (key, value) in dict.iter() {
                            if !OBJR_LINKS.contains(&key.as_str()) {
                                self.nested(value, OBJR_LINKS);
                            }
                        }
                    }
                }
                StructKid::Mcid(_) | StructKid::Other(_) => {}
            }
        }
    }

    /// Tree nodes plus their per-entry content arrays, not the leaf targets.
    fn name_or_number_tree(&mut self, tree: &PdfObject) {
        let graph = self.graph;
        let mut visited = HashSet::new();
        let mut stack = vec![tree];
        while let Some(object) = stack.pop() {
            let Some(node) = graph.node(object) else {
                continue;
            };
            if let Some(r) = node.reference {
                if !visited.insert(r) {
                    continue;
                }
            }
            self.out.add(node.reference);
            let Some(dict) = node.as_dict() else {
                continue;
            };
            if let Some(kids) = dict.get(names::KIDS) {
                self.out.add_ref_of(Some(kids));
                if let Some(items) = graph.node(kids).and_then(|n| n.as_array()) {
                    stack.extend(items.iter());
                }
            }
            for key in [names::NAMES, names::NUMS] {
                let Some(entries) = dict.get(key) else {
                    continue;
                };
                self.out.add_ref_of(Some(entries));
                let Some(items) = graph.node(entries).and_then(|n| n.as_array()) else {
                    continue;
                };
                // Values sit at odd positions; arrays of elements are containers.
                for value in items.iter().skip(1).step_by(2) {
                    let is_array = graph.node(value).is_some_and(|n| n.as_array().is_some());
                    if is_array {
                        self.out.add_ref_of(Some(value));
                    }
                }
            }
        }
    }
}

/// Allowed references of `graph` under the session's level and locks.
pub fn allowed_references(graph: &ObjectGraph, session: &ValidationSession) -> AllowedReferenceSet {
    AllowedReferenceBuilder::new(graph, session).build()
}
