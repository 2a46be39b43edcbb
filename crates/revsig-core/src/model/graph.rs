//! Indirect-object arena for one snapshot of a document.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::errors::{RevsigError, RevsigResult};
use crate::model::object::{Dictionary, ObjRef, PdfObject};

/// A node reached while walking the graph, together with the indirect
/// reference it was reached through (if any).
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    pub reference: Option<ObjRef>,
    pub object: &'a PdfObject,
}

impl<'a> Node<'a> {
    pub fn direct(object: &'a PdfObject) -> Self {
        Self {
            reference: None,
            object,
        }
    }

    pub fn is_indirect(&self) -> bool {
        self.reference.is_some()
    }

    pub fn as_dict(&self) -> Option<&'a Dictionary> {
        self.object.as_dict()
    }

    pub fn as_array(&self) -> Option<&'a [PdfObject]> {
        self.object.as_array()
    }
}

/// All indirect objects of a snapshot plus the trailer entries the validator needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectGraph {
    objects: BTreeMap<ObjRef, PdfObject>,
    root: Option<ObjRef>,
    info: Option<ObjRef>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: ObjRef, object: PdfObject) -> Option<PdfObject> {
        self.objects.insert(reference, object)
    }

    pub fn remove(&mut self, reference: ObjRef) -> Option<PdfObject> {
        self.objects.remove(&reference)
    }

    pub fn get(&self, reference: ObjRef) -> Option<&PdfObject> {
        self.objects.get(&reference)
    }

    pub fn get_mut(&mut self, reference: ObjRef) -> Option<&mut PdfObject> {
        self.objects.get_mut(&reference)
    }

    pub fn contains(&self, reference: ObjRef) -> bool {
        self.objects.contains_key(&reference)
    }

    /// True when any generation of this object number is live.
    pub fn contains_number(&self, num: u32) -> bool {
        self.objects
            .range(ObjRef::new(num, 0)..=ObjRef::new(num, ObjRef::MAX_GENERATION))
            .next()
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjRef, &PdfObject)> {
        self.objects.iter()
    }

    pub fn set_root(&mut self, root: ObjRef) {
        self.root = Some(root);
    }

    pub fn set_info(&mut self, info: Option<ObjRef>) {
        self.info = info;
    }

    pub fn root(&self) -> Option<ObjRef> {
        self.root
    }

    pub fn info(&self) -> Option<ObjRef> {
        self.info
    }

    /// Catalog reference and dictionary.
    ///
    /// A snapshot without a resolvable catalog dictionary is a broken invariant of
    /// the container layer, not a finding.
    pub fn catalog(&self) -> RevsigResult<(ObjRef, &Dictionary)> {
        let root = self
            .root
            .ok_or_else(|| RevsigError::invariant("snapshot has no catalog reference"))?;
        let dict = self
            .get(root)
            .and_then(PdfObject::as_dict)
            .ok_or_else(|| RevsigError::invariant(format!("catalog {root} is not a dictionary")))?;
        Ok((root, dict))
    }

    /// Follow at most one reference. Dangling references resolve to `None`.
    pub fn node<'a>(&'a self, object: &'a PdfObject) -> Option<Node<'a>> {
        match object {
            PdfObject::Ref(r) => self.get(*r).map(|o| Node {
                reference: Some(*r),
                object: o,
            }),
            other => Some(Node::direct(other)),
        }
    }

    /// Resolved entry of a dictionary.
    pub fn entry<'a>(&'a self, dict: &'a Dictionary, key: &str) -> Option<Node<'a>> {
        dict.get(key).and_then(|o| self.node(o))
    }

    /// Resolved dictionary entry of a dictionary.
    pub fn dict_entry<'a>(&'a self, dict: &'a Dictionary, key: &str) -> Option<Node<'a>> {
        self.entry(dict, key).filter(|n| n.object.as_dict().is_some())
    }

    /// Resolved array entry of a dictionary.
    pub fn array_entry<'a>(&'a self, dict: &'a Dictionary, key: &str) -> Option<Node<'a>> {
        self.entry(dict, key).filter(|n| n.object.as_array().is_some())
    }

    /// Resolve an object and return it if it is a dictionary.
    pub fn resolve_dict<'a>(&'a self, object: &'a PdfObject) -> Option<&'a Dictionary> {
        self.node(object).and_then(|n| n.as_dict())
    }

    /// Every reference reachable from `start`, not descending into `skip_keys`.
    pub fn reachable_refs(&self, start: &PdfObject, skip_keys: &[&str], out: &mut BTreeSet<ObjRef>) {
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(object) = stack.pop() {
            let dict = match object {
                PdfObject::Ref(r) => {
                    if visited.insert(*r) {
                        out.insert(*r);
                        if let Some(target) = self.get(*r) {
                            stack.push(target);
                        }
                    }
                    continue;
                }
                PdfObject::Array(items) => {
                    stack.extend(items.iter());
                    continue;
                }
                PdfObject::Dict(d) => d,
                PdfObject::Stream(s) => &s.dict,
                _ => continue,
            };
            stack.extend(
                dict.iter()
                    .filter(|(k, _)| !skip_keys.contains(&k.as_str()))
                    .map(|(_, v)| v),
            );
        }
    }
}
