//! Cycle-safe structural equality across two snapshots.
//!
//! The comparator walks both graphs with an explicit worklist. Each pair of
//! indirect references is expanded at most once; a pair seen again is assumed
//! equal, which is what terminates comparisons of parent/child back-links.

use std::collections::{BTreeSet, HashSet};

use crate::model::{Dictionary, ObjRef, ObjectGraph, PdfObject};

/// References that are compared by identity only.
pub type ExemptSet = BTreeSet<ObjRef>;

/// Deep-equality of nodes from a previous and a current snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ObjectComparator<'a> {
    prev: &'a ObjectGraph,
    curr: &'a ObjectGraph,
    prev_exempt: Option<&'a ExemptSet>,
    curr_exempt: Option<&'a ExemptSet>,
}

impl<'a> ObjectComparator<'a> {
    pub fn new(prev: &'a ObjectGraph, curr: &'a ObjectGraph) -> Self {
        Self {
            prev,
            curr,
            prev_exempt: None,
            curr_exempt: None,
        }
    }

    /// Nodes referenced from both exempt sets compare equal iff they share an identity.
    pub fn with_exemptions(mut self, prev: &'a ExemptSet, curr: &'a ExemptSet) -> Self {
        self.prev_exempt = Some(prev);
        self.curr_exempt = Some(curr);
        self
    }

    pub fn prev(&self) -> &'a ObjectGraph {
        self.prev
    }

    pub fn curr(&self) -> &'a ObjectGraph {
        self.curr
    }

    /// `a` lives in the previous snapshot, `b` in the current one.
    pub fn equal(&self, a: &PdfObject, b: &PdfObject) -> bool {
        let mut work = Worklist::default();
        work.push(a, b);
        self.drain(work)
    }

    pub fn equal_refs(&self, a: ObjRef, b: ObjRef) -> bool {
        self.equal(&PdfObject::Ref(a), &PdfObject::Ref(b))
    }

    /// Equality of two direct dictionaries.
    pub fn equal_dicts(&self, a: &Dictionary, b: &Dictionary) -> bool {
        let mut work = Worklist::default();
        if !work.push_dict(a, b) {
            return false;
        }
        self.drain(work)
    }

    /// Equality of two optional nodes: absent on both sides is equal.
    pub fn equal_opt(&self, a: Option<&PdfObject>, b: Option<&PdfObject>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => self.equal(a, b),
            _ => false,
        }
    }

    fn exempt(&self, a: ObjRef, b: ObjRef) -> bool {
        matches!(
            (self.prev_exempt, self.curr_exempt),
            (Some(pa), Some(pb)) if pa.contains(&a) && pb.contains(&b)
        )
    }

    fn drain<'w>(&'w self, mut work: Worklist<'w>) -> bool {
        while let Some((a, b)) = work.stack.pop() {
            match (a, b) {
                (PdfObject::Ref(ra), PdfObject::Ref(rb)) => {
                    if self.exempt(*ra, *rb) {
                        if ra != rb {
                            return false;
                        }
                        continue;
                    }
                    if !work.visited.insert((*ra, *rb)) {
                        continue;
                    }
                    match (self.prev.get(*ra), self.curr.get(*rb)) {
                        (None, None) => {}
                        (Some(oa), Some(ob)) => {
                            // A reference may not resolve to another reference.
                            if matches!(oa, PdfObject::Ref(_)) || matches!(ob, PdfObject::Ref(_)) {
                                if oa != ob {
                                    return false;
                                }
                                continue;
                            }
                            work.push(oa, ob);
                        }
                        // Dangling reference on one side only.
                        (Some(o), None) | (None, Some(o)) => {
                            if !o.is_null() {
                                return false;
                            }
                        }
                    }
                }
                (PdfObject::Ref(_), _) | (_, PdfObject::Ref(_)) => return false,
                _ if a.is_null() != b.is_null() => return false,
                _ if a.kind() != b.kind() => return false,
                (PdfObject::Null, PdfObject::Null) => {}
                (PdfObject::Bool(x), PdfObject::Bool(y)) => {
                    if x != y {
                        return false;
                    }
                }
                (PdfObject::Text(x), PdfObject::Text(y)) | (PdfObject::Name(x), PdfObject::Name(y)) => {
                    if x != y {
                        return false;
                    }
                }
                (PdfObject::Array(x), PdfObject::Array(y)) => {
                    if x.len() != y.len() {
                        return false;
                    }
                    for (ia, ib) in x.iter().zip(y) {
                        work.push(ia, ib);
                    }
                }
                (PdfObject::Dict(x), PdfObject::Dict(y)) => {
                    if !work.push_dict(x, y) {
                        return false;
                    }
                }
                (PdfObject::Stream(x), PdfObject::Stream(y)) => {
                    if x.data != y.data || !work.push_dict(&x.dict, &y.dict) {
                        return false;
                    }
                }
                _ => {
                    // Same kind, remaining case is numeric.
                    if a.as_number() != b.as_number() {
                        return false;
                    }
                }
            }
        }
        true
    }
}

#[derive(Default)]
struct Worklist<'w> {
    stack: Vec<(&'w PdfObject, &'w PdfObject)>,
    visited: HashSet<(ObjRef, ObjRef)>,
}

impl<'w> Worklist<'w> {
    fn push(&mut self, a: &'w PdfObject, b: &'w PdfObject) {
        self.stack.push((a, b));
    }

    /// Queue value pairs; false when key sets differ.
    fn push_dict(&mut self, a: &'w Dictionary, b: &'w Dictionary) -> bool {
        if a.len() != b.len() {
            return false;
        }
        for (k, va) in a.iter() {
            let Some(vb) = b.get(k) else {
                return false;
            };
            self.push(va, vb);
        }
        true
    }
}

/// True when both objects are references to the same identity.
pub fn same_reference(a: Option<&PdfObject>, b: Option<&PdfObject>) -> bool {
    match (a.and_then(PdfObject::as_ref_id), b.and_then(PdfObject::as_ref_id)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Identity check for back-links: both absent, or both referencing the same
/// objects. Arrays of links compare element by element; direct values by value.
pub fn same_link(a: Option<&PdfObject>, b: Option<&PdfObject>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(PdfObject::Ref(x)), Some(PdfObject::Ref(y))) => x == y,
        (Some(PdfObject::Array(x)), Some(PdfObject::Array(y))) => {
            x.len() == y.len() && x.iter().zip(y).all(|(i, j)| same_link(Some(i), Some(j)))
        }
        (Some(PdfObject::Ref(_)), Some(_)) | (Some(_), Some(PdfObject::Ref(_))) => false,
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
