//! Structure-tree accessor.

use std::collections::{BTreeSet, HashSet};

use crate::model::{Dictionary, Node, ObjRef, ObjectGraph, PdfObject};
use crate::names;

/// Back-links of a structure element, validated by identity.
pub const BACK_LINKS: &[&str] = &[names::K, names::P, names::REF, names::PG];

/// One entry of a structure element's `/K`.
#[derive(Debug, Clone, Copy)]
pub enum StructKid<'g> {
    Element(Node<'g>),
    /// Object reference (`/Type /OBJR`).
    ObjectRef(Node<'g>),
    /// Marked-content reference (`/Type /MCR`).
    MarkedContent(Node<'g>),
    Mcid(i64),
    Other(&'g PdfObject),
}

impl<'g> StructKid<'g> {
    pub fn reference(&self) -> Option<ObjRef> {
        match self {
            Self::Element(n) | Self::ObjectRef(n) | Self::MarkedContent(n) => n.reference,
            Self::Mcid(_) | Self::Other(_) => None,
        }
    }

    pub fn dict(&self) -> Option<&'g Dictionary> {
        match self {
            Self::Element(n) | Self::ObjectRef(n) | Self::MarkedContent(n) => n.as_dict(),
            Self::Mcid(_) | Self::Other(_) => None,
        }
    }
}

/// Resolved `/StructTreeRoot` of the catalog.
pub fn struct_root(graph: &ObjectGraph) -> Option<Node<'_>> {
    let (_, catalog) = graph.catalog().ok()?;
    graph.dict_entry(catalog, names::STRUCT_TREE_ROOT)
}

/// Entries of `/K`, whether it holds one kid or an array of them.
pub fn kids<'g>(graph: &'g ObjectGraph, elem: &'g Dictionary) -> Vec<&'g PdfObject> {
    let Some(k) = elem.get(names::K) else {
        return Vec::new();
    };
    match graph.node(k) {
        Some(node) => match node.as_array() {
            Some(items) => items.iter().collect(),
            None => vec![k],
        },
        None => Vec::new(),
    }
}

pub fn classify<'g>(graph: &'g ObjectGraph, object: &'g PdfObject) -> StructKid<'g> {
    if let PdfObject::Int(mcid) = object {
        return StructKid::Mcid(*mcid);
    }
    let Some(node) = graph.node(object) else {
        return StructKid::Other(object);
    };
    match node.as_dict() {
        Some(d) if d.is_type(names::OBJR) => StructKid::ObjectRef(node),
        Some(d) if d.is_type(names::MCR) => StructKid::MarkedContent(node),
        Some(_) => StructKid::Element(node),
        None => StructKid::Other(object),
    }
}

/// Indirect structure elements and object-reference targets of one tree.
#[derive(Debug, Clone, Default)]
pub struct StructIndex {
    pub root: Option<ObjRef>,
    pub elements: BTreeSet<ObjRef>,
    /// Objects (usually annotations) tagged through `/OBJR`.
    pub objr_targets: BTreeSet<ObjRef>,
}

/// Walk the whole tree once.
pub fn index(graph: &ObjectGraph) -> StructIndex {
    let mut out = StructIndex::default();
    let Some(root) = struct_root(graph) else {
        return out;
    };
    out.root = root.reference;
    let Some(root_dict) = root.as_dict() else {
        return out;
    };

    let mut visited = HashSet::new();
    let mut stack = kids(graph, root_dict);
    while let Some(object) = stack.pop() {
        let kid = classify(graph, object);
        if let Some(r) = kid.reference() {
            if !visited.insert(r) {
                continue;
            }
        }
        match kid {
            StructKid::Element(node) => {
                if let Some(r) = node.reference {
                    out.elements.insert(r);
                }
                if let Some(d) = node.as_dict() {
                    stack.extend(kids(graph, d));
                }
            }
            StructKid::ObjectRef(node) => {
                if let Some(target) = node.as_dict().and_then(|d| d.get_ref(names::OBJ)) {
                    out.objr_targets.insert(target);
                }
            }
            StructKid::MarkedContent(_) | StructKid::Mcid(_) | StructKid::Other(_) => {}
        }
    }
    out
}
