//! Page-tree accessor.

use std::collections::HashSet;

use crate::model::{Node, ObjRef, ObjectGraph};
use crate::names;

/// Flattened page tree of one snapshot.
#[derive(Debug, Clone, Default)]
pub struct PageTree<'g> {
    pub root: Option<ObjRef>,
    /// Indirect `/Pages` nodes, the root included.
    pub nodes: Vec<ObjRef>,
    /// Leaf pages in document order.
    pub pages: Vec<Node<'g>>,
}

pub fn page_tree(graph: &ObjectGraph) -> PageTree<'_> {
    let mut tree = PageTree::default();
    let Ok((_, catalog)) = graph.catalog() else {
        return tree;
    };
    let Some(root) = graph.dict_entry(catalog, names::PAGES) else {
        return tree;
    };
    tree.root = root.reference;

    let mut visited = HashSet::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let Some(r) = node.reference {
            if !visited.insert(r) {
                continue;
            }
        }
        let Some(dict) = node.as_dict() else {
            continue;
        };
        let kids = graph.array_entry(dict, names::KIDS).and_then(|n| n.as_array());
        match kids {
            Some(kids) if !dict.is_type("Page") => {
                if let Some(r) = node.reference {
                    tree.nodes.push(r);
                }
                stack.extend(kids.iter().rev().filter_map(|k| graph.node(k)));
            }
            _ => tree.pages.push(node),
        }
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dictionary, PdfObject};

    fn r(n: u32) -> ObjRef {
        ObjRef::new(n, 0)
    }

    #[test]
    fn nested_tree_is_flattened_in_order() {
        let mut g = ObjectGraph::new();
        g.insert(r(1), Dictionary::typed("Catalog").with("Pages", r(2)).into());
        g.insert(
            r(2),
            Dictionary::typed("Pages")
                .with("Kids", PdfObject::Array(vec![r(3).into(), r(5).into()]))
                .into(),
        );
        g.insert(
            r(3),
            Dictionary::typed("Pages")
                .with("Parent", r(2))
                .with("Kids", PdfObject::Array(vec![r(4).into()]))
                .into(),
        );
        g.insert(
            r(4),
            Dictionary::typed("Page")
                .with("Parent", r(3))
                .with("Annots", PdfObject::Array(vec![r(9).into()]))
                .into(),
        );
        g.insert(r(5), Dictionary::typed("Page").with("Parent", r(2)).into());
        g.set_root(r(1));

        let tree = page_tree(&g);
        assert_eq!(tree.root, Some(r(2)));
        assert_eq!(tree.nodes, vec![r(2), r(3)]);
        let pages: Vec<_> = tree.pages.iter().filter_map(|p| p.reference).collect();
        assert_eq!(pages, vec![r(4), r(5)]);
    }
}
