//! Page tree and page annotations.

use std::collections::HashSet;

use crate::compare::{same_link, same_reference, ObjectComparator};
use crate::messages;
use crate::model::{Dictionary, Node, ObjRef, ObjectGraph, PdfObject};
use crate::names;
use crate::report::ValidationReport;
use crate::session::ValidationSession;

use super::{invalid, CatalogPair};

/// Intermediate-node keys checked by identity.
const NODE_LINKS: &[&str] = &[names::KIDS, names::PARENT];

/// Annotation back-links, checked by identity.
const ANNOT_LINKS: &[&str] = &[names::P, names::PARENT, names::POPUP];

/// Leaf-page keys with their own rules.
const PAGE_SEPARATE: &[&str] = &[
    names::ANNOTS,
    names::PARENT,
    names::STRUCT_PARENTS,
    names::TABS,
];

pub(super) fn check_pages(
    pair: &CatalogPair<'_>,
    session: &ValidationSession,
    report: &mut ValidationReport,
) -> bool {
    if !same_reference(
        pair.prev_catalog.get(names::PAGES),
        pair.curr_catalog.get(names::PAGES),
    ) {
        return invalid(report, messages::PAGES_MODIFIED);
    }
    let (Some(prev_root), Some(curr_root)) = (
        pair.prev.dict_entry(pair.prev_catalog, names::PAGES),
        pair.curr.dict_entry(pair.curr_catalog, names::PAGES),
    ) else {
        return invalid(report, messages::PAGES_MODIFIED);
    };

    let cmp = session.comparator(pair.prev, pair.curr);
    let mut ok = true;
    let mut visited: HashSet<(ObjRef, ObjRef)> = HashSet::new();
    let mut stack = vec![(prev_root, curr_root)];
    while let Some((prev, curr)) = stack.pop() {
        if let (Some(a), Some(b)) = (prev.reference, curr.reference) {
            if !visited.insert((a, b)) {
                continue;
            }
        }
        let (Some(pd), Some(cd)) = (prev.as_dict(), curr.as_dict()) else {
            return invalid(report, messages::PAGES_MODIFIED);
        };
        let prev_kids = intermediate_kids(pair.prev, pd);
        let curr_kids = intermediate_kids(pair.curr, cd);
        match (prev_kids, curr_kids) {
            (Some(pk), Some(ck)) => {
                let same_node = pk.len() == ck.len()
                    && same_link(pd.get(names::PARENT), cd.get(names::PARENT))
                    && cmp.equal_dicts(&pd.without(NODE_LINKS), &cd.without(NODE_LINKS))
                    && pk.iter().zip(ck).all(|(a, b)| same_reference(Some(a), Some(b)));
                if !same_node {
                    return invalid(report, messages::PAGES_MODIFIED);
                }
                for (a, b) in pk.iter().zip(ck).rev() {
                    if let (Some(a), Some(b)) = (pair.prev.node(a), pair.curr.node(b)) {
                        stack.push((a, b));
                    }
                }
            }
            (None, None) => {
                ok = check_page(pair, &cmp, session, prev, curr, report) && ok;
                if session.should_stop(ok) {
                    return false;
                }
            }
            _ => return invalid(report, messages::PAGES_MODIFIED),
        }
    }
    ok
}

fn intermediate_kids<'g>(graph: &'g ObjectGraph, dict: &'g Dictionary) -> Option<&'g [PdfObject]> {
    if dict.is_type("Page") {
        return None;
    }
    graph.array_entry(dict, names::KIDS).and_then(|n| n.as_array())
}

fn check_page(
    pair: &CatalogPair<'_>,
    cmp: &ObjectComparator<'_>,
    session: &ValidationSession,
    prev: Node<'_>,
    curr: Node<'_>,
    report: &mut ValidationReport,
) -> bool {
    let (Some(pd), Some(cd)) = (prev.as_dict(), curr.as_dict()) else {
        return invalid(report, messages::PAGE_MODIFIED);
    };
    let mut ok = true;
    if !same_link(pd.get(names::PARENT), cd.get(names::PARENT))
        || !cmp.equal_dicts(&pd.without(PAGE_SEPARATE), &cd.without(PAGE_SEPARATE))
    {
        ok = invalid(report, messages::PAGE_MODIFIED);
        if session.should_stop(ok) {
            return false;
        }
    }

    if !session.allows_annotations() {
        let tabs_ok = match (pd.get(names::TABS), cd.get(names::TABS)) {
            (a, b) if a == b => true,
            (None, Some(b)) => b.as_name() == Some(names::TABS_STRUCTURE),
            _ => false,
        };
        if !tabs_ok {
            ok = invalid(report, messages::TABS_MODIFIED);
            if session.should_stop(ok) {
                return false;
            }
        }
    }

    let prev_annots = annotations(pair.prev, pd);
    let curr_annots = annotations(pair.curr, cd);

    // A removed annotation must not stay tagged in the structure tree.
    for removed in prev_annots
        .iter()
        .filter_map(|a| a.as_ref_id())
        .filter(|r| !curr_annots.iter().any(|c| c.as_ref_id() == Some(*r)))
    {
        if session.prev_struct.objr_targets.contains(&removed)
            && !session.untagged_targets.contains(&removed)
        {
            ok = invalid(report, messages::removed_annotation_still_tagged(&removed.to_string()));
            if session.should_stop(ok) {
                return false;
            }
        }
    }

    // An added annotation may only be tagged by a subtree added with it.
    for added in curr_annots
        .iter()
        .filter_map(|a| a.as_ref_id())
        .filter(|r| !prev_annots.iter().any(|p| p.as_ref_id() == Some(*r)))
    {
        if session.curr_struct.objr_targets.contains(&added) && !session.tagged_targets.contains(&added) {
            ok = invalid(report, messages::added_annotation_already_tagged(&added.to_string()));
            if session.should_stop(ok) {
                return false;
            }
        }
    }

    if session.allows_annotations() {
        return ok;
    }
    let prev_rest = unchecked(&prev_annots, session);
    let curr_rest = unchecked(&curr_annots, session);
    let same = prev_rest.len() == curr_rest.len()
        && prev_rest
            .iter()
            .zip(&curr_rest)
            .all(|(a, b)| same_annotation(pair, cmp, a, b));
    if !same {
        ok = invalid(report, messages::PAGE_ANNOTATIONS_MODIFIED);
    }
    ok
}

/// Entries of a page's `/Annots`.
fn annotations<'g>(graph: &'g ObjectGraph, page: &'g Dictionary) -> Vec<&'g PdfObject> {
    graph
        .array_entry(page, names::ANNOTS)
        .and_then(|n| n.as_array())
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

/// Annotations not already validated as widgets of a form field.
fn unchecked<'g>(items: &[&'g PdfObject], session: &ValidationSession) -> Vec<&'g PdfObject> {
    items
        .iter()
        .copied()
        .filter(|a| !a.as_ref_id().is_some_and(|r| session.checked_annots.contains(&r)))
        .collect()
}

/// Annotations compare without their back-links, which must keep their targets.
fn same_annotation(pair: &CatalogPair<'_>, cmp: &ObjectComparator<'_>, a: &PdfObject, b: &PdfObject) -> bool {
    if !same_link_or_direct(a, b) {
        return false;
    }
    let prev = pair.prev.node(a).and_then(|n| n.as_dict());
    let curr = pair.curr.node(b).and_then(|n| n.as_dict());
    match (prev, curr) {
        (Some(x), Some(y)) => {
            ANNOT_LINKS.iter().all(|k| same_link(x.get(k), y.get(k)))
                && cmp.equal_dicts(&x.without(ANNOT_LINKS), &y.without(ANNOT_LINKS))
        }
        _ => cmp.equal(a, b),
    }
}

fn same_link_or_direct(a: &PdfObject, b: &PdfObject) -> bool {
    match (a, b) {
        (PdfObject::Ref(x), PdfObject::Ref(y)) => x == y,
        (PdfObject::Ref(_), _) | (_, PdfObject::Ref(_)) => false,
        _ => true,
    }
}
