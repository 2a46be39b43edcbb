//! Tagged-structure tree.
//!
//! Kids of every element pair are aligned by a longest-common-subsequence
//! pass. Aligned kids are compared, the rest are accepted only as wholesale
//! additions or removals: a subtree none of whose elements exists on the
//! other side.

use std::collections::{BTreeSet, HashSet};

use crate::compare::{same_link, ObjectComparator};
use crate::messages;
use crate::model::{Dictionary, ObjRef, ObjectGraph, PdfObject};
use crate::names;
use crate::report::{ReportItemStatus, ValidationReport, DOC_MDP_CHECK};
use crate::session::ValidationSession;
use crate::struct_tree::{self, StructIndex, StructKid, BACK_LINKS};

use super::{invalid, CatalogPair};

/// Root keys that change whenever content is tagged.
const ROOT_SEPARATE: &[&str] = &[
    names::K,
    names::PARENT_TREE,
    names::PARENT_TREE_NEXT_KEY,
    names::ID_TREE,
];

const OBJR_LINKS: &[&str] = &[names::OBJ, names::PG];

/// Largest alignment table built once common leading and trailing kids are set aside.
const MAX_ALIGN_CELLS: usize = 1 << 22;
const MCR_LINKS: &[&str] = &[names::PG, "Stm", "StmOwn"];

/// Objects tagged by `/OBJR` entries of wholesale-added or removed subtrees.
#[derive(Debug, Default)]
struct Wholesale {
    tagged: BTreeSet<ObjRef>,
    untagged: BTreeSet<ObjRef>,
}

pub(super) fn check_struct_tree(
    pair: &CatalogPair<'_>,
    session: &mut ValidationSession,
    report: &mut ValidationReport,
) -> bool {
    let (prev_root, curr_root) = match (
        struct_tree::struct_root(pair.prev),
        struct_tree::struct_root(pair.curr),
    ) {
        (None, None) => return true,
        (None, Some(_)) => return invalid(report, messages::STRUCT_TREE_ROOT_ADDED),
        (Some(_), None) => return invalid(report, messages::STRUCT_TREE_ROOT_REMOVED),
        (Some(p), Some(c)) => (p, c),
    };
    let (Some(prev_dict), Some(curr_dict)) = (prev_root.as_dict(), curr_root.as_dict()) else {
        return invalid(report, messages::STRUCT_TREE_ROOT_MODIFIED);
    };
    if prev_root.reference != curr_root.reference {
        return invalid(report, messages::STRUCT_TREE_ROOT_MODIFIED);
    }

    let mut wholesale = Wholesale::default();
    let ok = {
        let walker = TreeWalker {
            prev: pair.prev,
            curr: pair.curr,
            cmp: session.comparator(pair.prev, pair.curr),
            prev_index: &session.prev_struct,
            curr_index: &session.curr_struct,
            continue_after_failure: session.continue_after_failure,
        };
        let mut ok = true;
        if !walker.cmp.equal_dicts(
            &prev_dict.without(ROOT_SEPARATE),
            &curr_dict.without(ROOT_SEPARATE),
        ) {
            ok = invalid(report, messages::STRUCT_TREE_ROOT_MODIFIED);
        }
        if ok || session.continue_after_failure {
            ok = walker.walk(prev_dict, curr_dict, &mut wholesale, report) && ok;
        }
        ok
    };

    session.tagged_targets.extend(wholesale.tagged);
    session.untagged_targets.extend(wholesale.untagged);
    ok
}

struct TreeWalker<'a> {
    prev: &'a ObjectGraph,
    curr: &'a ObjectGraph,
    cmp: ObjectComparator<'a>,
    prev_index: &'a StructIndex,
    curr_index: &'a StructIndex,
    continue_after_failure: bool,
}

impl<'a> TreeWalker<'a> {
    fn walk(
        &self,
        prev_root: &'a Dictionary,
        curr_root: &'a Dictionary,
        wholesale: &mut Wholesale,
        report: &mut ValidationReport,
    ) -> bool {
        let mut ok = true;
        let mut visited: HashSet<(ObjRef, ObjRef)> = HashSet::new();
        let mut stack = vec![(prev_root, curr_root)];
        while let Some((prev, curr)) = stack.pop() {
            let prev_kids = struct_tree::kids(self.prev, prev);
            let curr_kids = struct_tree::kids(self.curr, curr);
            let Some(matched) = align(&prev_kids, &curr_kids, |a, b| self.same_kid(a, b)) else {
                report.push(
                    DOC_MDP_CHECK,
                    messages::STRUCT_KIDS_NOT_COMPARABLE,
                    ReportItemStatus::Indeterminate,
                );
                continue;
            };

            let mut prev_matched = vec![false; prev_kids.len()];
            let mut curr_matched = vec![false; curr_kids.len()];
            for &(i, j) in &matched {
                prev_matched[i] = true;
                curr_matched[j] = true;
                let a = struct_tree::classify(self.prev, prev_kids[i]);
                let b = struct_tree::classify(self.curr, curr_kids[j]);
                match self.compare_kids(a, b) {
                    Ok(Some(next)) => {
                        let seen = match (a.reference(), b.reference()) {
                            (Some(x), Some(y)) => !visited.insert((x, y)),
                            _ => false,
                        };
                        if !seen {
                            stack.push(next);
                        }
                    }
                    Ok(None) => {}
                    Err(label) => ok = invalid(report, messages::struct_element_modified(&label)),
                }
            }

            for object in prev_kids.iter().zip(&prev_matched).filter(|(_, m)| !**m).map(|(o, _)| *o) {
                let mut refs = BTreeSet::new();
                let mut targets = BTreeSet::new();
                subtree(self.prev, object, &mut refs, &mut targets);
                match refs.iter().find(|r| self.curr_index.elements.contains(r)) {
                    Some(moved) => ok = invalid(report, messages::struct_element_modified(&moved.to_string())),
                    None => wholesale.untagged.extend(targets),
                }
            }
            for object in curr_kids.iter().zip(&curr_matched).filter(|(_, m)| !**m).map(|(o, _)| *o) {
                let mut refs = BTreeSet::new();
                let mut targets = BTreeSet::new();
                subtree(self.curr, object, &mut refs, &mut targets);
                match refs.iter().find(|r| self.prev_index.elements.contains(r)) {
                    Some(moved) => ok = invalid(report, messages::struct_element_modified(&moved.to_string())),
                    None => wholesale.tagged.extend(targets),
                }
            }

            if !ok && !self.continue_after_failure {
                return false;
            }
        }
        ok
    }

    /// Alignment predicate: identity for indirect kids, value for the rest.
    fn same_kid(&self, a: &PdfObject, b: &PdfObject) -> bool {
        match (a, b) {
            (PdfObject::Ref(x), PdfObject::Ref(y)) => x == y,
            (PdfObject::Ref(_), _) | (_, PdfObject::Ref(_)) => false,
            (PdfObject::Int(x), PdfObject::Int(y)) => x == y,
            _ => self.cmp.equal(a, b),
        }
    }

    /// Compare two aligned kids. Elements to descend into come back as `Some`,
    /// a mismatch as the label of the offending kid.
    fn compare_kids(
        &self,
        a: StructKid<'a>,
        b: StructKid<'a>,
    ) -> Result<Option<(&'a Dictionary, &'a Dictionary)>, String> {
        let label = || {
            a.reference()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "direct".to_string())
        };
        match (a, b) {
            (StructKid::Element(pn), StructKid::Element(cn)) => {
                let (Some(pd), Some(cd)) = (pn.as_dict(), cn.as_dict()) else {
                    return Err(label());
                };
                let links_ok = [names::P, names::PG, names::REF]
                    .iter()
                    .all(|key| same_link(pd.get(key), cd.get(key)));
                if links_ok && self.cmp.equal_dicts(&pd.without(BACK_LINKS), &cd.without(BACK_LINKS)) {
                    Ok(Some((pd, cd)))
                } else {
                    Err(label())
                }
            }
            (StructKid::ObjectRef(pn), StructKid::ObjectRef(cn))
                if self.same_leaf(pn.as_dict(), cn.as_dict(), OBJR_LINKS) =>
            {
                Ok(None)
            }
            (StructKid::MarkedContent(pn), StructKid::MarkedContent(cn))
                if self.same_leaf(pn.as_dict(), cn.as_dict(), MCR_LINKS) =>
            {
                Ok(None)
            }
            (StructKid::Mcid(x), StructKid::Mcid(y)) if x == y => Ok(None),
            (StructKid::Other(x), StructKid::Other(y)) if self.cmp.equal(x, y) => Ok(None),
            _ => Err(label()),
        }
    }

    /// Content references: links by identity, the rest by value.
    fn same_leaf(&self, prev: Option<&Dictionary>, curr: Option<&Dictionary>, links: &[&str]) -> bool {
        let (Some(pd), Some(cd)) = (prev, curr) else {
            return false;
        };
        links.iter().all(|key| same_link(pd.get(key), cd.get(key)))
            && self.cmp.equal_dicts(&pd.without(links), &cd.without(links))
    }
}

/// Index pairs of a longest common subsequence of `a` and `b`, or `None`
/// when the differing middle section is too large to align.
fn align<T: Copy>(a: &[T], b: &[T], same: impl Fn(T, T) -> bool) -> Option<Vec<(usize, usize)>> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| same(**x, **y)).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| same(**x, **y))
        .count();
    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];
    if (a_mid.len() + 1).saturating_mul(b_mid.len() + 1) > MAX_ALIGN_CELLS {
        return None;
    }

    let mut out: Vec<(usize, usize)> = (0..prefix).map(|i| (i, i)).collect();
    out.extend(
        lcs(a_mid, b_mid, &same)
            .into_iter()
            .map(|(i, j)| (i + prefix, j + prefix)),
    );
    let (a_tail, b_tail) = (a.len() - suffix, b.len() - suffix);
    out.extend((0..suffix).map(|k| (a_tail + k, b_tail + k)));
    Some(out)
}

fn lcs<T: Copy>(a: &[T], b: &[T], same: &impl Fn(T, T) -> bool) -> Vec<(usize, usize)> {
    let (n, m) = (a.len(), b.len());
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if same(a[i], b[j]) {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }
    let mut out = Vec::with_capacity(table[0][0]);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if same(a[i], b[j]) && table[i][j] == table[i + 1][j + 1] + 1 {
            out.push((i, j));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Elements and content references under `start`, plus the objects its
/// `/OBJR` entries tag.
fn subtree<'g>(
    graph: &'g ObjectGraph,
    start: &'g PdfObject,
    refs: &mut BTreeSet<ObjRef>,
    targets: &mut BTreeSet<ObjRef>,
) {
    let mut visited = HashSet::new();
    let mut stack = vec![start];
    while let Some(object) = stack.pop() {
        let kid = struct_tree::classify(graph, object);
        if let Some(r) = kid.reference() {
            if !visited.insert(r) {
                continue;
            }
            refs.insert(r);
        }
        match kid {
            StructKid::Element(node) => {
                if let Some(d) = node.as_dict() {
                    stack.extend(struct_tree::kids(graph, d));
                }
            }
            StructKid::ObjectRef(node) => {
                if let Some(target) = node.as_dict().and_then(|d| d.get_ref(names::OBJ)) {
                    targets.insert(target);
                }
            }
            StructKid::MarkedContent(_) | StructKid::Mcid(_) | StructKid::Other(_) => {}
        }
    }
}
