//! Catalog comparison between two snapshots.
//!
//! Every subsystem of the catalog has its own check. Checks record their
//! findings in the report and return whether they passed; all of them run
//! unless the session is configured to stop at the first failure.

mod acroform;
mod pages;
mod structure;

use tracing::debug;

use crate::compare::{same_link, ObjectComparator};
use crate::errors::RevsigResult;
use crate::messages;
use crate::model::{Dictionary, ObjectGraph, PdfObject};
use crate::names;
use crate::report::{ReportItemStatus, ValidationReport, DOC_MDP_CHECK};
use crate::session::ValidationSession;
use crate::signatures;

/// Catalog keys compared by their own checks, not by the baseline.
const SEPARATELY_CHECKED: &[&str] = &[
    names::METADATA,
    names::EXTENSIONS,
    names::PERMS,
    names::DSS,
    names::ACRO_FORM,
    names::PAGES,
    names::STRUCT_TREE_ROOT,
    names::VERSION,
];

/// The two snapshots and their catalogs.
#[derive(Debug, Clone, Copy)]
pub struct CatalogPair<'a> {
    pub prev: &'a ObjectGraph,
    pub curr: &'a ObjectGraph,
    pub prev_catalog: &'a Dictionary,
    pub curr_catalog: &'a Dictionary,
}

impl<'a> CatalogPair<'a> {
    pub fn new(prev: &'a ObjectGraph, curr: &'a ObjectGraph) -> RevsigResult<Self> {
        let (_, prev_catalog) = prev.catalog()?;
        let (_, curr_catalog) = curr.catalog()?;
        Ok(Self {
            prev,
            curr,
            prev_catalog,
            curr_catalog,
        })
    }

    /// Resolved catalog entry on both sides.
    fn entries(&self, key: &str) -> (Option<&'a PdfObject>, Option<&'a PdfObject>) {
        let resolve = |graph: &'a ObjectGraph, catalog: &'a Dictionary| {
            graph.entry(catalog, key).map(|n| n.object)
        };
        (
            resolve(self.prev, self.prev_catalog),
            resolve(self.curr, self.curr_catalog),
        )
    }
}

macro_rules! run_check {
    ($ok:ident, $session:expr, $check:expr) => {
        $ok = $check && $ok;
        if $session.should_stop($ok) {
            return Ok(false);
        }
    };
}

/// Compare the catalogs of two snapshots. `Err` only for a missing catalog.
pub fn compare_catalogs(
    prev: &ObjectGraph,
    curr: &ObjectGraph,
    session: &mut ValidationSession,
    report: &mut ValidationReport,
) -> RevsigResult<bool> {
    let pair = CatalogPair::new(prev, curr)?;
    let mut ok = true;
    run_check!(ok, session, check_baseline(&pair, session, report));
    run_check!(ok, session, check_extensions(&pair, report));
    run_check!(ok, session, check_permissions(&pair, session, report));
    run_check!(ok, session, check_dss(&pair, report));
    run_check!(ok, session, acroform::check_acroform(&pair, session, report));
    run_check!(ok, session, structure::check_struct_tree(&pair, session, report));
    run_check!(ok, session, pages::check_pages(&pair, session, report));
    debug!(ok, "catalog comparison finished");
    Ok(ok)
}

fn invalid(report: &mut ValidationReport, message: impl Into<String>) -> bool {
    report.push(DOC_MDP_CHECK, message, ReportItemStatus::Invalid);
    false
}

fn check_baseline(pair: &CatalogPair<'_>, session: &ValidationSession, report: &mut ValidationReport) -> bool {
    let prev = pair.prev_catalog.without(SEPARATELY_CHECKED);
    let curr = pair.curr_catalog.without(SEPARATELY_CHECKED);
    if session.comparator(pair.prev, pair.curr).equal_dicts(&prev, &curr) {
        return true;
    }
    invalid(report, messages::NOT_ALLOWED_CATALOG_CHANGES)
}

/// `1.7` style version names.
fn parse_version(name: &str) -> Option<(u32, u32)> {
    let (major, minor) = name.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

fn check_extensions(pair: &CatalogPair<'_>, report: &mut ValidationReport) -> bool {
    let (prev, curr) = pair.entries(names::EXTENSIONS);
    let Some(prev) = prev else {
        return true;
    };
    let Some(curr) = curr else {
        return invalid(report, messages::EXTENSIONS_REMOVED);
    };
    let (Some(prev), Some(curr)) = (prev.as_dict(), curr.as_dict()) else {
        return invalid(report, messages::EXTENSIONS_TYPE);
    };

    let mut ok = true;
    for (prefix, prev_ext) in prev.iter() {
        let prev_list = extension_list(pair.prev, prev_ext);
        let curr_list = curr
            .get(prefix)
            .map(|c| extension_list(pair.curr, c))
            .unwrap_or_default();
        if prev_list.len() > curr_list.len() {
            ok = invalid(report, messages::developer_extension_removed(prefix));
            continue;
        }
        for (p, c) in prev_list.iter().zip(&curr_list) {
            let prev_level = p.get_int(names::EXTENSION_LEVEL).unwrap_or(0);
            let curr_level = c.get_int(names::EXTENSION_LEVEL).unwrap_or(0);
            if curr_level < prev_level {
                ok = invalid(report, messages::extension_level_decreased(prefix));
            }
            let prev_base = p.get_name(names::BASE_VERSION).and_then(parse_version);
            let curr_base = c.get_name(names::BASE_VERSION).and_then(parse_version);
            let decreased = match (prev_base, curr_base) {
                (Some(p), Some(c)) => c < p,
                (None, _) => false,
                (Some(_), None) => true,
            };
            if decreased {
                ok = invalid(report, messages::base_version_decreased(prefix));
            }
        }
    }
    ok
}

/// A developer extension is a dictionary or an array of them.
fn extension_list<'g>(graph: &'g ObjectGraph, object: &'g PdfObject) -> Vec<&'g Dictionary> {
    let Some(node) = graph.node(object) else {
        return Vec::new();
    };
    match node.object {
        PdfObject::Dict(d) => vec![d],
        PdfObject::Array(items) => items.iter().filter_map(|i| graph.resolve_dict(i)).collect(),
        _ => Vec::new(),
    }
}

fn check_permissions(pair: &CatalogPair<'_>, session: &ValidationSession, report: &mut ValidationReport) -> bool {
    let (prev, curr) = pair.entries(names::PERMS);
    let Some(prev) = prev else {
        return true;
    };
    let Some(curr) = curr else {
        return invalid(report, messages::PERMISSIONS_REMOVED);
    };
    let (Some(prev), Some(curr)) = (prev.as_dict(), curr.as_dict()) else {
        return invalid(report, messages::PERMISSIONS_TYPE);
    };

    let cmp = session.comparator(pair.prev, pair.curr);
    let mut ok = true;
    for (name, prev_sig) in prev.iter() {
        let same = match (
            pair.prev.resolve_dict(prev_sig),
            curr.get(name).and_then(|c| pair.curr.resolve_dict(c)),
        ) {
            (Some(a), Some(b)) => signature_dicts_equal(&cmp, a, b),
            _ => false,
        };
        if !same {
            ok = invalid(report, messages::permission_removed(name));
        }
    }
    ok
}

fn check_dss(pair: &CatalogPair<'_>, report: &mut ValidationReport) -> bool {
    match pair.entries(names::DSS) {
        (Some(_), None) => invalid(report, messages::DSS_REMOVED),
        _ => true,
    }
}

/// Signature dictionaries compare structurally, except that the `/Data` of
/// each reference entry must keep pointing at the same object.
pub(crate) fn signature_dicts_equal(cmp: &ObjectComparator<'_>, a: &Dictionary, b: &Dictionary) -> bool {
    if !cmp.equal_dicts(&a.without(&[names::REFERENCE]), &b.without(&[names::REFERENCE])) {
        return false;
    }
    let prev_refs = signatures::references(cmp.prev(), a);
    let curr_refs = signatures::references(cmp.curr(), b);
    if prev_refs.len() != curr_refs.len() {
        return false;
    }
    prev_refs.iter().zip(&curr_refs).all(|(x, y)| {
        cmp.equal_dicts(&x.without(&[names::DATA]), &y.without(&[names::DATA]))
            && same_link(x.get(names::DATA), y.get(names::DATA))
    })
}
