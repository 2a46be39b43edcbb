//! Interactive form: field locks and form-level changes.

use std::collections::BTreeSet;

use crate::access::AccessPermissions;
use crate::compare::{same_link, ObjectComparator};
use crate::forms::{self, is_pure_widget, FormField, FormFields};
use crate::messages;
use crate::model::{Dictionary, ObjRef, ObjectGraph, PdfObject};
use crate::names;
use crate::report::{ReportItemStatus, ValidationReport, FIELD_MDP_CHECK};
use crate::session::ValidationSession;
use crate::signatures;

use super::{invalid, signature_dicts_equal, CatalogPair};

/// Form keys with their own rules.
const FORM_SEPARATE: &[&str] = &[names::FIELDS, names::DR, names::DA];

/// Keys a locked field may not change through; the rest must be identical.
const LOCK_LINKS: &[&str] = &[names::PARENT, names::P, names::KIDS];

/// Keys ignored when looking for the same field in the next revision.
const FILL_IN_KEYS: &[&str] = &[
    names::V,
    names::AP,
    names::AS,
    names::M,
    names::PARENT,
    names::P,
    names::KIDS,
];

/// Widget keys ignored when matching kids of the same field.
const WIDGET_FILL_IN_KEYS: &[&str] = &[names::AP, names::AS, names::M, names::PARENT, names::P];

pub(super) fn check_acroform(
    pair: &CatalogPair<'_>,
    session: &mut ValidationSession,
    report: &mut ValidationReport,
) -> bool {
    let prev_form = forms::acro_form(pair.prev).and_then(|n| n.as_dict());
    let curr_form = forms::acro_form(pair.curr).and_then(|n| n.as_dict());
    let (prev_form, curr_form) = match (prev_form, curr_form) {
        (None, None) => return true,
        (Some(_), None) => return invalid(report, messages::ACROFORM_REMOVED),
        (prev, Some(curr)) => (prev, curr),
    };
    let empty = Dictionary::new();
    let prev_form = prev_form.unwrap_or(&empty);

    let prev_fields = forms::form_fields(pair.prev);
    let curr_fields = forms::form_fields(pair.curr);
    for location in curr_fields
        .malformed
        .iter()
        .filter(|m| !prev_fields.malformed.contains(m))
    {
        report.push(
            FIELD_MDP_CHECK,
            messages::field_not_dictionary(location),
            ReportItemStatus::Indeterminate,
        );
    }

    let mut ok = check_locked_fields(pair, &prev_fields, &curr_fields, session, report);
    if session.should_stop(ok) {
        return false;
    }

    let cmp = session.comparator(pair.prev, pair.curr);
    if !cmp.equal_dicts(&prev_form.without(FORM_SEPARATE), &curr_form.without(FORM_SEPARATE)) {
        ok = invalid(report, messages::NOT_ALLOWED_ACROFORM_CHANGES);
        if session.should_stop(ok) {
            return false;
        }
    }
    if !check_resources(pair, &cmp, prev_form, curr_form, session.level) {
        ok = invalid(report, messages::NOT_ALLOWED_ACROFORM_CHANGES);
        if session.should_stop(ok) {
            return false;
        }
    }

    let checked = check_fields(pair, &cmp, &prev_fields, &curr_fields, session, report);
    session.checked_annots.extend(checked.annots);
    checked.ok && ok
}

/// Locked fields must stay exactly as they were signed.
fn check_locked_fields(
    pair: &CatalogPair<'_>,
    prev_fields: &FormFields<'_>,
    curr_fields: &FormFields<'_>,
    session: &ValidationSession,
    report: &mut ValidationReport,
) -> bool {
    if session.locked.is_empty() {
        return true;
    }
    let cmp = session.comparator(pair.prev, pair.curr);
    let mut ok = true;
    for prev in prev_fields.iter().filter(|f| session.locked.covers(&f.name)) {
        let finding = match curr_fields.get(&prev.name) {
            None => Some(messages::locked_field_removed(&prev.name)),
            Some(curr) => locked_field_change(pair, &cmp, prev, curr),
        };
        if let Some(message) = finding {
            report.push(FIELD_MDP_CHECK, message, ReportItemStatus::Invalid);
            ok = false;
            if session.should_stop(ok) {
                return false;
            }
        }
    }
    ok
}

fn locked_field_change(
    pair: &CatalogPair<'_>,
    cmp: &ObjectComparator<'_>,
    prev: &FormField<'_>,
    curr: &FormField<'_>,
) -> Option<String> {
    if !cmp.equal_dicts(&prev.dict.without(LOCK_LINKS), &curr.dict.without(LOCK_LINKS)) {
        return Some(messages::locked_field_modified(&prev.name));
    }
    let prev_kids = kid_dicts(pair.prev, prev.dict);
    let curr_kids = kid_dicts(pair.curr, curr.dict);
    if curr_kids.len() > prev_kids.len() {
        return Some(messages::locked_field_kids_added(&prev.name));
    }
    if curr_kids.len() < prev_kids.len() {
        return Some(messages::locked_field_kids_removed(&prev.name));
    }
    for (a, b) in prev_kids.iter().zip(&curr_kids) {
        match (a, b) {
            (Some(a), Some(b)) if is_pure_widget(a) && is_pure_widget(b) => {
                let widget_links = &[names::PARENT, names::P];
                if !cmp.equal_dicts(&a.without(widget_links), &b.without(widget_links)) {
                    return Some(messages::locked_field_modified(&prev.name));
                }
            }
            // Child fields are checked under their own names.
            (Some(a), Some(b)) if !is_pure_widget(a) && !is_pure_widget(b) => {}
            _ => return Some(messages::locked_field_modified(&prev.name)),
        }
    }
    None
}

/// Resolved `/Kids` entries, `None` for entries that are not dictionaries.
fn kid_dicts<'g>(graph: &'g ObjectGraph, field: &'g Dictionary) -> Vec<Option<&'g Dictionary>> {
    graph
        .array_entry(field, names::KIDS)
        .and_then(|n| n.as_array())
        .map(|kids| kids.iter().map(|k| graph.resolve_dict(k)).collect())
        .unwrap_or_default()
}

/// Default resources and appearance: frozen below annotation level, grow-only at it.
fn check_resources(
    pair: &CatalogPair<'_>,
    cmp: &ObjectComparator<'_>,
    prev_form: &Dictionary,
    curr_form: &Dictionary,
    level: AccessPermissions,
) -> bool {
    let prev_da = prev_form.get(names::DA);
    let curr_da = curr_form.get(names::DA);
    let prev_dr = prev_form.get(names::DR);
    let curr_dr = curr_form.get(names::DR);
    if level < AccessPermissions::AnnotationModification {
        return cmp.equal_opt(prev_da, curr_da) && cmp.equal_opt(prev_dr, curr_dr);
    }

    if prev_da.is_some() && !cmp.equal_opt(prev_da, curr_da) {
        return false;
    }
    let Some(prev_dr) = prev_dr.and_then(|d| pair.prev.resolve_dict(d)) else {
        return true;
    };
    let Some(curr_dr) = curr_dr.and_then(|d| pair.curr.resolve_dict(d)) else {
        return false;
    };
    // Resource categories (Font, XObject, ...) may gain entries, nothing else.
    prev_dr.iter().all(|(category, prev_value)| {
        let Some(curr_value) = curr_dr.get(category) else {
            return false;
        };
        match (pair.prev.resolve_dict(prev_value), pair.curr.resolve_dict(curr_value)) {
            (Some(a), Some(b)) => a
                .iter()
                .all(|(k, v)| b.get(k).is_some_and(|w| cmp.equal(v, w))),
            _ => cmp.equal(prev_value, curr_value),
        }
    })
}

struct FieldCheck {
    ok: bool,
    annots: BTreeSet<ObjRef>,
}

/// Every previous field must survive; new fields may only be signatures.
fn check_fields(
    pair: &CatalogPair<'_>,
    cmp: &ObjectComparator<'_>,
    prev_fields: &FormFields<'_>,
    curr_fields: &FormFields<'_>,
    session: &ValidationSession,
    report: &mut ValidationReport,
) -> FieldCheck {
    let mut out = FieldCheck {
        ok: true,
        annots: BTreeSet::new(),
    };
    let mut matched: Vec<bool> = vec![false; curr_fields.len()];

    for prev in prev_fields.iter() {
        let Some(index) = retrieve_same_field(pair, cmp, prev, curr_fields) else {
            out.ok = invalid(report, messages::field_removed(&prev.name));
            if session.should_stop(out.ok) {
                return out;
            }
            continue;
        };
        matched[index] = true;
        let curr = &curr_fields.fields[index];
        if prev.is_signature() {
            if let Some(prev_value) = prev.value(pair.prev).and_then(|n| n.as_dict()) {
                let same = curr
                    .value(pair.curr)
                    .and_then(|n| n.as_dict())
                    .is_some_and(|curr_value| signature_dicts_equal(cmp, prev_value, curr_value));
                if !same {
                    out.ok = invalid(report, messages::signature_modified(&prev.name));
                    if session.should_stop(out.ok) {
                        return out;
                    }
                    continue;
                }
            }
        }
        out.annots.extend(curr.widget_refs());
    }

    for (field, _) in curr_fields.iter().zip(&matched).filter(|(_, m)| !**m) {
        if !new_field_allowed(pair.curr, field, session.level) {
            out.ok = invalid(report, messages::unexpected_form_field(&field.name));
            if session.should_stop(out.ok) {
                return out;
            }
            continue;
        }
        out.annots.extend(field.widget_refs());
    }
    out
}

/// Index of the current field that is the same object as `prev`, still in place.
fn retrieve_same_field(
    pair: &CatalogPair<'_>,
    cmp: &ObjectComparator<'_>,
    prev: &FormField<'_>,
    curr_fields: &FormFields<'_>,
) -> Option<usize> {
    curr_fields.iter().position(|curr| {
        let same_identity = match (prev.reference, curr.reference) {
            (Some(a), Some(b)) => a == b,
            (None, None) => prev.name == curr.name,
            _ => false,
        };
        same_identity
            && same_link(prev.dict.get(names::PARENT), curr.dict.get(names::PARENT))
            && same_link(prev.dict.get(names::P), curr.dict.get(names::P))
            && cmp.equal_dicts(&prev.dict.without(FILL_IN_KEYS), &curr.dict.without(FILL_IN_KEYS))
            && same_widget_kids(pair, cmp, prev.dict, curr.dict)
    })
}

fn same_widget_kids(
    pair: &CatalogPair<'_>,
    cmp: &ObjectComparator<'_>,
    prev: &Dictionary,
    curr: &Dictionary,
) -> bool {
    let prev_kids = pair.prev.array_entry(prev, names::KIDS).and_then(|n| n.as_array());
    let curr_kids = pair.curr.array_entry(curr, names::KIDS).and_then(|n| n.as_array());
    let (prev_kids, curr_kids) = match (prev_kids, curr_kids) {
        (None, None) => return true,
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };
    if prev_kids.len() != curr_kids.len() {
        // Kids may be added only as new fields, checked separately.
        return prev_kids.len() < curr_kids.len()
            && prev_kids
                .iter()
                .all(|k| curr_kids.iter().any(|c| same_link(Some(k), Some(c))));
    }
    prev_kids.iter().zip(curr_kids).all(|(a, b)| {
        if !same_link(Some(a), Some(b)) {
            return false;
        }
        match (pair.prev.resolve_dict(a), pair.curr.resolve_dict(b)) {
            (Some(x), Some(y)) if is_pure_widget(x) && is_pure_widget(y) => cmp.equal_dicts(
                &x.without(WIDGET_FILL_IN_KEYS),
                &y.without(WIDGET_FILL_IN_KEYS),
            ),
            (Some(x), Some(y)) => !is_pure_widget(x) && !is_pure_widget(y),
            _ => false,
        }
    })
}

fn new_field_allowed(graph: &ObjectGraph, field: &FormField<'_>, level: AccessPermissions) -> bool {
    if !field.is_signature() {
        return false;
    }
    let Some(value) = field.value(graph).and_then(|n| n.as_dict()) else {
        return false;
    };
    level > AccessPermissions::NoChanges || signatures::is_doc_timestamp(value)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{doc, r};
    use super::super::compare_catalogs;
    use super::*;
    use crate::access::LockedFieldSet;

    fn run(
        prev: &ObjectGraph,
        curr: &ObjectGraph,
        level: AccessPermissions,
        locked: &[&str],
    ) -> (bool, ValidationReport, ValidationSession) {
        let mut set = LockedFieldSet::new();
        set.extend(locked.iter().copied());
        let mut session = ValidationSession::new(level, &set, true);
        session.prepare(prev, curr);
        let mut report = ValidationReport::new();
        let ok = compare_catalogs(prev, curr, &mut session, &mut report).unwrap();
        (ok, report, session)
    }

    fn set_field(g: &mut ObjectGraph, key: &str, value: PdfObject) {
        if let Some(PdfObject::Dict(d)) = g.get_mut(r(5)) {
            d.insert(key, value);
        }
    }

    fn add_signature_field(g: &mut ObjectGraph, sig_type: &str) {
        g.insert(r(6), Dictionary::typed(sig_type).into());
        g.insert(
            r(7),
            Dictionary::typed("Annot")
                .with("Subtype", PdfObject::name("Widget"))
                .with("FT", PdfObject::name("Sig"))
                .with("T", PdfObject::text("sig"))
                .with("V", r(6))
                .with("P", r(3))
                .into(),
        );
        if let Some(PdfObject::Dict(form)) = g.get_mut(r(4)) {
            form.insert("Fields", PdfObject::Array(vec![r(5).into(), r(7).into()]));
        }
        if let Some(PdfObject::Dict(page)) = g.get_mut(r(3)) {
            page.insert("Annots", PdfObject::Array(vec![r(5).into(), r(7).into()]));
        }
    }

    #[test]
    fn value_change_of_unlocked_field_passes() {
        let prev = doc();
        let mut curr = doc();
        set_field(&mut curr, "V", PdfObject::text("Bob"));
        let (ok, report, session) = run(&prev, &curr, AccessPermissions::FormFieldsModification, &[]);
        assert!(ok, "{report}");
        assert!(session.checked_annots.contains(&r(5)));
    }

    #[test]
    fn locked_field_value_change_is_invalid() {
        let prev = doc();
        let mut curr = doc();
        set_field(&mut curr, "V", PdfObject::text("Bob"));
        let (ok, report, _) = run(&prev, &curr, AccessPermissions::FormFieldsModification, &["name"]);
        assert!(!ok);
        assert_eq!(report.items()[0].message, messages::locked_field_modified("name"));
        assert_eq!(report.items()[0].check_name, FIELD_MDP_CHECK);
    }

    #[test]
    fn locked_field_kids_added() {
        let prev = doc();
        let mut curr = doc();
        set_field(&mut curr, "Kids", PdfObject::Array(vec![r(8).into()]));
        curr.insert(r(8), Dictionary::typed("Annot").with("Parent", r(5)).into());
        let (_, report, _) = run(&prev, &curr, AccessPermissions::AnnotationModification, &["name"]);
        assert_eq!(report.items()[0].message, messages::locked_field_kids_added("name"));
    }

    #[test]
    fn locked_field_removed() {
        let prev = doc();
        let mut curr = doc();
        curr.insert(r(4), Dictionary::new().with("Fields", PdfObject::Array(vec![])).into());
        let (_, report, _) = run(&prev, &curr, AccessPermissions::AnnotationModification, &["name"]);
        let msgs: Vec<_> = report.items().iter().map(|i| i.message.clone()).collect();
        assert!(msgs.contains(&messages::locked_field_removed("name")));
        assert!(msgs.contains(&messages::field_removed("name")));
    }

    #[test]
    fn default_resources_frozen_below_annotation_level() {
        let prev = doc();
        let mut curr = doc();
        if let Some(PdfObject::Dict(form)) = curr.get_mut(r(4)) {
            form.insert(
                "DR",
                Dictionary::new().with(
                    "Font",
                    Dictionary::new().with("Helv", r(9)).with("ZaDb", r(9)),
                ),
            );
        }
        let (ok, report, _) = run(&prev, &curr, AccessPermissions::FormFieldsModification, &[]);
        assert!(!ok);
        assert_eq!(report.count(ReportItemStatus::Invalid), 1);
        assert_eq!(report.items()[0].message, messages::NOT_ALLOWED_ACROFORM_CHANGES);

        let (ok, _, _) = run(&prev, &curr, AccessPermissions::AnnotationModification, &[]);
        assert!(ok);
    }

    #[test]
    fn default_resources_never_lose_entries() {
        let prev = doc();
        let mut curr = doc();
        if let Some(PdfObject::Dict(form)) = curr.get_mut(r(4)) {
            form.insert("DR", Dictionary::new().with("Font", Dictionary::new()));
        }
        let (ok, _, _) = run(&prev, &curr, AccessPermissions::AnnotationModification, &[]);
        assert!(!ok);
    }

    #[test]
    fn other_form_keys_are_frozen() {
        let prev = doc();
        let mut curr = doc();
        if let Some(PdfObject::Dict(form)) = curr.get_mut(r(4)) {
            form.insert("NeedAppearances", true);
        }
        let (ok, report, _) = run(&prev, &curr, AccessPermissions::AnnotationModification, &[]);
        assert!(!ok);
        assert_eq!(report.items()[0].message, messages::NOT_ALLOWED_ACROFORM_CHANGES);
    }

    #[test]
    fn new_signature_field_allowed_new_text_field_not() {
        let prev = doc();
        let mut curr = doc();
        add_signature_field(&mut curr, "Sig");
        let (ok, report, session) = run(&prev, &curr, AccessPermissions::FormFieldsModification, &[]);
        assert!(ok, "{report}");
        assert!(session.checked_annots.contains(&r(7)));

        let (ok, report, _) = run(&prev, &curr, AccessPermissions::NoChanges, &[]);
        assert!(!ok);
        assert!(report
            .items()
            .iter()
            .any(|i| i.message == messages::unexpected_form_field("sig")));

        let mut stamped = doc();
        add_signature_field(&mut stamped, "DocTimeStamp");
        let (ok, report, _) = run(&prev, &stamped, AccessPermissions::NoChanges, &[]);
        assert!(ok, "{report}");

        let mut text = doc();
        add_signature_field(&mut text, "Sig");
        if let Some(PdfObject::Dict(d)) = text.get_mut(r(7)) {
            d.insert("FT", PdfObject::name("Tx"));
        }
        let (ok, _, _) = run(&prev, &text, AccessPermissions::AnnotationModification, &[]);
        assert!(!ok);
    }

    #[test]
    fn signed_signature_value_must_not_change() {
        let mut prev = doc();
        add_signature_field(&mut prev, "Sig");
        let mut curr = prev.clone();
        curr.insert(r(6), Dictionary::typed("Sig").with("Reason", PdfObject::text("x")).into());
        let (ok, report, _) = run(&prev, &curr, AccessPermissions::AnnotationModification, &[]);
        assert!(!ok);
        assert_eq!(report.items()[0].message, messages::signature_modified("sig"));
    }

    #[test]
    fn field_moved_to_other_object_is_removed() {
        let prev = doc();
        let mut curr = doc();
        let field = curr.get(r(5)).cloned().unwrap();
        curr.insert(r(15), field);
        curr.insert(r(4), Dictionary::new()
            .with("Fields", PdfObject::Array(vec![r(15).into()]))
            .with("DR", Dictionary::new().with("Font", Dictionary::new().with("Helv", r(9))))
            .into());
        let (ok, report, _) = run(&prev, &curr, AccessPermissions::AnnotationModification, &[]);
        assert!(!ok);
        assert!(report.items().iter().any(|i| i.message == messages::field_removed("name")));
    }

    #[test]
    fn malformed_field_is_indeterminate() {
        let prev = doc();
        let mut curr = doc();
        curr.insert(r(8), PdfObject::Int(1));
        if let Some(PdfObject::Dict(form)) = curr.get_mut(r(4)) {
            form.insert("Fields", PdfObject::Array(vec![r(5).into(), r(8).into()]));
        }
        let (_, report, _) = run(&prev, &curr, AccessPermissions::AnnotationModification, &[]);
        assert_eq!(report.items()[0].status, ReportItemStatus::Indeterminate);
        assert_eq!(report.items()[0].message, messages::field_not_dictionary("8 0 R"));
    }
}
