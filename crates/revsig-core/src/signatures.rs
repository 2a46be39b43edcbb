//! Signature locator and signature-dictionary accessors.

use crate::access::{FieldLock, LockAction};
use crate::forms::{self, FormField};
use crate::messages;
use crate::model::{Dictionary, ObjRef, ObjectGraph, PdfObject};
use crate::names;
use crate::report::{ReportItemStatus, ValidationReport, DOC_MDP_CHECK};
use crate::revision::Snapshot;

/// A signature field together with its signature value dictionary.
#[derive(Debug, Clone)]
pub struct SignatureField<'g> {
    pub name: String,
    pub field: &'g Dictionary,
    pub field_ref: Option<ObjRef>,
    pub value: &'g Dictionary,
}

fn as_signature<'g>(graph: &'g ObjectGraph, field: &FormField<'g>) -> Option<SignatureField<'g>> {
    if !field.is_signature() {
        return None;
    }
    let value = field.value(graph)?.as_dict()?;
    Some(SignatureField {
        name: field.name.clone(),
        field: field.dict,
        field_ref: field.reference,
        value,
    })
}

/// Names of signed signature fields, in signing order: by the end of their
/// byte range, document order among equals. Signatures without a usable
/// range come last.
pub fn signature_names(graph: &ObjectGraph) -> Vec<String> {
    let mut signed: Vec<(i64, String)> = forms::form_fields(graph)
        .iter()
        .filter_map(|f| as_signature(graph, f))
        .map(|s| (signed_end(graph, s.value), s.name))
        .collect();
    signed.sort_by_key(|(end, _)| *end);
    signed.into_iter().map(|(_, name)| name).collect()
}

fn signed_end(graph: &ObjectGraph, sig: &Dictionary) -> i64 {
    byte_range(graph, sig)
        .and_then(|range| range[2].checked_add(range[3]))
        .unwrap_or(i64::MAX)
}

pub fn find_signature<'g>(graph: &'g ObjectGraph, name: &str) -> Option<SignatureField<'g>> {
    forms::form_fields(graph)
        .get(name)
        .and_then(|f| as_signature(graph, f))
}

/// True when the signature's byte range ends exactly at the end of the snapshot.
pub fn covers_whole_document(snapshot: &Snapshot, name: &str) -> bool {
    let Some(sig) = find_signature(snapshot.graph(), name) else {
        return false;
    };
    let Some(range) = byte_range(snapshot.graph(), sig.value) else {
        return false;
    };
    let covered = range[2].checked_add(range[3]);
    covered.is_some_and(|end| end >= 0 && end as u64 == snapshot.len())
}

/// `/ByteRange` as four integers.
pub fn byte_range(graph: &ObjectGraph, sig: &Dictionary) -> Option<[i64; 4]> {
    let items = graph.array_entry(sig, names::BYTE_RANGE)?.as_array()?;
    if items.len() != 4 {
        return None;
    }
    let mut out = [0i64; 4];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_int()?;
    }
    Some(out)
}

/// Resolved `/Reference` entries (signature reference dictionaries).
pub fn references<'g>(graph: &'g ObjectGraph, sig: &'g Dictionary) -> Vec<&'g Dictionary> {
    graph
        .array_entry(sig, names::REFERENCE)
        .and_then(|n| n.as_array())
        .map(|items| items.iter().filter_map(|i| graph.resolve_dict(i)).collect())
        .unwrap_or_default()
}

fn transform_method<'g>(graph: &'g ObjectGraph, reference: &'g Dictionary) -> Option<&'g str> {
    graph
        .entry(reference, names::TRANSFORM_METHOD)
        .and_then(|n| n.object.as_name())
}

fn transform_params<'g>(graph: &'g ObjectGraph, reference: &'g Dictionary) -> Option<&'g Dictionary> {
    graph
        .dict_entry(reference, names::TRANSFORM_PARAMS)
        .and_then(|n| n.as_dict())
}

/// A certification signature carries a DocMDP transform reference.
pub fn is_certification(graph: &ObjectGraph, sig: &Dictionary) -> bool {
    references(graph, sig)
        .iter()
        .any(|r| transform_method(graph, r) == Some(names::DOC_MDP))
}

/// Raw `/P` of the DocMDP transform parameters.
pub fn docmdp_declared(graph: &ObjectGraph, sig: &Dictionary) -> Option<i64> {
    references(graph, sig)
        .into_iter()
        .filter(|r| transform_method(graph, r) == Some(names::DOC_MDP))
        .find_map(|r| transform_params(graph, r))
        .and_then(|params| params.get_int(names::P))
}

/// Signature type, `Sig` or `DocTimeStamp`.
pub fn is_doc_timestamp(sig: &Dictionary) -> bool {
    sig.is_type(names::DOC_TIME_STAMP)
}

/// `/P` of the field's `/Lock` dictionary.
pub fn lock_declared(graph: &ObjectGraph, field: &Dictionary) -> Option<i64> {
    graph
        .dict_entry(field, names::LOCK)
        .and_then(|n| n.as_dict())
        .and_then(|lock| lock.get_int(names::P))
}

/// Lock policies declared by a signature field and its FieldMDP references.
pub fn field_locks(
    graph: &ObjectGraph,
    sig: &SignatureField<'_>,
    report: &mut ValidationReport,
) -> Vec<FieldLock> {
    let mut out = Vec::new();
    if let Some(lock) = graph.dict_entry(sig.field, names::LOCK).and_then(|n| n.as_dict()) {
        out.push(parse_lock(graph, lock, report));
    }
    for reference in references(graph, sig.value) {
        if transform_method(graph, reference) != Some(names::FIELD_MDP) {
            continue;
        }
        if let Some(params) = transform_params(graph, reference) {
            out.push(parse_lock(graph, params, report));
        }
    }
    out
}

fn parse_lock(graph: &ObjectGraph, lock: &Dictionary, report: &mut ValidationReport) -> FieldLock {
    let action = match lock.get_name(names::ACTION) {
        Some(names::INCLUDE) => LockAction::Include,
        Some(names::EXCLUDE) => LockAction::Exclude,
        Some(names::ALL) => LockAction::All,
        other => {
            let shown = other.map(str::to_string).unwrap_or_else(|| "null".to_string());
            report.push(
                DOC_MDP_CHECK,
                messages::unrecognized_action(&shown),
                ReportItemStatus::Indeterminate,
            );
            LockAction::All
        }
    };
    let fields = graph
        .array_entry(lock, names::FIELDS)
        .and_then(|n| n.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(PdfObject::as_text)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    FieldLock { action, fields }
}
