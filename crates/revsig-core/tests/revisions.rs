//! revisions.rs
//!
//! End-to-end validation of journals built with `JournalWriter`: every test
//! writes a small document history and runs the full validator over it.

#![cfg(feature = "json")]

use assert_matches::assert_matches;
use bytes::Bytes;

use revsig_core::messages;
use revsig_core::prelude::*;
use revsig_core::report::{DOC_MDP_CHECK, FIELD_MDP_CHECK};

fn r(n: u32) -> ObjRef {
    ObjRef::new(n, 0)
}

fn arr(items: Vec<PdfObject>) -> PdfObject {
    PdfObject::Array(items)
}

/// Catalog (1), pages (2), page (3) showing widget 5, form (4), text field "name" (5), font (9).
fn base() -> Increment {
    Increment::new()
        .set(
            r(1),
            Dictionary::typed("Catalog")
                .with("Pages", r(2))
                .with("AcroForm", r(4)),
        )
        .set(
            r(2),
            Dictionary::typed("Pages")
                .with("Kids", arr(vec![r(3).into()]))
                .with("Count", 1i64),
        )
        .set(
            r(3),
            Dictionary::typed("Page")
                .with("Parent", r(2))
                .with("Annots", arr(vec![r(5).into()])),
        )
        .set(r(4), form(&[5], default_resources()))
        .set(r(5), text_field("Alice"))
        .set(r(9), Dictionary::typed("Font"))
        .root(r(1))
}

fn default_resources() -> Dictionary {
    Dictionary::new().with("Font", Dictionary::new().with("Helv", r(9)))
}

fn form(fields: &[u32], dr: Dictionary) -> Dictionary {
    Dictionary::new()
        .with("Fields", arr(fields.iter().map(|n| r(*n).into()).collect()))
        .with("DR", dr)
}

fn text_field(value: &str) -> Dictionary {
    Dictionary::typed("Annot")
        .with("Subtype", PdfObject::name("Widget"))
        .with("FT", PdfObject::name("Tx"))
        .with("T", PdfObject::text("name"))
        .with("V", PdfObject::text(value))
        .with("P", r(3))
}

fn signature_field(name: &str, value: u32) -> Dictionary {
    Dictionary::new()
        .with("FT", PdfObject::name("Sig"))
        .with("T", PdfObject::text(name))
        .with("V", r(value))
}

fn certification(p: i64) -> Dictionary {
    Dictionary::typed("Sig").with(
        "Reference",
        arr(vec![Dictionary::typed("SigRef")
            .with("TransformMethod", PdfObject::name("DocMDP"))
            .with("TransformParams", Dictionary::typed("TransformParams").with("P", p))
            .into()]),
    )
}

fn lock(action: &str, fields: &[&str], p: i64) -> Dictionary {
    Dictionary::typed("SigFieldLock")
        .with("Action", PdfObject::name(action))
        .with("Fields", arr(fields.iter().map(|f| PdfObject::text(*f)).collect()))
        .with("P", p)
}

/// Base revision, then an approval signature whose lock declares `p` and locks `locked`.
fn approved(p: i64, locked: &[&str]) -> JournalWriter {
    let mut w = JournalWriter::new();
    w.append(&base()).unwrap();
    w.append_signed(
        Increment::new()
            .set(r(4), form(&[5, 6], default_resources()))
            .set(
                r(6),
                signature_field("approval", 7).with("Lock", lock("Include", locked, p)),
            )
            .set(r(7), Dictionary::typed("Sig")),
        r(7),
    )
    .unwrap();
    w
}

/// Base revision, then a certification signature declaring `p`.
fn certified(p: i64) -> JournalWriter {
    certified_over(base(), p)
}

fn certified_over(first: Increment, p: i64) -> JournalWriter {
    let mut w = JournalWriter::new();
    w.append(&first).unwrap();
    w.append_signed(
        Increment::new()
            .set(r(4), form(&[5, 6], default_resources()))
            .set(r(6), signature_field("cert", 7))
            .set(r(7), certification(p)),
        r(7),
    )
    .unwrap();
    w
}

fn fill_in(value: &str) -> Increment {
    Increment::new().set(r(5), text_field(value))
}

fn validate(journal: &Journal) -> ValidationReport {
    validate_with(journal, ValidatorConfig::default())
}

fn validate_with(journal: &dyn RevisionSource, config: ValidatorConfig) -> ValidationReport {
    RevisionValidator::new(config)
        .unwrap()
        .validate_all_revisions(&ValidationContext::at("2024-05-01T12:00:00Z"), journal)
        .unwrap()
}

fn messages_of(report: &ValidationReport) -> Vec<String> {
    report.items().iter().map(|i| i.message.clone()).collect()
}

#[test]
fn unsigned_document_is_informational() {
    let mut w = JournalWriter::new();
    w.append(&base()).unwrap();
    let report = validate(&w.finish());

    assert_eq!(report.len(), 1);
    let item = &report.items()[0];
    assert_eq!(item.message, messages::DOCUMENT_WITHOUT_SIGNATURES);
    assert_matches!(item.status, ReportItemStatus::Info);
    assert_eq!(report.validation_result(), ValidationResult::Valid);
}

#[test]
fn field_fill_in_after_approval_is_valid() {
    let mut w = approved(2, &[]);
    w.append(&fill_in("Bob")).unwrap();
    let report = validate(&w.finish());

    assert!(!report.has_invalid(), "{report}");
    assert_eq!(report.validation_result(), ValidationResult::Valid);
    assert_eq!(report.validated_at.as_deref(), Some("2024-05-01T12:00:00Z"));
}

#[test]
fn default_resources_change_after_approval_is_invalid() {
    let mut w = approved(2, &[]);
    w.append(
        &fill_in("Bob").set(
            r(4),
            form(&[5, 6], default_resources().with("ProcSet", arr(vec![PdfObject::name("PDF")]))),
        ),
    )
    .unwrap();
    let report = validate(&w.finish());

    let invalid: Vec<&ReportItem> = report
        .items()
        .iter()
        .filter(|i| i.status == ReportItemStatus::Invalid)
        .collect();
    assert_eq!(invalid.len(), 1, "{report}");
    assert_eq!(invalid[0].check_name, DOC_MDP_CHECK);
    assert_eq!(invalid[0].message, messages::NOT_ALLOWED_ACROFORM_CHANGES);
}

#[test]
fn second_certification_is_indeterminate_and_level_is_kept() {
    let mut w = certified(2);
    w.append(&fill_in("Bob")).unwrap();
    w.append_signed(
        Increment::new()
            .set(r(4), form(&[5, 6, 8], default_resources()))
            .set(r(8), signature_field("cert2", 11))
            .set(r(11), certification(1)),
        r(11),
    )
    .unwrap();
    let report = validate(&w.finish());

    assert_eq!(
        messages_of(&report),
        vec![messages::TOO_MANY_CERTIFICATION_SIGNATURES.to_string()]
    );
    assert_matches!(report.items()[0].status, ReportItemStatus::Indeterminate);
}

#[test]
fn locked_field_cannot_change() {
    let mut w = approved(2, &["name"]);
    w.append(&fill_in("Mallory")).unwrap();
    let report = validate(&w.finish());

    let item = report
        .items()
        .iter()
        .find(|i| i.message == messages::locked_field_modified("name"))
        .unwrap_or_else(|| panic!("missing lock finding in {report}"));
    assert_eq!(item.check_name, FIELD_MDP_CHECK);
    assert_eq!(report.validation_result(), ValidationResult::Invalid);
}

#[test]
fn no_changes_certification_forbids_fill_in() {
    let mut w = certified(1);
    w.append(&fill_in("Bob")).unwrap();
    let report = validate(&w.finish());

    assert_eq!(messages_of(&report), vec![messages::unexpected_entry_in_xref(5)]);
    assert_eq!(report.validation_result(), ValidationResult::Invalid);
}

#[test]
fn configured_level_overrides_declared_one() {
    let mut w = certified(1);
    w.append(&fill_in("Bob")).unwrap();
    let journal = w.finish();

    let pinned = ValidatorConfig::default().with_access_permissions(AccessPermissions::FormFieldsModification);
    let report = validate_with(&journal, pinned);
    assert!(!report.has_invalid(), "{report}");
}

#[test]
fn xref_changes_status_is_configurable() {
    let mut w = certified(1);
    w.append(&fill_in("Bob")).unwrap();
    let journal = w.finish();

    let lenient = ValidatorConfig::default().with_unexpected_xref_changes_status(ReportItemStatus::Indeterminate);
    let report = validate_with(&journal, lenient);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
}

#[test]
fn unreferenced_object_may_not_be_freed() {
    let mut w = JournalWriter::new();
    w.append(&base().set(r(12), Dictionary::typed("XObject"))).unwrap();
    w.append_signed(
        Increment::new()
            .set(r(4), form(&[5, 6], default_resources()))
            .set(r(6), signature_field("cert", 7))
            .set(r(7), certification(2)),
        r(7),
    )
    .unwrap();
    w.append(&Increment::new().free(r(12))).unwrap();
    let report = validate(&w.finish());

    assert_eq!(messages_of(&report), vec![messages::object_removed(12)]);
}

#[test]
fn xref_streams_are_never_unexpected() {
    let mut w = certified(2);
    w.append(
        &fill_in("Bob")
            .set(
                r(20),
                PdfObject::Stream(Stream::new(Dictionary::typed("XRef"), Bytes::from_static(b"\x01\x02"))),
            )
            .set(r(21), PdfObject::Stream(Stream::new(Dictionary::typed("ObjStm"), Bytes::new())))
            .set(r(22), Dictionary::typed("Font")),
    )
    .unwrap();
    let report = validate(&w.finish());

    assert_eq!(messages_of(&report), vec![messages::unexpected_entry_in_xref(22)]);
}

#[test]
fn new_page_annotation_needs_annotation_level() {
    let annotate = || {
        Increment::new()
            .set(
                r(3),
                Dictionary::typed("Page")
                    .with("Parent", r(2))
                    .with("Annots", arr(vec![r(5).into(), r(30).into()])),
            )
            .set(
                r(30),
                Dictionary::typed("Annot")
                    .with("Subtype", PdfObject::name("Text"))
                    .with("Contents", PdfObject::text("note")),
            )
    };

    let mut w = certified(3);
    w.append(&annotate()).unwrap();
    let report = validate(&w.finish());
    assert!(!report.has_invalid(), "{report}");

    let mut w = certified(2);
    w.append(&annotate()).unwrap();
    let report = validate(&w.finish());
    assert_eq!(
        messages_of(&report),
        vec![messages::PAGE_ANNOTATIONS_MODIFIED.to_string()]
    );
}

#[test]
fn fill_in_beside_linked_annotation_is_valid() {
    let first = base()
        .set(
            r(3),
            Dictionary::typed("Page")
                .with("Parent", r(2))
                .with("Annots", arr(vec![r(5).into(), r(31).into()])),
        )
        .set(
            r(31),
            Dictionary::typed("Annot")
                .with("Subtype", PdfObject::name("Link"))
                .with("P", r(3)),
        );
    let mut w = certified_over(first, 2);
    w.append(&fill_in("Bob")).unwrap();
    let report = validate(&w.finish());

    assert!(report.is_empty(), "{report}");
}

#[test]
fn fill_in_with_page_destination_in_catalog_is_valid() {
    let first = base().set(
        r(1),
        Dictionary::typed("Catalog")
            .with("Pages", r(2))
            .with("AcroForm", r(4))
            .with("OpenAction", arr(vec![r(3).into(), PdfObject::name("Fit")])),
    );
    let mut w = certified_over(first, 2);
    w.append(&fill_in("Bob")).unwrap();
    let report = validate(&w.finish());

    assert!(report.is_empty(), "{report}");
}

#[test]
fn signatures_are_matched_in_signing_order() {
    let mut w = certified(2);
    w.append_signed(
        Increment::new()
            .set(r(4), form(&[8, 5, 6], default_resources()))
            .set(r(8), signature_field("appr", 11))
            .set(r(11), Dictionary::typed("Sig")),
        r(11),
    )
    .unwrap();
    w.append(&fill_in("Bob")).unwrap();
    let report = validate(&w.finish());

    assert!(report.is_empty(), "{report}");

    // The certification is still enforced for the later revisions.
    let mut w = certified(1);
    w.append(&fill_in("Bob")).unwrap();
    w.append_signed(
        Increment::new()
            .set(r(4), form(&[8, 5, 6], default_resources()))
            .set(r(8), signature_field("appr", 11))
            .set(r(11), Dictionary::typed("Sig")),
        r(11),
    )
    .unwrap();
    let report = validate(&w.finish());
    assert!(messages_of(&report).contains(&messages::unexpected_entry_in_xref(5)), "{report}");
}

#[test]
fn new_field_may_bring_new_objects_but_not_adopt_old_ones() {
    let mut w = certified_over(base().set(r(12), Dictionary::typed("XObject")), 2);
    w.append_signed(
        Increment::new()
            .set(r(4), form(&[5, 6, 8], default_resources()))
            .set(
                r(8),
                signature_field("appr", 11)
                    .with("AP", Dictionary::new().with("N", r(13)))
                    .with("MK", Dictionary::new().with("I", r(12))),
            )
            .set(r(11), Dictionary::typed("Sig"))
            .set(r(12), Dictionary::typed("XObject").with("Subtype", PdfObject::name("Form")))
            .set(r(13), Dictionary::typed("XObject")),
        r(11),
    )
    .unwrap();
    let report = validate(&w.finish());

    assert_eq!(messages_of(&report), vec![messages::unexpected_entry_in_xref(12)]);
}

#[test]
fn stop_on_first_failure_halts_the_walk() {
    let mut w = certified(1);
    w.append(&fill_in("Bob")).unwrap();
    w.append(&fill_in("Carol")).unwrap();
    let journal = w.finish();

    let report = validate(&journal);
    assert_eq!(report.count(ReportItemStatus::Invalid), 2);

    let strict = ValidatorConfig::default().with_continue_after_failure(false);
    let report = validate_with(&journal, strict);
    assert_eq!(report.count(ReportItemStatus::Invalid), 1);
}

/// Delegates to a journal but fails to materialize one revision.
struct Flaky {
    journal: Journal,
    broken_end: u64,
}

impl RevisionSource for Flaky {
    fn read_revisions(&self) -> RevsigResult<Vec<Revision>> {
        self.journal.read_revisions()
    }

    fn open_snapshot(&self, revision: &Revision) -> RevsigResult<Snapshot> {
        if revision.end_offset == self.broken_end {
            return Err(RevsigError::io("checksum mismatch"));
        }
        self.journal.open_snapshot(revision)
    }
}

#[test]
fn unreadable_snapshot_skips_its_pairs() {
    let mut w = certified(2);
    let broken_end = w.append(&fill_in("Bob")).unwrap();
    w.append(&fill_in("Carol")).unwrap();
    let source = Flaky {
        journal: w.finish(),
        broken_end,
    };
    let report = validate_with(&source, ValidatorConfig::default());

    assert_eq!(report.len(), 2);
    for item in report.items() {
        assert_eq!(item.message, messages::REVISIONS_READING_EXCEPTION);
        assert_matches!(item.status, ReportItemStatus::Indeterminate);
        assert!(item.cause.as_deref().unwrap_or_default().contains("checksum mismatch"));
    }
}

#[test]
fn truncated_journal_reports_retrieval_failure() {
    let mut w = certified(2);
    w.append(&fill_in("Bob")).unwrap();
    let mut bytes = w.finish().bytes().to_vec();
    bytes.truncate(bytes.len() - 3);
    let report = validate(&Journal::from_bytes(bytes));

    assert_eq!(messages_of(&report), vec![messages::REVISIONS_RETRIEVAL_FAILED.to_string()]);
}
