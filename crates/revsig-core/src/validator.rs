//! Revision-by-revision validation of a signed document.
//!
//! The validator walks the revisions oldest first. Before the first signature
//! nothing is checked; from then on every revision is compared against its
//! predecessor under the access level and field locks collected so far, and
//! each signature is registered at the revision whose end its byte range
//! reaches.

use tracing::{debug, info, warn};

use crate::access::PermissionTracker;
use crate::allowed::allowed_references;
use crate::catalog::compare_catalogs;
use crate::config::{validate_config, ValidationContext, ValidatorConfig};
use crate::errors::RevsigResult;
use crate::forms;
use crate::messages;
use crate::model::PdfObject;
use crate::names;
use crate::report::{ReportItem, ReportItemStatus, ValidationReport, DOC_MDP_CHECK};
use crate::revision::{ensure_ordered, Revision, RevisionSource, Snapshot};
use crate::session::ValidationSession;
use crate::signatures;

/// Top-level entry point. Immutable once built; every run keeps its own state.
#[derive(Debug, Clone)]
pub struct RevisionValidator {
    config: ValidatorConfig,
}

impl RevisionValidator {
    pub fn new(config: ValidatorConfig) -> RevsigResult<Self> {
        validate_config(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate every revision of the document behind `source`.
    ///
    /// Findings go to the returned report. `Err` is reserved for broken
    /// invariants of the source itself, such as unordered revisions.
    pub fn validate_all_revisions(
        &self,
        ctx: &ValidationContext,
        source: &dyn RevisionSource,
    ) -> RevsigResult<ValidationReport> {
        let mut report = ValidationReport::new();
        report.validated_at = ctx.clock.now_iso8601.clone();
        debug!(params = ?ctx.params, "revision validation started");

        let revisions = match source.read_revisions() {
            Ok(revisions) => revisions,
            Err(e) => {
                warn!(error = %e, "revisions could not be read");
                report.add(
                    ReportItem::new(
                        DOC_MDP_CHECK,
                        messages::REVISIONS_RETRIEVAL_FAILED,
                        ReportItemStatus::Indeterminate,
                    )
                    .with_cause(e.to_string()),
                );
                return Ok(report);
            }
        };
        ensure_ordered(&revisions)?;
        if revisions.len() > self.config.limits.max_revisions {
            warn!(
                revisions = revisions.len(),
                limit = self.config.limits.max_revisions,
                "revision limit exceeded"
            );
            report.push(
                DOC_MDP_CHECK,
                messages::TOO_MANY_REVISIONS,
                ReportItemStatus::Indeterminate,
            );
            return Ok(report);
        }

        let Some(last) = revisions.last() else {
            report.push(
                DOC_MDP_CHECK,
                messages::DOCUMENT_WITHOUT_SIGNATURES,
                ReportItemStatus::Info,
            );
            return Ok(report);
        };
        let mut pending: Vec<String> = match source.open_snapshot(last) {
            Ok(snapshot) => signatures::signature_names(&snapshot),
            Err(e) => {
                self.reading_failed(&mut report, e.to_string());
                return Ok(report);
            }
        };
        if pending.is_empty() {
            info!("document has no signatures");
            report.push(
                DOC_MDP_CHECK,
                messages::DOCUMENT_WITHOUT_SIGNATURES,
                ReportItemStatus::Info,
            );
            return Ok(report);
        }
        info!(
            revisions = revisions.len(),
            signatures = pending.len(),
            "validating document revisions"
        );

        let mut tracker = PermissionTracker::new(self.config.access_permissions);
        for (i, revision) in revisions.iter().enumerate() {
            if tracker.is_signed() && i > 0 {
                self.validate_pair(source, &revisions[i - 1], revision, &tracker, &mut report);
            }
            if !pending.is_empty() {
                match source.open_snapshot(revision) {
                    Ok(snapshot) => register_signatures(&snapshot, &mut pending, &mut tracker, &mut report),
                    Err(e) => self.reading_failed(&mut report, e.to_string()),
                }
            }
            if !self.config.continue_after_failure && report.has_invalid() {
                debug!(revision = i, "stopping at first failure");
                break;
            }
        }

        if !tracker.is_signed() {
            report.push(
                DOC_MDP_CHECK,
                messages::SIGNATURE_REVISION_NOT_FOUND,
                ReportItemStatus::Invalid,
            );
        } else {
            for name in &pending {
                report.push(
                    DOC_MDP_CHECK,
                    messages::signature_revision_not_found(name),
                    ReportItemStatus::Indeterminate,
                );
            }
        }
        info!(
            result = ?report.validation_result(),
            findings = report.len(),
            "revision validation finished"
        );
        Ok(report)
    }

    fn reading_failed(&self, report: &mut ValidationReport, cause: String) {
        warn!(%cause, "snapshot could not be opened");
        report.add(
            ReportItem::new(
                DOC_MDP_CHECK,
                messages::REVISIONS_READING_EXCEPTION,
                ReportItemStatus::Indeterminate,
            )
            .with_cause(cause),
        );
    }

    /// Compare one revision against its predecessor. Both snapshots are
    /// released when this returns.
    fn validate_pair(
        &self,
        source: &dyn RevisionSource,
        prev_revision: &Revision,
        revision: &Revision,
        tracker: &PermissionTracker,
        report: &mut ValidationReport,
    ) {
        let (prev, curr) = match (
            source.open_snapshot(prev_revision),
            source.open_snapshot(revision),
        ) {
            (Ok(prev), Ok(curr)) => (prev, curr),
            (Err(e), _) | (_, Err(e)) => {
                self.reading_failed(report, e.to_string());
                return;
            }
        };
        debug!(
            end_offset = revision.end_offset,
            level = tracker.level().as_str(),
            locked = tracker.locked_fields().len(),
            "comparing revision"
        );

        let mut session = ValidationSession::new(
            tracker.level(),
            tracker.locked_fields(),
            self.config.continue_after_failure,
        );
        session.prepare(&prev, &curr);
        match compare_catalogs(&prev, &curr, &mut session, report) {
            Ok(true) => self.check_touched_refs(&prev, &curr, revision, &session, report),
            Ok(false) => {}
            Err(e) => self.reading_failed(report, e.to_string()),
        }
    }

    /// Every cross-reference entry of the revision must be explained by an
    /// allowed change.
    fn check_touched_refs(
        &self,
        prev: &Snapshot,
        curr: &Snapshot,
        revision: &Revision,
        session: &ValidationSession,
        report: &mut ValidationReport,
    ) {
        let prev_allowed = allowed_references(prev, session);
        let curr_allowed = allowed_references(curr, session);

        for touched in &revision.touched {
            let reference = touched.reference;
            let num = reference.num;
            if touched.free {
                if reference.is_max_generation_sentinel() || !prev.contains_number(num) {
                    continue;
                }
                // Dropping an allowed object from the allowed set is fine.
                let released = prev_allowed.contains_number(num) && !curr_allowed.contains_number(num);
                if !released {
                    report.push(
                        DOC_MDP_CHECK,
                        messages::object_removed(num),
                        ReportItemStatus::Invalid,
                    );
                }
                continue;
            }

            let allowed = curr_allowed.admits(&prev_allowed, prev.contains(reference), reference);
            if allowed || is_xref_container(curr.get(reference)) {
                continue;
            }
            debug!(%reference, "unexpected cross-reference entry");
            report.push(
                DOC_MDP_CHECK,
                messages::unexpected_entry_in_xref(num),
                self.config.unexpected_xref_changes_status,
            );
        }
    }
}

/// Register every pending signature whose byte range ends at this snapshot.
fn register_signatures(
    snapshot: &Snapshot,
    pending: &mut Vec<String>,
    tracker: &mut PermissionTracker,
    report: &mut ValidationReport,
) {
    let (covering, rest): (Vec<String>, Vec<String>) = pending
        .drain(..)
        .partition(|name| signatures::covers_whole_document(snapshot, name));
    *pending = rest;
    for name in covering {
        let Some(sig) = signatures::find_signature(snapshot, &name) else {
            continue;
        };
        if signatures::is_certification(snapshot, sig.value) {
            let declared = signatures::docmdp_declared(snapshot, sig.value);
            tracker.certify(&name, declared, report);
        } else {
            tracker.approve(&name, signatures::lock_declared(snapshot, sig.field), report);
        }

        let locks = signatures::field_locks(snapshot, &sig, report);
        if !locks.is_empty() {
            let fields = forms::form_fields(snapshot);
            for lock in &locks {
                tracker.lock(lock, fields.names());
            }
        }
        debug!(signature = %name, end_offset = snapshot.len(), "signature registered");
    }
}

/// Cross-reference streams and object streams are rewritten by every save.
fn is_xref_container(object: Option<&PdfObject>) -> bool {
    match object {
        Some(PdfObject::Stream(stream)) => {
            stream.dict.is_type(names::XREF) || stream.dict.is_type(names::OBJ_STM)
        }
        _ => false,
    }
}
