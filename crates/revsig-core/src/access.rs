//! Access-permission tracking across signatures.
//!
//! Walking forward through the revisions, every embedded signature may narrow
//! what later revisions are allowed to change:
//! - the (single) certification signature sets the document-wide level,
//! - approval signatures may only lower it further,
//! - lock policies freeze named fields.
//!
//! The tracker never widens the level. Attempts to do so are reported and ignored.

use std::collections::BTreeSet;

use itertools::Itertools;
use tracing::{debug, info};

use crate::messages;
use crate::report::{ReportItemStatus, ValidationReport, DOC_MDP_CHECK};

/// Ordered access-permission levels. Narrowing is `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessPermissions {
    NoChanges,
    FormFieldsModification,
    AnnotationModification,
    Unspecified,
}

impl AccessPermissions {
    /// Level used when nothing else is known.
    pub const DEFAULT: Self = Self::AnnotationModification;

    /// Level assumed for an out-of-range declared value.
    pub const FALLBACK: Self = Self::FormFieldsModification;

    /// Map a declared `/P` value.
    pub fn from_docmdp(p: i64) -> Option<Self> {
        match p {
            1 => Some(Self::NoChanges),
            2 => Some(Self::FormFieldsModification),
            3 => Some(Self::AnnotationModification),
            _ => None,
        }
    }

    pub fn as_docmdp(&self) -> Option<i64> {
        match self {
            Self::NoChanges => Some(1),
            Self::FormFieldsModification => Some(2),
            Self::AnnotationModification => Some(3),
            Self::Unspecified => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoChanges => "no-changes",
            Self::FormFieldsModification => "form-fields-modification",
            Self::AnnotationModification => "annotation-modification",
            Self::Unspecified => "unspecified",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no-changes" | "1" => Some(Self::NoChanges),
            "form-fields-modification" | "2" => Some(Self::FormFieldsModification),
            "annotation-modification" | "3" => Some(Self::AnnotationModification),
            "unspecified" => Some(Self::Unspecified),
            _ => None,
        }
    }
}

/// Fully-qualified names of fields frozen by lock policies. Only grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockedFieldSet(BTreeSet<String>);

impl LockedFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// True when `name` or one of its ancestors is locked.
    pub fn covers(&self, name: &str) -> bool {
        if self.contains(name) {
            return true;
        }
        name.match_indices('.')
            .any(|(i, _)| self.contains(&name[..i]))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> Extend<S> for LockedFieldSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.0.insert(name.into());
        }
    }
}

/// `/Action` of a lock policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAction {
    All,
    Include,
    Exclude,
}

/// Field-lock policy of one signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLock {
    pub action: LockAction,
    pub fields: Vec<String>,
}

impl FieldLock {
    /// Names this policy freezes, given every field name present when it was signed.
    pub fn locked_names<'a>(&self, all_fields: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        match self.action {
            LockAction::All => all_fields.into_iter().map(str::to_string).collect(),
            LockAction::Include => self.fields.clone(),
            LockAction::Exclude => all_fields
                .into_iter()
                .filter(|n| !self.fields.iter().any(|f| f == n))
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Position in the signing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningState {
    /// No signature discovered yet.
    Unsigned,
    /// At least one signature discovered, the last one was a certification.
    Certified,
    /// At least one approval signature discovered.
    Approved,
}

/// Effective level + locked fields + signing state for one validation run.
#[derive(Debug, Clone)]
pub struct PermissionTracker {
    level: AccessPermissions,
    overridden: bool,
    locked: LockedFieldSet,
    state: SigningState,
    certification_seen: bool,
}

impl PermissionTracker {
    /// `requested` other than `Unspecified` pins the level for the whole run.
    pub fn new(requested: AccessPermissions) -> Self {
        let overridden = requested != AccessPermissions::Unspecified;
        Self {
            level: if overridden {
                requested
            } else {
                AccessPermissions::DEFAULT
            },
            overridden,
            locked: LockedFieldSet::new(),
            state: SigningState::Unsigned,
            certification_seen: false,
        }
    }

    pub fn level(&self) -> AccessPermissions {
        self.level
    }

    pub fn locked_fields(&self) -> &LockedFieldSet {
        &self.locked
    }

    pub fn state(&self) -> SigningState {
        self.state
    }

    pub fn is_signed(&self) -> bool {
        self.state != SigningState::Unsigned
    }

    pub fn is_overridden(&self) -> bool {
        self.overridden
    }

    /// Certification signature discovered. `declared` is its raw `/P` (if any).
    pub fn certify(&mut self, signature: &str, declared: Option<i64>, report: &mut ValidationReport) {
        if self.certification_seen {
            report.push(
                DOC_MDP_CHECK,
                messages::TOO_MANY_CERTIFICATION_SIGNATURES,
                ReportItemStatus::Indeterminate,
            );
            return;
        }
        if self.state == SigningState::Approved {
            report.push(
                DOC_MDP_CHECK,
                messages::certification_after_approval(signature),
                ReportItemStatus::Indeterminate,
            );
            return;
        }

        self.certification_seen = true;
        self.state = SigningState::Certified;

        let level = match declared {
            None => AccessPermissions::FALLBACK,
            Some(p) => AccessPermissions::from_docmdp(p).unwrap_or_else(|| {
                report.push(
                    DOC_MDP_CHECK,
                    messages::unknown_access_permissions(signature),
                    ReportItemStatus::Indeterminate,
                );
                AccessPermissions::FALLBACK
            }),
        };

        if self.overridden {
            debug!(signature, "access permissions pinned by configuration");
            return;
        }
        info!(signature, level = level.as_str(), "certification signature");
        self.level = level;
    }

    /// Approval signature discovered. `declared` is the `/P` of its lock policy (if any).
    pub fn approve(&mut self, signature: &str, declared: Option<i64>, report: &mut ValidationReport) {
        self.state = SigningState::Approved;

        let Some(p) = declared else {
            return;
        };
        let Some(level) = AccessPermissions::from_docmdp(p) else {
            report.push(
                DOC_MDP_CHECK,
                messages::unknown_access_permissions(signature),
                ReportItemStatus::Indeterminate,
            );
            return;
        };
        if self.overridden {
            return;
        }
        if level > self.level {
            report.push(
                DOC_MDP_CHECK,
                messages::access_permissions_added(signature),
                ReportItemStatus::Indeterminate,
            );
            return;
        }
        info!(signature, level = level.as_str(), "approval signature narrows access");
        self.level = level;
    }

    /// Freeze every field the policy names.
    pub fn lock<'a>(&mut self, lock: &FieldLock, all_fields: impl IntoIterator<Item = &'a str>) {
        let names = lock.locked_names(all_fields);
        debug!(fields = %names.iter().join(", "), "fields locked");
        self.locked.extend(names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ValidationResult;

    #[test]
    fn levels_are_ordered() {
        assert!(AccessPermissions::NoChanges < AccessPermissions::FormFieldsModification);
        assert!(AccessPermissions::FormFieldsModification < AccessPermissions::AnnotationModification);
        assert!(AccessPermissions::AnnotationModification < AccessPermissions::Unspecified);
    }

    #[test]
    fn docmdp_mapping() {
        assert_eq!(AccessPermissions::from_docmdp(1), Some(AccessPermissions::NoChanges));
        assert_eq!(AccessPermissions::from_docmdp(4), None);
        assert_eq!(AccessPermissions::AnnotationModification.as_docmdp(), Some(3));
        assert_eq!(AccessPermissions::parse("2"), Some(AccessPermissions::FormFieldsModification));
    }

    #[test]
    fn certification_sets_level_once() {
        let mut t = PermissionTracker::new(AccessPermissions::Unspecified);
        let mut r = ValidationReport::new();
        t.certify("sig1", Some(2), &mut r);
        assert_eq!(t.level(), AccessPermissions::FormFieldsModification);
        assert!(r.is_empty());

        t.certify("sig2", Some(1), &mut r);
        assert_eq!(t.level(), AccessPermissions::FormFieldsModification);
        assert_eq!(r.items()[0].message, messages::TOO_MANY_CERTIFICATION_SIGNATURES);
        assert_eq!(r.validation_result(), ValidationResult::Indeterminate);
    }

    #[test]
    fn certification_after_approval_is_ignored() {
        let mut t = PermissionTracker::new(AccessPermissions::Unspecified);
        let mut r = ValidationReport::new();
        t.approve("a", None, &mut r);
        t.certify("c", Some(1), &mut r);
        assert_eq!(t.level(), AccessPermissions::DEFAULT);
        assert_eq!(r.count(ReportItemStatus::Indeterminate), 1);
    }

    #[test]
    fn undefined_level_falls_back() {
        let mut t = PermissionTracker::new(AccessPermissions::Unspecified);
        let mut r = ValidationReport::new();
        t.certify("c", Some(9), &mut r);
        assert_eq!(t.level(), AccessPermissions::FALLBACK);
        assert_eq!(r.count(ReportItemStatus::Indeterminate), 1);
    }

    #[test]
    fn approval_cannot_raise_level() {
        let mut t = PermissionTracker::new(AccessPermissions::Unspecified);
        let mut r = ValidationReport::new();
        t.certify("c", Some(2), &mut r);
        t.approve("a", Some(3), &mut r);
        assert_eq!(t.level(), AccessPermissions::FormFieldsModification);
        assert_eq!(r.count(ReportItemStatus::Indeterminate), 1);
        assert_eq!(r.count(ReportItemStatus::Invalid), 0);

        t.approve("b", Some(1), &mut r);
        assert_eq!(t.level(), AccessPermissions::NoChanges);
    }

    #[test]
    fn override_pins_level() {
        let mut t = PermissionTracker::new(AccessPermissions::AnnotationModification);
        let mut r = ValidationReport::new();
        t.certify("c", Some(1), &mut r);
        t.approve("a", Some(1), &mut r);
        assert!(t.is_overridden());
        assert_eq!(t.level(), AccessPermissions::AnnotationModification);
    }

    #[test]
    fn lock_actions() {
        let all = ["a", "b", "c"];
        let inc = FieldLock {
            action: LockAction::Include,
            fields: vec!["b".into()],
        };
        let exc = FieldLock {
            action: LockAction::Exclude,
            fields: vec!["b".into()],
        };
        let every = FieldLock {
            action: LockAction::All,
            fields: vec![],
        };
        assert_eq!(inc.locked_names(all), vec!["b".to_string()]);
        assert_eq!(exc.locked_names(all), vec!["a".to_string(), "c".to_string()]);
        assert_eq!(every.locked_names(all).len(), 3);
    }

    #[test]
    fn locked_set_only_grows() {
        let mut t = PermissionTracker::new(AccessPermissions::Unspecified);
        let lock = FieldLock {
            action: LockAction::Include,
            fields: vec!["name".into()],
        };
        t.lock(&lock, ["name", "other"]);
        t.lock(&lock, ["name"]);
        assert_eq!(t.locked_fields().len(), 1);
        assert!(t.locked_fields().contains("name"));
    }

    #[test]
    fn locking_a_parent_covers_descendants() {
        let mut set = LockedFieldSet::new();
        set.insert("person");
        assert!(set.covers("person"));
        assert!(set.covers("person.name.first"));
        assert!(!set.covers("personal"));
    }
}
