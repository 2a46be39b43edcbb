//! Configuration structures for revsig-core.
//!
//! The core crate itself does not read environment variables or files. All
//! configuration is provided explicitly by the caller before a run, and is
//! never modified by the run.

use std::collections::BTreeMap;

use crate::access::AccessPermissions;
use crate::errors::{RevsigError, RevsigResult};
use crate::report::ReportItemStatus;

/// Governance knobs for one validator instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// `Unspecified` lets signatures decide; anything else pins the level.
    pub access_permissions: AccessPermissions,
    /// Severity of "unexpected cross-reference entry" findings.
    pub unexpected_xref_changes_status: ReportItemStatus,
    /// Keep checking after the first `Invalid` finding.
    pub continue_after_failure: bool,
    pub limits: LimitsConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            access_permissions: AccessPermissions::Unspecified,
            unexpected_xref_changes_status: ReportItemStatus::Invalid,
            continue_after_failure: true,
            limits: LimitsConfig::default(),
        }
    }
}

impl ValidatorConfig {
    pub fn with_access_permissions(mut self, level: AccessPermissions) -> Self {
        self.access_permissions = level;
        self
    }

    pub fn with_unexpected_xref_changes_status(mut self, status: ReportItemStatus) -> Self {
        self.unexpected_xref_changes_status = status;
        self
    }

    pub fn with_continue_after_failure(mut self, continue_after_failure: bool) -> Self {
        self.continue_after_failure = continue_after_failure;
        self
    }
}

/// Resource limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitsConfig {
    pub max_revisions: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_revisions: 10_000,
        }
    }
}

/// Validate a full configuration object.
pub fn validate_config(cfg: &ValidatorConfig) -> RevsigResult<()> {
    if cfg.unexpected_xref_changes_status == ReportItemStatus::Info {
        return Err(RevsigError::invalid_argument(
            "unexpected_xref_changes_status must be indeterminate or invalid",
        ));
    }

    if cfg.limits.max_revisions == 0 {
        return Err(RevsigError::invalid_argument(
            "max_revisions must be greater than zero",
        ));
    }

    Ok(())
}

/// A deterministic clock abstraction.
///
/// Core does not read system time. A caller that wants the report stamped
/// injects the timestamp here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeterministicClock {
    pub now_iso8601: Option<String>,
}

/// Per-call context handed to the top-level entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationContext {
    pub clock: DeterministicClock,
    /// Caller-defined labels, logged with the run.
    pub params: BTreeMap<String, String>,
}

impl ValidationContext {
    pub fn at(now_iso8601: impl Into<String>) -> Self {
        Self {
            clock: DeterministicClock {
                now_iso8601: Some(now_iso8601.into()),
            },
            params: BTreeMap::new(),
        }
    }

    pub fn set_param(&mut self, k: impl Into<String>, v: impl Into<String>) {
        self.params.insert(k.into(), v.into());
    }

    pub fn get_param(&self, k: &str) -> Option<&str> {
        self.params.get(k).map(|s| s.as_str())
    }
}
