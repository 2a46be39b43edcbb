//! Validation report.
//!
//! The report is an append-only, ordered log of findings. It is returned even
//! when validation fails so callers can show every finding, not just the first.

use std::fmt;

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

/// Check name for document-wide permission findings.
pub const DOC_MDP_CHECK: &str = "DocMDP check.";
/// Check name for per-field lock findings.
pub const FIELD_MDP_CHECK: &str = "FieldMDP check.";

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum ReportItemStatus {
    Info,
    Indeterminate,
    Invalid,
}

impl ReportItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Indeterminate => "indeterminate",
            Self::Invalid => "invalid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "indeterminate" => Some(Self::Indeterminate),
            "invalid" => Some(Self::Invalid),
            _ => None,
        }
    }
}

/// Overall outcome derived from the findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum ValidationResult {
    Valid,
    Indeterminate,
    Invalid,
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct ReportItem {
    pub check_name: String,
    pub message: String,
    pub status: ReportItemStatus,
    #[cfg_attr(feature = "json", serde(default, skip_serializing_if = "Option::is_none"))]
    pub cause: Option<String>,
}

impl ReportItem {
    pub fn new(
        check_name: impl Into<String>,
        message: impl Into<String>,
        status: ReportItemStatus,
    ) -> Self {
        Self {
            check_name: check_name.into(),
            message: message.into(),
            status,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

impl fmt::Display for ReportItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.status.as_str(), self.check_name, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " (cause: {cause})")?;
        }
        Ok(())
    }
}

/// Ordered log of findings for one top-level validation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct ValidationReport {
    /// Timestamp injected by the caller through the validation context.
    #[cfg_attr(feature = "json", serde(default, skip_serializing_if = "Option::is_none"))]
    pub validated_at: Option<String>,
    items: Vec<ReportItem>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: ReportItem) {
        self.items.push(item);
    }

    pub fn push(
        &mut self,
        check_name: &str,
        message: impl Into<String>,
        status: ReportItemStatus,
    ) {
        self.add(ReportItem::new(check_name, message, status));
    }

    /// Append every item of `other`, keeping order.
    pub fn merge(&mut self, other: ValidationReport) {
        self.items.extend(other.items);
    }

    pub fn items(&self) -> &[ReportItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items with `Invalid` or `Indeterminate` status.
    pub fn failures(&self) -> impl Iterator<Item = &ReportItem> {
        self.items
            .iter()
            .filter(|i| i.status != ReportItemStatus::Info)
    }

    pub fn count(&self, status: ReportItemStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    pub fn has_invalid(&self) -> bool {
        self.count(ReportItemStatus::Invalid) > 0
    }

    pub fn validation_result(&self) -> ValidationResult {
        match self.items.iter().map(|i| i.status).max() {
            Some(ReportItemStatus::Invalid) => ValidationResult::Invalid,
            Some(ReportItemStatus::Indeterminate) => ValidationResult::Indeterminate,
            Some(ReportItemStatus::Info) | None => ValidationResult::Valid,
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "validation result: {:?}", self.validation_result())?;
        for item in &self.items {
            writeln!(f, "  {item}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_is_worst_status() {
        let mut r = ValidationReport::new();
        assert_eq!(r.validation_result(), ValidationResult::Valid);

        r.push(DOC_MDP_CHECK, "info", ReportItemStatus::Info);
        assert_eq!(r.validation_result(), ValidationResult::Valid);

        r.push(DOC_MDP_CHECK, "odd", ReportItemStatus::Indeterminate);
        assert_eq!(r.validation_result(), ValidationResult::Indeterminate);

        r.push(FIELD_MDP_CHECK, "bad", ReportItemStatus::Invalid);
        assert_eq!(r.validation_result(), ValidationResult::Invalid);
        assert_eq!(r.failures().count(), 2);
    }

    #[test]
    fn merge_keeps_order() {
        let mut a = ValidationReport::new();
        a.push(DOC_MDP_CHECK, "first", ReportItemStatus::Info);
        let mut b = ValidationReport::new();
        b.push(DOC_MDP_CHECK, "second", ReportItemStatus::Invalid);
        a.merge(b);
        let msgs: Vec<_> = a.items().iter().map(|i| i.message.as_str()).collect();
        assert_eq!(msgs, vec!["first", "second"]);
    }

    #[test]
    fn display_includes_cause() {
        let item = ReportItem::new(DOC_MDP_CHECK, "boom", ReportItemStatus::Indeterminate)
            .with_cause("truncated");
        assert_eq!(
            item.to_string(),
            "[indeterminate] DocMDP check. boom (cause: truncated)"
        );
    }
}
