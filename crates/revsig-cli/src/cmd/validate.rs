use std::process::ExitCode;

use anyhow::{Context, Result};

use revsig_core::access::AccessPermissions;
use revsig_core::config::{ValidationContext, ValidatorConfig};
use revsig_core::report::{ReportItemStatus, ValidationResult};
use revsig_core::validator::RevisionValidator;

use crate::io::input;
use crate::output;

/// Exit code when at least one finding is invalid.
const EXIT_INVALID: u8 = 2;
/// Exit code when the worst finding is indeterminate.
const EXIT_INDETERMINATE: u8 = 3;

#[derive(Debug, Clone)]
pub struct ValidateArgs {
    pub input: String,
    pub access_permissions: Option<AccessPermissions>,
    pub xref_status: ReportItemStatus,
    pub stop_on_failure: bool,
    pub max_revisions: Option<usize>,
    pub at: Option<String>,
}

impl ValidateArgs {
    fn config(&self) -> ValidatorConfig {
        let mut cfg = ValidatorConfig::default()
            .with_access_permissions(self.access_permissions.unwrap_or(AccessPermissions::Unspecified))
            .with_unexpected_xref_changes_status(self.xref_status)
            .with_continue_after_failure(!self.stop_on_failure);
        if let Some(max) = self.max_revisions {
            cfg.limits.max_revisions = max;
        }
        cfg
    }
}

pub fn run(args: ValidateArgs) -> Result<ExitCode> {
    let journal = input::read_journal(&args.input)?;
    let validator = RevisionValidator::new(args.config()).context("invalid validator configuration")?;

    let mut ctx = match &args.at {
        Some(at) => ValidationContext::at(at.clone()),
        None => ValidationContext::default(),
    };
    ctx.set_param("input", args.input.clone());

    let report = validator
        .validate_all_revisions(&ctx, &journal)
        .with_context(|| format!("validating {}", args.input))?;

    if output::is_json() {
        output::print(&report)?;
    } else {
        let mut out = output::stdout();
        output::write_report(&mut out, &report)?;
    }

    Ok(match report.validation_result() {
        ValidationResult::Valid => ExitCode::SUCCESS,
        ValidationResult::Indeterminate => ExitCode::from(EXIT_INDETERMINATE),
        ValidationResult::Invalid => ExitCode::from(EXIT_INVALID),
    })
}
