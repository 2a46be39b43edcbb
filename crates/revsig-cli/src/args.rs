use clap::{Parser, Subcommand};

use revsig_core::access::AccessPermissions;
use revsig_core::report::ReportItemStatus;

#[derive(Parser, Debug, Clone)]
#[command(name = "revsig", version, about = "Incremental-revision integrity validation")]
pub struct Cli {
    /// Emit JSON output on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Validate every revision of a journal against its signatures.
    Validate {
        /// Journal file, or `-` for stdin.
        input: String,

        /// Pin the access level: no-changes|form-fields-modification|annotation-modification (or 1-3).
        #[arg(long, value_parser = parse_access_permissions)]
        access_permissions: Option<AccessPermissions>,

        /// Severity of unexpected cross-reference entries: indeterminate|invalid
        #[arg(long, default_value = "invalid", value_parser = parse_status)]
        xref_status: ReportItemStatus,

        /// Stop at the first invalid finding.
        #[arg(long)]
        stop_on_failure: bool,

        /// Refuse documents with more revisions than this.
        #[arg(long)]
        max_revisions: Option<usize>,

        /// Timestamp recorded in the report (ISO-8601).
        #[arg(long)]
        at: Option<String>,
    },

    /// List the revisions of a journal and the signatures covering them.
    Inspect {
        /// Journal file, or `-` for stdin.
        input: String,
    },
}

fn parse_access_permissions(s: &str) -> Result<AccessPermissions, String> {
    AccessPermissions::parse(s).ok_or_else(|| format!("unknown access permissions level: {s}"))
}

fn parse_status(s: &str) -> Result<ReportItemStatus, String> {
    match ReportItemStatus::parse(s) {
        Some(ReportItemStatus::Info) | None => Err(format!("status must be indeterminate or invalid, got {s}")),
        Some(status) => Ok(status),
    }
}
