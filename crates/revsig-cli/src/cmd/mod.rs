use std::process::ExitCode;

use anyhow::Result;

use crate::args::{Cli, Command};

mod inspect;
mod validate;

pub fn dispatch(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Validate {
            input,
            access_permissions,
            xref_status,
            stop_on_failure,
            max_revisions,
            at,
        } => validate::run(validate::ValidateArgs {
            input,
            access_permissions,
            xref_status,
            stop_on_failure,
            max_revisions,
            at,
        }),
        Command::Inspect { input } => inspect::run(&input),
    }
}
