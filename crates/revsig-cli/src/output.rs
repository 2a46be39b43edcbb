use std::io::{self, Write};
use std::sync::OnceLock;

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use revsig_core::report::{ReportItemStatus, ValidationReport, ValidationResult};

static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn init(json: bool) {
    let _ = JSON_MODE.set(json);
}

pub fn is_json() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

pub fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    println!("{s}");
    Ok(())
}

pub fn eprintln_line(msg: &str) {
    let _ = writeln!(io::stderr(), "{msg}");
}

pub fn stdout() -> StandardStream {
    StandardStream::stdout(ColorChoice::Auto)
}

fn result_color(result: ValidationResult) -> Color {
    match result {
        ValidationResult::Valid => Color::Green,
        ValidationResult::Indeterminate => Color::Yellow,
        ValidationResult::Invalid => Color::Red,
    }
}

fn status_color(status: ReportItemStatus) -> Color {
    match status {
        ReportItemStatus::Info => Color::Cyan,
        ReportItemStatus::Indeterminate => Color::Yellow,
        ReportItemStatus::Invalid => Color::Red,
    }
}

/// Human-readable report: the overall result, then one line per finding.
pub fn write_report(out: &mut impl WriteColor, report: &ValidationReport) -> io::Result<()> {
    let result = report.validation_result();
    write!(out, "result: ")?;
    out.set_color(ColorSpec::new().set_fg(Some(result_color(result))).set_bold(true))?;
    writeln!(out, "{}", result_label(result))?;
    out.reset()?;
    if let Some(at) = &report.validated_at {
        writeln!(out, "validated at: {at}")?;
    }

    for item in report.items() {
        write!(out, "  ")?;
        out.set_color(ColorSpec::new().set_fg(Some(status_color(item.status))))?;
        write!(out, "[{}]", item.status.as_str())?;
        out.reset()?;
        write!(out, " {} {}", item.check_name, item.message)?;
        if let Some(cause) = &item.cause {
            write!(out, " (cause: {cause})")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn result_label(result: ValidationResult) -> &'static str {
    match result {
        ValidationResult::Valid => "valid",
        ValidationResult::Indeterminate => "indeterminate",
        ValidationResult::Invalid => "invalid",
    }
}
