use std::process::ExitCode;

use anyhow::{Context, Result};
use serde::Serialize;

use revsig_core::revision::RevisionSource;
use revsig_core::signatures;

use crate::io::input;
use crate::output;

#[derive(Debug, Serialize)]
pub struct RevisionOut {
    pub index: usize,
    pub end_offset: u64,
    pub objects_written: usize,
    pub objects_freed: usize,
    /// Signatures whose byte range ends at this revision.
    pub signatures: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct InspectOut {
    pub bytes: u64,
    pub revisions: Vec<RevisionOut>,
}

pub fn run(input_arg: &str) -> Result<ExitCode> {
    let journal = input::read_journal(input_arg)?;
    let revisions = journal.read_revisions().context("reading revisions")?;

    let names = match revisions.last() {
        Some(last) => signatures::signature_names(journal.open_snapshot(last)?.graph()),
        None => Vec::new(),
    };

    let mut out = InspectOut {
        bytes: journal.len(),
        revisions: Vec::with_capacity(revisions.len()),
    };
    for (index, revision) in revisions.iter().enumerate() {
        let snapshot = journal
            .open_snapshot(revision)
            .with_context(|| format!("opening revision {index}"))?;
        let covering = names
            .iter()
            .filter(|name| signatures::covers_whole_document(&snapshot, name))
            .cloned()
            .collect();
        let freed = revision.touched.iter().filter(|t| t.free).count();
        out.revisions.push(RevisionOut {
            index,
            end_offset: revision.end_offset,
            objects_written: revision.touched.len() - freed,
            objects_freed: freed,
            signatures: covering,
        });
    }

    if output::is_json() {
        output::print(&out)?;
    } else {
        for r in &out.revisions {
            let signed = if r.signatures.is_empty() {
                String::new()
            } else {
                format!("  signed by {}", r.signatures.join(", "))
            };
            println!(
                "#{:<3} end={:<8} written={:<4} freed={:<4}{signed}",
                r.index, r.end_offset, r.objects_written, r.objects_freed
            );
        }
        output::eprintln_line(&format!("{} revisions, {} bytes", out.revisions.len(), out.bytes));
    }
    Ok(ExitCode::SUCCESS)
}
