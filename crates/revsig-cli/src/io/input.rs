use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use revsig_core::journal::Journal;

/// Load a journal from a file, or from stdin when `input` is `-`.
pub fn read_journal(input: &str) -> Result<Journal> {
    let bytes = if input == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("reading journal from stdin")?;
        buf
    } else {
        read_file(input)?
    };
    tracing::debug!(input, bytes = bytes.len(), "journal loaded");
    Ok(Journal::from_bytes(bytes))
}

fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).with_context(|| format!("reading journal {}", path.display()))
}
