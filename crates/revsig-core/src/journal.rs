//! Revision journal: a minimal append-only container.
//!
//! A journal is a byte buffer of newline-terminated JSON records. Each record
//! is one increment of the document:
//!
//! ```text
//! {"set":{"1 0 R":{"dict":{...}}},"free":["4 0 R"],"root":"1 0 R"}
//! ```
//!
//! A revision ends just past its record's newline, so end offsets are strictly
//! increasing and every earlier byte is left untouched by later revisions.
//! Materializing a snapshot replays the records inside its byte window.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{RevsigError, RevsigResult};
use crate::model::{ObjRef, ObjectGraph, PdfObject};
use crate::names;
use crate::revision::{Revision, RevisionSource, Snapshot, TouchedRef};

/// Upper bound on fixed-point iterations when sealing a byte range.
const MAX_SEAL_ROUNDS: usize = 8;

/// One record of the journal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Increment {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set: BTreeMap<ObjRef, PdfObject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub free: Vec<ObjRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<ObjRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<ObjRef>,
}

impl Increment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, reference: ObjRef, object: impl Into<PdfObject>) -> Self {
        self.set.insert(reference, object.into());
        self
    }

    pub fn free(mut self, reference: ObjRef) -> Self {
        self.free.push(reference);
        self
    }

    pub fn root(mut self, root: ObjRef) -> Self {
        self.root = Some(root);
        self
    }

    pub fn info(mut self, info: ObjRef) -> Self {
        self.info = Some(info);
        self
    }

    fn touched(&self) -> impl Iterator<Item = TouchedRef> + '_ {
        self.set
            .keys()
            .map(|r| TouchedRef::used(*r))
            .chain(self.free.iter().map(|r| TouchedRef::freed(*r)))
    }

    fn apply(&self, graph: &mut ObjectGraph) {
        for (r, obj) in &self.set {
            graph.insert(*r, obj.clone());
        }
        for r in &self.free {
            graph.remove(*r);
        }
        if let Some(root) = self.root {
            graph.set_root(root);
        }
        if self.info.is_some() {
            graph.set_info(self.info);
        }
    }
}

/// A complete journal held in memory.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    bytes: Bytes,
}

impl Journal {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decoded records with their end offsets.
    pub fn increments(&self) -> RevsigResult<Vec<(u64, Increment)>> {
        records(&self.bytes)?
            .into_iter()
            .map(|(end, line)| decode(line, end).map(|inc| (end, inc)))
            .collect()
    }
}

/// Split a window into `(end_offset, record)` pairs.
fn records(window: &[u8]) -> RevsigResult<Vec<(u64, &[u8])>> {
    let mut out = Vec::new();
    let mut start = 0usize;
    for (i, b) in window.iter().enumerate() {
        if *b == b'\n' {
            out.push(((i + 1) as u64, &window[start..i]));
            start = i + 1;
        }
    }
    if start != window.len() {
        return Err(RevsigError::io(format!(
            "truncated record at offset {start} (no trailing newline)"
        )));
    }
    Ok(out)
}

fn decode(line: &[u8], end: u64) -> RevsigResult<Increment> {
    serde_json::from_slice(line)
        .map_err(|e| RevsigError::io(format!("malformed record ending at offset {end}: {e}")))
}

/// Replay every record of `window` into a fresh graph.
pub fn replay(window: &Bytes) -> RevsigResult<ObjectGraph> {
    let mut graph = ObjectGraph::new();
    for (end, line) in records(window)? {
        decode(line, end)?.apply(&mut graph);
    }
    Ok(graph)
}

impl RevisionSource for Journal {
    fn read_revisions(&self) -> RevsigResult<Vec<Revision>> {
        let revisions: Vec<Revision> = self
            .increments()?
            .into_iter()
            .map(|(end, inc)| Revision::new(end, inc.touched()))
            .collect();
        debug!(count = revisions.len(), "journal revisions read");
        Ok(revisions)
    }

    fn open_snapshot(&self, revision: &Revision) -> RevsigResult<Snapshot> {
        let end = usize::try_from(revision.end_offset)
            .map_err(|_| RevsigError::io("end offset does not fit in memory"))?;
        if end > self.bytes.len() {
            return Err(RevsigError::io(format!(
                "revision end offset {end} is past the end of the journal ({} bytes)",
                self.bytes.len()
            )));
        }
        let window = self.bytes.slice(0..end);
        let graph = replay(&window)?;
        Ok(Snapshot::new(window, graph))
    }
}

/// Appends increments and produces a [`Journal`].
#[derive(Debug, Default)]
pub struct JournalWriter {
    buf: Vec<u8>,
}

impl JournalWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append one increment and return its end offset.
    pub fn append(&mut self, increment: &Increment) -> RevsigResult<u64> {
        let line = encode(increment)?;
        self.buf.extend_from_slice(&line);
        Ok(self.len())
    }

    /// Append an increment carrying the signature value dictionary at `signature`,
    /// sealing its `/ByteRange` so that it covers the document up to the end of
    /// this very increment.
    pub fn append_signed(&mut self, mut increment: Increment, signature: ObjRef) -> RevsigResult<u64> {
        let start = self.len() as i64;
        let mut end = start;
        for _ in 0..MAX_SEAL_ROUNDS {
            let sig = increment
                .set
                .get_mut(&signature)
                .and_then(|o| match o {
                    PdfObject::Dict(d) => Some(d),
                    _ => None,
                })
                .ok_or_else(|| {
                    RevsigError::invalid_argument(format!(
                        "increment does not define signature dictionary {signature}"
                    ))
                })?;
            sig.insert(
                names::BYTE_RANGE,
                PdfObject::Array(vec![
                    PdfObject::Int(0),
                    PdfObject::Int(start),
                    PdfObject::Int(start),
                    PdfObject::Int(end - start),
                ]),
            );
            let line = encode(&increment)?;
            let actual = start + line.len() as i64;
            if actual == end {
                self.buf.extend_from_slice(&line);
                return Ok(self.len());
            }
            end = actual;
        }
        Err(RevsigError::invariant("byte range did not reach a fixed point"))
    }

    pub fn finish(self) -> Journal {
        Journal::from_bytes(self.buf)
    }
}

fn encode(increment: &Increment) -> RevsigResult<Vec<u8>> {
    let mut line = serde_json::to_vec(increment)?;
    line.push(b'\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Dictionary;

    fn r(n: u32) -> ObjRef {
        ObjRef::new(n, 0)
    }

    #[test]
    fn revisions_and_snapshots() {
        let mut w = JournalWriter::new();
        let first = w
            .append(
                &Increment::new()
                    .set(r(1), Dictionary::typed("Catalog"))
                    .set(r(2), PdfObject::Int(7))
                    .root(r(1)),
            )
            .unwrap();
        let second = w
            .append(&Increment::new().set(r(3), PdfObject::Int(8)).free(r(2)))
            .unwrap();
        let journal = w.finish();

        let revs = journal.read_revisions().unwrap();
        assert_eq!(revs.len(), 2);
        assert_eq!(revs[0].end_offset, first);
        assert_eq!(revs[1].end_offset, second);
        assert!(revs[1].touched.contains(&TouchedRef::freed(r(2))));
        assert!(revs[1].touched.contains(&TouchedRef::used(r(3))));

        let s0 = journal.open_snapshot(&revs[0]).unwrap();
        assert!(s0.contains(r(2)));
        assert!(!s0.contains(r(3)));
        assert_eq!(s0.len(), first);

        let s1 = journal.open_snapshot(&revs[1]).unwrap();
        assert!(!s1.contains(r(2)));
        assert_eq!(s1.catalog().unwrap().0, r(1));
    }

    #[test]
    fn truncated_journal_is_io_failure() {
        let journal = Journal::from_bytes(&b"{\"root\":\"1 0 R\"}\n{\"set\""[..]);
        let err = journal.read_revisions().unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn malformed_record_is_io_failure() {
        let journal = Journal::from_bytes(&b"not json\n"[..]);
        assert!(journal.read_revisions().unwrap_err().is_io());
    }

    #[test]
    fn snapshot_past_end_is_io_failure() {
        let journal = Journal::from_bytes(&b"{}\n"[..]);
        let err = journal.open_snapshot(&Revision::new(100, [])).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn signed_increment_covers_itself() {
        let mut w = JournalWriter::new();
        w.append(&Increment::new().set(r(1), Dictionary::typed("Catalog")).root(r(1)))
            .unwrap();
        let end = w
            .append_signed(
                Increment::new().set(r(9), Dictionary::typed("Sig")),
                r(9),
            )
            .unwrap();
        let journal = w.finish();
        let incs = journal.increments().unwrap();
        let sig = incs[1].1.set[&r(9)].as_dict().unwrap();
        let br: Vec<i64> = sig
            .get_array(names::BYTE_RANGE)
            .unwrap()
            .iter()
            .filter_map(PdfObject::as_int)
            .collect();
        assert_eq!(br.len(), 4);
        assert_eq!((br[2] + br[3]) as u64, end);
    }
}
