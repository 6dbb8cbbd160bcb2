//! Whole-trace snapshot I/O.
//!
//! Retained traces can be saved for offline study and reloaded exactly.
//! Supports JSON/CBOR with extension-based auto-detection; these routines
//! only move the [`Trace`] struct across the wire, they impose no solver
//! semantics.

use crate::record::Trace;
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/* ---------------- JSON ---------------- */

/// Read a [`Trace`] from **JSON**.
///
/// Errors include file open, decoding, or malformed structure.
pub fn read_trace_json<P: AsRef<Path>>(path: P) -> Result<Trace> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let rdr = BufReader::new(f);
    let v: Trace = serde_json::from_reader(rdr).with_context(|| "deserialize JSON trace")?;
    Ok(v)
}

/// Write a [`Trace`] to **JSON** (pretty).
pub fn write_trace_json<P: AsRef<Path>>(path: P, v: &Trace) -> Result<()> {
    let path_ref = path.as_ref();
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, v).with_context(|| "serialize JSON trace")?;
    w.flush().with_context(|| "flush JSON writer")?;
    Ok(())
}

/* ---------------- CBOR ---------------- */

/// Read a [`Trace`] from **CBOR**.
pub fn read_trace_cbor<P: AsRef<Path>>(path: P) -> Result<Trace> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let mut rdr = BufReader::new(f);
    let v: Trace =
        ciborium::de::from_reader(&mut rdr).with_context(|| "deserialize CBOR trace")?;
    Ok(v)
}

/// Write a [`Trace`] to **CBOR**.
pub fn write_trace_cbor<P: AsRef<Path>>(path: P, v: &Trace) -> Result<()> {
    let path_ref = path.as_ref();
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(v, &mut w).with_context(|| "serialize CBOR trace")?;
    w.flush().with_context(|| "flush CBOR writer")?;
    Ok(())
}

/* --------------- Auto-detect by extension --------------- */

/// Auto-detect **read** by extension (`.json` / `.cbor`, case-insensitive).
pub fn read_trace_auto<P: AsRef<Path>>(path: P) -> Result<Trace> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("json") => read_trace_json(path),
        Some("cbor") => read_trace_cbor(path),
        Some(other) => Err(anyhow!(
            "unsupported trace extension: {} (supported: .json, .cbor)",
            other
        )),
        None => Err(anyhow!("path has no extension (expected .json or .cbor)")),
    }
}

/// Auto-detect **write** (defaults to JSON if unknown/missing).
pub fn write_trace_auto<P: AsRef<Path>>(path: P, v: &Trace) -> Result<()> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("cbor") => write_trace_cbor(path, v),
        _ => write_trace_json(path, v),
    }
}

/* ---------------- Small helpers ---------------- */

#[inline]
fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase())
}

#[inline]
fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{StatusCode, TerminalStatus, TraceRecord, TRACE_VERSION};
    use num::BigRational;
    use sxtrace_model::VariableId;

    fn tiny_trace() -> Trace {
        Trace {
            version: TRACE_VERSION,
            num_rows: 1,
            num_cols: 1,
            records: vec![TraceRecord {
                iteration: 0,
                objective: BigRational::new(22.into(), 7.into()),
                basis: vec![VariableId::Row(0)],
                basic_values: vec![BigRational::new(1.into(), 3.into())],
                status: vec![StatusCode::Basic, StatusCode::NonbasicLower],
            }],
            terminal: TerminalStatus::Optimal,
        }
    }

    #[test]
    fn json_roundtrip_preserves_rationals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.json");
        let trace = tiny_trace();
        write_trace_auto(&path, &trace).unwrap();
        let back = read_trace_auto(&path).unwrap();
        assert_eq!(back, trace);
    }

    #[test]
    fn cbor_roundtrip_preserves_rationals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.cbor");
        let trace = tiny_trace();
        write_trace_auto(&path, &trace).unwrap();
        let back = read_trace_auto(&path).unwrap();
        assert_eq!(back, trace);
    }

    #[test]
    fn unknown_read_extension_is_rejected() {
        assert!(read_trace_auto("trace.txt").is_err());
    }
}
