//! Purpose: Split an NDJSON byte stream into records and decode each one.
//! Exports: `ErrorPolicy`, `IngestConfig`, `IngestOutcome`, `IngestFailure`, `ingest`.
//! Role: Stream reader in front of the decoder; used by the CLI and the collector transport.
//! Invariants: Records are handed to the decoder in arrival order, one per line.
//! Invariants: Blank lines are tolerated and never counted as records.
//! Invariants: Per-record buffering is capped at `max_record_bytes`; oversize lines are drained.
use std::io::{self, BufRead, BufReader, Read};

use bstr::ByteSlice;
use tracing::{debug, warn};

use crate::api::{Error, ErrorKind, Event, decode_line};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorPolicy {
    Stop,
    Skip,
}

#[derive(Copy, Clone, Debug)]
pub struct IngestConfig {
    pub errors: ErrorPolicy,
    pub max_record_bytes: usize,
    pub max_snippet_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            errors: ErrorPolicy::Stop,
            max_record_bytes: 1024 * 1024,
            max_snippet_bytes: 200,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct IngestOutcome {
    pub records_total: u64,
    pub ok: u64,
    pub failed: u64,
}

#[derive(Clone, Debug)]
pub struct IngestFailure {
    pub index: u64,
    pub line: u64,
    pub kind: ErrorKind,
    pub field: Option<String>,
    pub message: String,
    pub snippet: Option<String>,
}

fn io_error(err: io::Error, message: &str) -> Error {
    Error::new(ErrorKind::Io)
        .with_message(message)
        .with_source(err)
}

pub fn ingest<R, F, N>(
    reader: R,
    config: IngestConfig,
    mut on_event: F,
    mut on_failure: N,
) -> Result<IngestOutcome, Error>
where
    R: Read,
    F: FnMut(Event, u64) -> Result<(), Error>,
    N: FnMut(IngestFailure),
{
    let mut ok = 0u64;
    let mut failed = 0u64;
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut index = 0u64;
    let mut line_no = 0u64;

    let mut handle_failure =
        |err: Error, index: u64, line_no: u64, snippet: Option<String>| -> Result<(), Error> {
            match config.errors {
                ErrorPolicy::Stop => Err(err.with_line(line_no)),
                ErrorPolicy::Skip => {
                    let message = err.message().unwrap_or("invalid record").to_string();
                    warn!(line = line_no, kind = ?err.kind(), "skipping record: {message}");
                    failed += 1;
                    on_failure(IngestFailure {
                        index,
                        line: line_no,
                        kind: err.kind(),
                        field: err.field().map(str::to_string),
                        message,
                        snippet,
                    });
                    Ok(())
                }
            }
        };

    loop {
        buf.clear();
        let limit = config.max_record_bytes.saturating_add(2) as u64;
        let read = (&mut reader)
            .take(limit)
            .read_until(b'\n', &mut buf)
            .map_err(|err| io_error(err, "failed to read input"))?;
        if read == 0 {
            break;
        }
        line_no += 1;

        let terminated = buf.last() == Some(&b'\n');
        if !terminated && read as u64 == limit {
            index += 1;
            debug!(line = line_no, "draining oversize record");
            let snippet = truncate_bytes(&buf, config.max_snippet_bytes);
            drain_line(&mut reader)?;
            handle_failure(oversize_error(), index, line_no, Some(snippet))?;
            continue;
        }

        let record = buf.trim_end_with(|ch| ch == '\n' || ch == '\r');
        if record.len() > config.max_record_bytes {
            index += 1;
            let snippet = truncate_bytes(record, config.max_snippet_bytes);
            handle_failure(oversize_error(), index, line_no, Some(snippet))?;
            continue;
        }

        let text = match record.to_str() {
            Ok(text) => text,
            Err(err) => {
                index += 1;
                let snippet = truncate_bytes(record, config.max_snippet_bytes);
                let err = Error::new(ErrorKind::Parse)
                    .with_message("record is not valid UTF-8")
                    .with_source(err);
                handle_failure(err, index, line_no, Some(snippet))?;
                continue;
            }
        };
        if text.trim().is_empty() {
            debug!(line = line_no, "skipping blank line");
            continue;
        }

        index += 1;
        match decode_line(text) {
            Ok(Some(event)) => {
                on_event(event, line_no)?;
                ok += 1;
            }
            Ok(None) => {}
            Err(err) => {
                let snippet = truncate_snippet(text, config.max_snippet_bytes);
                handle_failure(err, index, line_no, Some(snippet))?;
            }
        }
    }

    Ok(IngestOutcome {
        records_total: ok + failed,
        ok,
        failed,
    })
}

fn oversize_error() -> Error {
    Error::new(ErrorKind::Usage)
        .with_message("record exceeds size limit")
        .with_hint("Raise --max-record-bytes or split the producer's payload.")
}

fn drain_line<R: BufRead>(reader: &mut R) -> Result<(), Error> {
    loop {
        let available = reader
            .fill_buf()
            .map_err(|err| io_error(err, "failed to read input"))?;
        if available.is_empty() {
            return Ok(());
        }
        if let Some(pos) = available.iter().position(|b| *b == b'\n') {
            reader.consume(pos + 1);
            return Ok(());
        }
        let len = available.len();
        reader.consume(len);
    }
}

fn truncate_snippet(input: &str, max: usize) -> String {
    if input.len() <= max {
        return input.to_string();
    }
    let suffix = "...";
    if max <= suffix.len() {
        return suffix[..max].to_string();
    }
    let mut take = max - suffix.len();
    while !input.is_char_boundary(take) {
        take -= 1;
    }
    format!("{}{suffix}", &input[..take])
}

fn truncate_bytes(input: &[u8], max: usize) -> String {
    let text = input.to_str_lossy();
    truncate_snippet(&text, max)
}
