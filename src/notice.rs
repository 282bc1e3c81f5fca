//! Purpose: Non-fatal stderr diagnostics emitted while decoding a stream.
//! Exports: `NoticeKind`, `Notice`, `notice_json`.
//! Role: Builds the skip and summary records the CLI prints next to decoded events.
//! Invariants: Notices never reach stdout; the `{"notice":{...}}` envelope is additive-only.
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::ingest::{IngestFailure, IngestOutcome};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// One record was rejected and decoding went on.
    Skip,
    DecodeSummary,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub time: String,
    pub cmd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    pub message: String,
    pub details: Map<String, Value>,
}

impl Notice {
    pub fn skipped(failure: &IngestFailure, time: String) -> Self {
        let mut details = Map::new();
        details.insert("index".to_string(), json!(failure.index));
        details.insert("errorKind".to_string(), json!(format!("{:?}", failure.kind)));
        if let Some(field) = &failure.field {
            details.insert("field".to_string(), json!(field));
        }
        if let Some(snippet) = &failure.snippet {
            details.insert("snippet".to_string(), json!(snippet));
        }
        Self {
            kind: NoticeKind::Skip,
            time,
            cmd: "decode".to_string(),
            line: Some(failure.line),
            message: format!("Skipped record: {}.", failure.message),
            details,
        }
    }

    pub fn decode_summary(outcome: &IngestOutcome, time: String) -> Self {
        let mut details = Map::new();
        details.insert("total".to_string(), json!(outcome.records_total));
        details.insert("ok".to_string(), json!(outcome.ok));
        details.insert("failed".to_string(), json!(outcome.failed));
        let plural = if outcome.failed == 1 { "" } else { "s" };
        Self {
            kind: NoticeKind::DecodeSummary,
            time,
            cmd: "decode".to_string(),
            line: None,
            message: format!("Finished with {} skipped record{plural}.", outcome.failed),
            details,
        }
    }
}

pub fn notice_json(notice: &Notice) -> Value {
    json!({ "notice": notice })
}
