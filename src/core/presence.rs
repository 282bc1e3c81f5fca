//! Purpose: First-pass key presence and coarse type checks over an untyped event object.
//! Exports: `REQUIRED_EVENT_KEYS`, `RawObject`, `validate_required_keys`.
//! Role: Distinguishes "key absent" from "key present but empty" before typed decoding.
//! Invariants: Keys are checked in declared order; only the first missing key is reported.
//! Invariants: A repeated key keeps its last value; the typed pass sees the same object.
//! Invariants: Pure over the provided map; never logs, never mutates.

use std::collections::BTreeMap;

use serde_json::value::RawValue;

use crate::core::error::{Error, ErrorKind};

pub const REQUIRED_EVENT_KEYS: &[&str] = &[
    "schemaVersion",
    "id",
    "timestamp",
    "sourceType",
    "projectRoot",
    "phpSapi",
    "requestId",
    "isDd",
    "payloadFormat",
    "payload",
    "trace",
    "host",
];

/// Top-level event object with each member kept as its raw JSON text.
pub type RawObject = BTreeMap<String, Box<RawValue>>;

pub fn validate_required_keys(raw: &RawObject) -> Result<(), Error> {
    if let Some(missing) = REQUIRED_EVENT_KEYS.iter().find(|key| !raw.contains_key(**key)) {
        return Err(Error::new(ErrorKind::MissingField)
            .with_message(format!("missing required dump event field: {missing}"))
            .with_field(*missing));
    }

    if !raw_text(raw, "requestId").is_some_and(|text| text == "null" || text.starts_with('"')) {
        return Err(invalid("requestId", "requestId must be null or string"));
    }

    if !raw_text(raw, "isDd").is_some_and(|text| text == "true" || text == "false") {
        return Err(invalid("isDd", "isDd must be a boolean"));
    }

    if !raw_text(raw, "trace").is_some_and(|text| text.starts_with('[')) {
        return Err(invalid("trace", "trace must be an array"));
    }

    Ok(())
}

// The parser has already validated each member, so the leading token decides its JSON type.
fn raw_text<'a>(raw: &'a RawObject, key: &str) -> Option<&'a str> {
    raw.get(key).map(|value| value.get().trim_start())
}

fn invalid(field: &str, message: &str) -> Error {
    Error::new(ErrorKind::InvalidField)
        .with_message(message)
        .with_field(field)
}
