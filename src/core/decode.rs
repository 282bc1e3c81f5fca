//! Purpose: Decode one NDJSON line into a fully validated dump `Event`.
//! Exports: `decode_line`.
//! Role: Two-pass decoder: untyped presence check, then typed decode plus semantic rules.
//! Invariants: Both passes read the same object; a repeated top-level key keeps its last value.
//! Invariants: Blank input is `Ok(None)`; failures never yield a partially built event.
//! Invariants: Checks run in a fixed order so the reported error is deterministic.
//! Invariants: Stateless and side-effect free; safe to call concurrently on any line.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::core::error::{Error, ErrorKind};
use crate::core::event::{
    CommandMeta, Event, HostMeta, HttpMeta, Payload, SourceType, TraceFrame, null_as_default,
    null_items_as_default,
};
use crate::core::presence::{RawObject, validate_required_keys};
use crate::core::schema::{SCHEMA_VERSION, is_supported, schema_version_error};

const PAYLOAD_FORMAT_JSON: &str = "json";

// Same layout as `Event`, but every scalar tolerates `null` and `sourceType`
// stays a string so enum membership is checked in order with the other rules.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    schema_version: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    timestamp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    source_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    project_root: String,
    #[serde(default, deserialize_with = "null_as_default")]
    php_sapi: String,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    http: Option<HttpMeta>,
    #[serde(default)]
    command: Option<CommandMeta>,
    #[serde(default)]
    is_dd: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    payload_format: String,
    #[serde(default, deserialize_with = "payload_text")]
    payload: Option<Payload>,
    #[serde(default, deserialize_with = "null_items_as_default")]
    trace: Vec<TraceFrame>,
    #[serde(default, deserialize_with = "null_as_default")]
    host: HostMeta,
}

/// Decode a single NDJSON record.
///
/// Surrounding whitespace (including a trailing newline) is ignored. A line
/// that is empty after trimming yields `Ok(None)`, meaning "nothing to decode".
pub fn decode_line(line: &str) -> Result<Option<Event>, Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let raw: RawObject = serde_json::from_str(trimmed).map_err(parse_error)?;
    validate_required_keys(&raw)?;

    let deduplicated = serde_json::to_string(&raw).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to re-encode dump event")
            .with_source(err)
    })?;
    let wire: WireEvent = serde_json::from_str(&deduplicated).map_err(parse_error)?;
    validate_event(wire).map(Some)
}

// A literal `null` payload is a value, so it is captured as text instead of becoming `None`.
fn payload_text<'de, D>(deserializer: D) -> Result<Option<Payload>, D::Error>
where
    D: Deserializer<'de>,
{
    Payload::deserialize(deserializer).map(Some)
}

fn validate_event(wire: WireEvent) -> Result<Event, Error> {
    if !is_supported(wire.schema_version) {
        return Err(schema_version_error(wire.schema_version));
    }

    let payload = match wire.payload {
        Some(payload) if !payload.is_empty() => payload,
        _ => return Err(missing_fields()),
    };
    if wire.id.is_empty()
        || wire.timestamp.is_empty()
        || wire.source_type.is_empty()
        || wire.project_root.is_empty()
        || wire.php_sapi.is_empty()
        || wire.payload_format.is_empty()
    {
        return Err(missing_fields());
    }

    if wire.host.hostname.is_empty() || wire.host.pid <= 0 {
        return Err(invalid("host", "invalid host metadata"));
    }

    validate_timestamp(&wire.timestamp)?;

    let source_type: SourceType = wire.source_type.parse()?;

    if wire.payload_format != PAYLOAD_FORMAT_JSON {
        return Err(invalid(
            "payloadFormat",
            &format!("payloadFormat must be json for schemaVersion {SCHEMA_VERSION}"),
        ));
    }

    let (http, command) = if source_type.requires_http() {
        (Some(validate_http(wire.http)?), None)
    } else {
        (None, Some(validate_command(wire.command)?))
    };

    serde_json::from_str::<IgnoredAny>(payload.get()).map_err(|err| {
        invalid("payload", "payload must be valid JSON").with_source(err)
    })?;

    Ok(Event {
        schema_version: wire.schema_version,
        id: wire.id,
        timestamp: wire.timestamp,
        source_type,
        project_root: wire.project_root,
        php_sapi: wire.php_sapi,
        request_id: wire.request_id,
        http,
        command,
        is_dd: wire.is_dd,
        payload_format: wire.payload_format,
        payload,
        trace: wire.trace,
        host: wire.host,
    })
}

// The timestamp must already be in canonical UTC form: parsing it and
// re-rendering in UTC has to reproduce the input exactly.
fn validate_timestamp(raw: &str) -> Result<(), Error> {
    let parsed = OffsetDateTime::parse(raw, &Rfc3339).map_err(|err| {
        invalid("timestamp", "timestamp must be RFC3339Nano").with_source(err)
    })?;
    let normalized = parsed
        .to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .map_err(|err| invalid("timestamp", "timestamp must be UTC (Z)").with_source(err))?;
    if normalized != raw {
        return Err(invalid("timestamp", "timestamp must be UTC (Z)"));
    }
    Ok(())
}

fn validate_http(http: Option<HttpMeta>) -> Result<HttpMeta, Error> {
    let Some(http) = http else {
        return Err(invalid(
            "http",
            "http metadata is required when sourceType is http",
        ));
    };
    if http.method.is_empty() || http.scheme.is_empty() || http.host.is_empty() || http.path.is_empty()
    {
        return Err(invalid("http", "http metadata is missing required fields"));
    }
    Ok(http)
}

fn validate_command(command: Option<CommandMeta>) -> Result<CommandMeta, Error> {
    let Some(command) = command else {
        return Err(invalid(
            "command",
            "command metadata is required when sourceType is cli, worker, or cron",
        ));
    };
    if command.name.is_empty() {
        return Err(invalid(
            "command",
            "command metadata is missing required field: name",
        ));
    }
    Ok(command)
}

fn parse_error(err: serde_json::Error) -> Error {
    Error::new(ErrorKind::Parse)
        .with_message(err.to_string())
        .with_source(err)
}

fn missing_fields() -> Error {
    Error::new(ErrorKind::InvalidField).with_message("missing required dump event fields")
}

fn invalid(field: &str, message: &str) -> Error {
    Error::new(ErrorKind::InvalidField)
        .with_message(message)
        .with_field(field)
}
