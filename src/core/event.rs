//! Purpose: Define the typed dump event record and its wire (camelCase JSON) layout.
//! Exports: `Event`, `SourceType`, `HttpMeta`, `CommandMeta`, `TraceFrame`, `HostMeta`, `Payload`.
//! Role: Canonical in-memory shape returned by the decoder and owned by callers.
//! Invariants: Exactly one of `http`/`command` is populated, selected by `source_type`.
//! Invariants: `payload` stays an opaque raw JSON blob; it is never reshaped here.
//! Invariants: Serializing an `Event` yields a line the decoder accepts back unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub schema_version: i64,
    pub id: String,
    pub timestamp: String,
    pub source_type: SourceType,
    pub project_root: String,
    pub php_sapi: String,
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandMeta>,
    pub is_dd: bool,
    pub payload_format: String,
    pub payload: Payload,
    pub trace: Vec<TraceFrame>,
    pub host: HostMeta,
}

impl Event {
    /// Render the event as a single NDJSON record (no trailing newline).
    pub fn to_line(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode dump event")
                .with_source(err)
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Http,
    Cli,
    Worker,
    Cron,
}

impl SourceType {
    pub const ALL: [SourceType; 4] = [
        SourceType::Http,
        SourceType::Cli,
        SourceType::Worker,
        SourceType::Cron,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Http => "http",
            SourceType::Cli => "cli",
            SourceType::Worker => "worker",
            SourceType::Cron => "cron",
        }
    }

    /// Whether events of this source carry `http` metadata rather than `command`.
    pub fn requires_http(self) -> bool {
        matches!(self, SourceType::Http)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SourceType::ALL
            .into_iter()
            .find(|source| source.as_str() == value)
            .ok_or_else(|| {
                let permitted = SourceType::ALL
                    .iter()
                    .map(|source| source.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                Error::new(ErrorKind::InvalidField)
                    .with_message(format!("sourceType must be one of: {permitted}"))
                    .with_field("sourceType")
            })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpMeta {
    #[serde(default, deserialize_with = "null_as_default")]
    pub method: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scheme: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub host: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CommandMeta {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "null_items_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct HostMeta {
    #[serde(default, deserialize_with = "null_as_default")]
    pub hostname: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pid: i64,
}

/// Treat JSON `null` like an absent key so emptiness rules, not type errors, reject it.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// List form of `null_as_default`: a `null` list or `null` item decodes as the default.
pub(crate) fn null_items_as_default<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items.into_iter().map(Option::unwrap_or_default).collect())
}

/// Opaque JSON payload captured byte-for-byte from the event line.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Box<RawValue>);

impl Payload {
    pub fn from_json(json: impl Into<String>) -> Result<Self, serde_json::Error> {
        RawValue::from_string(json.into()).map(Payload)
    }

    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::value::to_raw_value(value).map(Payload)
    }

    pub fn get(&self) -> &str {
        self.0.get()
    }

    /// True only for zero-length raw text; a literal `null` is a payload.
    pub fn is_empty(&self) -> bool {
        self.get().trim().is_empty()
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(self.get())
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl Eq for Payload {}
