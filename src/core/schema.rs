//! Purpose: Centralize dump event schema versioning and compatibility errors.
//! Exports: `SCHEMA_VERSION`, `SUPPORTED_SCHEMA_VERSIONS`, `schema_version_error`.
//! Role: Shared policy for gating which event layouts this build understands.
//! Invariants: Exactly one version is decodable today; the list is additive.
//! Invariants: The unsupported-version error is identified by kind, not text.

use crate::core::error::{Error, ErrorKind};

pub const SCHEMA_VERSION: i64 = 1;
pub const SUPPORTED_SCHEMA_VERSIONS: &[i64] = &[SCHEMA_VERSION];

pub fn is_supported(version: i64) -> bool {
    SUPPORTED_SCHEMA_VERSIONS.contains(&version)
}

pub fn schema_version_error(detected: i64) -> Error {
    let supported = SUPPORTED_SCHEMA_VERSIONS
        .iter()
        .map(|version| version.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Error::new(ErrorKind::UnsupportedSchemaVersion)
        .with_message(format!(
            "unsupported schemaVersion {detected} (supported: {supported})"
        ))
        .with_field("schemaVersion")
        .with_hint("Upgrade phant or pin the producer to a supported schemaVersion.")
}
