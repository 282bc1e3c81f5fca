//! Purpose: Define the stable public Rust API boundary for phant.
//! Exports: Event model, error model, `decode_line`, `supported_schema_version`, `App`.
//! Role: Public, additive-only surface; hides the internal validation modules.
//! Invariants: This module is the only public path to the decoder.
//! Invariants: Every entry point here is stateless and safe to call concurrently.

mod app;

pub use crate::core::decode::decode_line;
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::event::{
    CommandMeta, Event, HostMeta, HttpMeta, Payload, SourceType, TraceFrame,
};
pub use crate::core::presence::REQUIRED_EVENT_KEYS;
pub use crate::core::schema::{SCHEMA_VERSION, SUPPORTED_SCHEMA_VERSIONS};
pub use app::App;

/// The single dump event schema version this build decodes.
pub fn supported_schema_version() -> i64 {
    SCHEMA_VERSION
}
