//! Purpose: Application-facing façade over the decoder.
//! Exports: `App`.
//! Role: Thin entry point the desktop shell binds to; forwards raw lines verbatim.
//! Invariants: Holds no state; every call is equivalent to the free functions.

use crate::core::decode::decode_line;
use crate::core::error::Error;
use crate::core::event::Event;
use crate::core::schema::SCHEMA_VERSION;

#[derive(Clone, Copy, Debug, Default)]
pub struct App;

impl App {
    pub fn new() -> Self {
        Self
    }

    pub fn supported_dump_event_schema_version(&self) -> i64 {
        SCHEMA_VERSION
    }

    /// `Ok(None)` means the line was blank and should be skipped.
    pub fn decode_dump_event_line(&self, line: &str) -> Result<Option<Event>, Error> {
        decode_line(line)
    }
}
