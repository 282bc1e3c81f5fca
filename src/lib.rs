//! Purpose: Shared library crate used by the `phant` CLI, the desktop app, and tests.
//! Exports: `api` (decoder surface), `ingest` (NDJSON stream reader), `notice`.
//! Role: Strict decoder for dump events; everything downstream of a decode lives elsewhere.
//! Invariants: Decoding is pure; no module here logs from the decode path.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub(crate) mod core;
pub mod ingest;
pub mod notice;
