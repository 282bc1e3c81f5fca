//! Purpose: Dispatch parsed CLI commands to their handlers.
//! Role: Keeps `main.rs` focused on arg parsing and stderr/stdout emission.
//! Invariants: Handlers return `Error` values; exit codes are mapped by the caller.
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use clap::CommandFactory;
use serde_json::json;
use tracing::info;

use phant::api::{Error, ErrorKind, decode_line, supported_schema_version};
use phant::ingest::{IngestConfig, IngestOutcome, ingest};

use super::{
    Cli, ColorMode, Command, DEFAULT_MAX_SNIPPET_BYTES, ErrorPolicyCli, OutputFormat, RunOutcome,
    emit_event, emit_value, ingest_failure_notice, ingest_summary_notice,
};

pub(super) fn dispatch_command(command: Command, color_mode: ColorMode) -> Result<RunOutcome, Error> {
    match command {
        Command::Decode {
            file,
            errors,
            max_record_bytes,
            format,
        } => {
            if max_record_bytes == 0 {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("--max-record-bytes must be greater than zero"));
            }
            let config = IngestConfig {
                errors: errors.into(),
                max_record_bytes,
                max_snippet_bytes: DEFAULT_MAX_SNIPPET_BYTES,
            };
            let outcome = match file {
                Some(path) => decode_stream(open_input(&path)?, config, format, color_mode)?,
                None => decode_stream(io::stdin().lock(), config, format, color_mode)?,
            };
            info!(
                total = outcome.records_total,
                ok = outcome.ok,
                failed = outcome.failed,
                "decode finished"
            );
            if errors == ErrorPolicyCli::Skip && outcome.failed > 0 {
                ingest_summary_notice(&outcome, color_mode);
            }
            Ok(RunOutcome::ok())
        }
        Command::Check { line, format } => {
            if let Some(event) = decode_line(&line)? {
                emit_event(&mut io::stdout().lock(), &event, format)?;
            }
            Ok(RunOutcome::ok())
        }
        Command::SchemaVersion => {
            emit_value(&json!({ "schemaVersion": supported_schema_version() }))?;
            Ok(RunOutcome::ok())
        }
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "phant", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
    }
}

fn open_input(path: &Path) -> Result<File, Error> {
    File::open(path).map_err(|err| {
        let kind = if err.kind() == io::ErrorKind::NotFound {
            ErrorKind::Usage
        } else {
            ErrorKind::Io
        };
        Error::new(kind)
            .with_message(format!("failed to open {}", path.display()))
            .with_source(err)
    })
}

fn decode_stream<R: Read>(
    reader: R,
    config: IngestConfig,
    format: OutputFormat,
    color_mode: ColorMode,
) -> Result<IngestOutcome, Error> {
    let mut out = io::stdout().lock();
    ingest(
        reader,
        config,
        |event, _line| emit_event(&mut out, &event, format),
        |failure| ingest_failure_notice(&failure, color_mode),
    )
}
