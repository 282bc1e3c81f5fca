//! Purpose: `phant` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, decodes NDJSON dump events, emits JSON on stdout.
//! Invariants: stdout carries only decoded events (one JSON document per record).
//! Invariants: Notices and errors go to stderr; JSON when stderr is not a TTY.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use phant::api::{Error, ErrorKind, Event, to_exit_code};
use phant::ingest::{ErrorPolicy, IngestFailure, IngestOutcome};
use phant::notice::{Notice, notice_json};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome { exit_code });
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `phant --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;
    command_dispatch::dispatch_command(cli.command, color_mode).map_err(|err| (err, color_mode))
}

fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let replacement = arg.to_str().and_then(|value| match value {
                "---help" => Some("--help"),
                "---version" => Some("--version"),
                _ => None,
            });
            replacement.map(OsString::from).unwrap_or(arg)
        })
        .collect()
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "phant",
    version,
    about = "Strict decoder for NDJSON dump events",
    long_about = None,
    before_help = r#"Each input line is one dump event (schemaVersion 1) emitted by an
instrumented PHP process: web request, CLI command, queue worker, or cron job.
"#,
    after_help = r#"EXAMPLES
  $ phant decode events.ndjson
  $ tail -f /tmp/phant.ndjson | phant decode --errors skip
  $ phant check '{"schemaVersion":1, ...}'
  $ phant schema-version

LOGGING
  Set RUST_LOG (e.g. RUST_LOG=debug) to see reader diagnostics on stderr."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Jsonl,
    Pretty,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ErrorPolicyCli {
    Stop,
    Skip,
}

impl From<ErrorPolicyCli> for ErrorPolicy {
    fn from(value: ErrorPolicyCli) -> Self {
        match value {
            ErrorPolicyCli::Stop => ErrorPolicy::Stop,
            ErrorPolicyCli::Skip => ErrorPolicy::Skip,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Decode an NDJSON stream of dump events",
        long_about = r#"Read newline-delimited dump events from FILE (or stdin) and write each
decoded event to stdout. Blank lines are ignored."#,
        after_help = r#"EXAMPLES
  $ phant decode events.ndjson
  $ phant decode --errors skip < events.ndjson
  $ phant decode --format pretty events.ndjson

NOTES
  - --errors stop (default) exits on the first invalid record
  - --errors skip reports each invalid record as a notice on stderr"#
    )]
    Decode {
        #[arg(help = "Input file (default: stdin)", value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "stop", help = "On invalid records: stop|skip")]
        errors: ErrorPolicyCli,
        #[arg(
            long,
            default_value_t = DEFAULT_MAX_RECORD_BYTES,
            help = "Reject records longer than this many bytes"
        )]
        max_record_bytes: usize,
        #[arg(long, value_enum, default_value = "jsonl", help = "Output format: jsonl|pretty")]
        format: OutputFormat,
    },
    #[command(
        arg_required_else_help = true,
        about = "Decode a single dump event line",
        after_help = r#"EXAMPLES
  $ phant check "$(head -n1 events.ndjson)""#
    )]
    Check {
        #[arg(help = "One NDJSON line")]
        line: String,
        #[arg(long, value_enum, default_value = "pretty", help = "Output format: jsonl|pretty")]
        format: OutputFormat,
    },
    #[command(about = "Print the supported dump event schema version")]
    SchemaVersion,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completion scripts",
        after_help = r#"EXAMPLES
  $ phant completion bash > ~/.local/share/bash-completion/completions/phant
  $ phant completion zsh > ~/.zfunc/_phant"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

const DEFAULT_MAX_RECORD_BYTES: usize = 1024 * 1024;
const DEFAULT_MAX_SNIPPET_BYTES: usize = 200;

fn emit_event<W: Write>(out: &mut W, event: &Event, format: OutputFormat) -> Result<(), Error> {
    let encoded = match format {
        OutputFormat::Jsonl => serde_json::to_string(event),
        OutputFormat::Pretty => serde_json::to_string_pretty(event),
    }
    .map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode event")
            .with_source(err)
    })?;
    writeln!(out, "{encoded}").map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write stdout")
            .with_source(err)
    })
}

fn emit_value(value: &Value) -> Result<(), Error> {
    let mut out = io::stdout().lock();
    writeln!(out, "{value}").map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write stdout")
            .with_source(err)
    })
}

#[derive(Copy, Clone)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        match notice.line {
            Some(line) => eprintln!("{label} {} (line: {line})", notice.message),
            None => eprintln!("{label} {}", notice.message),
        }
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn ingest_failure_notice(failure: &IngestFailure, color_mode: ColorMode) {
    let time = notice_time_now().unwrap_or_else(|| "unknown".to_string());
    emit_notice(&Notice::skipped(failure, time), color_mode);
}

fn ingest_summary_notice(outcome: &IngestOutcome, color_mode: ColorMode) {
    let time = notice_time_now().unwrap_or_else(|| "unknown".to_string());
    emit_notice(&Notice::decode_summary(outcome, time), color_mode);
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Parse => "invalid json".to_string(),
        ErrorKind::MissingField => "missing required field".to_string(),
        ErrorKind::InvalidField => "invalid field".to_string(),
        ErrorKind::UnsupportedSchemaVersion => "unsupported schemaVersion".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(field) = err.field() {
        inner.insert("field".to_string(), json!(field));
    }
    if let Some(line) = err.line() {
        inner.insert("line".to_string(), json!(line));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(field) = err.field() {
        lines.push(format!(
            "{} {field}",
            colorize_label("field:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(line) = err.line() {
        lines.push(format!(
            "{} {line}",
            colorize_label("line:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
