//! Shared output layer for pretty/text/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: pretty output for humans, compact text for scripts, or
//! stable JSON.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` / hidden `--json` flag
//! 2. `FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use clap::ValueEnum;
use modorder_core::{ErrorCode, PlanError};
use serde::Serialize;
use std::fmt;
use std::io::{self, IsTerminal, Write};

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 54;

const RED: &str = "\x1b[91m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<18} {}", format!("{key}:"), value.as_ref())
}

/// Severity prefix for operator diagnostics, colored when `color` is set.
#[must_use]
pub fn severity_prefix(label: &str, color: bool) -> String {
    if !color {
        return format!("{label}: ");
    }
    let code = if label == "ERROR" { RED } else { YELLOW };
    format!("{code}{label}: {RESET}")
}

/// Whether stderr diagnostics should carry ANSI color.
#[must_use]
pub fn stderr_color() -> bool {
    io::stderr().is_terminal()
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output (sections, visual framing).
    Pretty,
    /// Plain `key=value` text for scripts and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Core resolution logic, separated from I/O for testability.
///
/// `format_flag` — explicit `--format` value if provided.
/// `json_flag` — hidden `--json` alias.
/// `format_env` — the value of `FORMAT` if set.
/// `is_tty` — true if stdout is a TTY.
fn resolve_output_mode_inner(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }

    if json_flag {
        return OutputMode::Json;
    }

    if let Some(val) = format_env {
        match val.to_lowercase().as_str() {
            "json" => return OutputMode::Json,
            "text" => return OutputMode::Text,
            "pretty" => return OutputMode::Pretty,
            _ => {} // unknown value — fall through to TTY detection
        }
    }

    if is_tty {
        OutputMode::Pretty
    } else {
        OutputMode::Text
    }
}

/// Resolve the output mode from CLI flags, environment, and TTY defaults.
pub fn resolve_output_mode(format_flag: Option<OutputMode>, json_flag: bool) -> OutputMode {
    let env_val = std::env::var("FORMAT").ok();
    let is_tty = io::stdout().is_terminal();
    resolve_output_mode_inner(format_flag, json_flag, env_val.as_deref(), is_tty)
}

/// Render a serializable value with explicit pretty/text renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (e.g. "E3001").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Modules involved in the failure, if any.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,
}

impl From<&PlanError> for CliError {
    fn from(err: &PlanError) -> Self {
        let PlanError::MissingRequirements { missing, .. } = err;
        Self {
            message: err.to_string(),
            suggestion: err.hint().map(str::to_string),
            error_code: Some(err.code().code().to_string()),
            modules: missing.clone(),
        }
    }
}

impl From<&anyhow::Error> for CliError {
    fn from(err: &anyhow::Error) -> Self {
        if let Some(plan) = err.downcast_ref::<PlanError>() {
            return Self::from(plan);
        }
        let code = err.downcast_ref::<CodedError>().map(|coded| coded.code);
        Self {
            message: format!("{err:#}"),
            suggestion: code.and_then(ErrorCode::hint).map(str::to_string),
            error_code: code.map(|code| code.code().to_string()),
            modules: Vec::new(),
        }
    }
}

/// An error tagged with the [`ErrorCode`] reported to machine consumers.
#[derive(Debug)]
pub struct CodedError {
    pub code: ErrorCode,
    pub source: anyhow::Error,
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.source)
    }
}

impl std::error::Error for CodedError {}

/// `map_err` adapter that tags an error with `code`.
pub fn coded(code: ErrorCode) -> impl FnOnce(anyhow::Error) -> anyhow::Error {
    move |source| anyhow::Error::new(CodedError { code, source })
}

/// Write a JSON error envelope: `{"error": {...}}`.
pub fn write_json_error(w: &mut dyn Write, error: &CliError) -> anyhow::Result<()> {
    let wrapper = serde_json::json!({
        "error": error,
    });
    serde_json::to_writer_pretty(&mut *w, &wrapper)?;
    writeln!(w)?;
    Ok(())
}

/// Operator report for an incomplete early stage.
pub fn write_missing_report(w: &mut dyn Write, err: &PlanError, color: bool) -> io::Result<()> {
    let PlanError::MissingRequirements { target, missing } = err;
    let prefix = severity_prefix("ERROR", color);
    writeln!(w, "{prefix}\"{target}\" needs modules outside the early stage:")?;
    pretty_rule(w)?;
    for name in missing {
        writeln!(w, "{name}")?;
    }
    pretty_rule(w)?;
    writeln!(
        w,
        "{prefix}these {} module(s) must be added to the early-stage list (or made resident) for \"{target}\" to load",
        missing.len()
    )?;
    Ok(())
}

/// Report a failed command on stderr, exactly once.
///
/// Human modes get the full missing-requirements report for [`PlanError`]
/// and a one-line message otherwise; JSON mode always gets a single error
/// envelope.
pub fn render_failure(mode: OutputMode, err: &anyhow::Error) -> anyhow::Result<()> {
    if let Some(plan) = err.downcast_ref::<PlanError>().filter(|_| !mode.is_json()) {
        let stderr = io::stderr();
        let mut out = stderr.lock();
        write_missing_report(&mut out, plan, stderr_color())?;
        return Ok(());
    }
    render_error(mode, &CliError::from(err))
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => write_json_error(&mut out, error)?,
        OutputMode::Pretty | OutputMode::Text => {
            writeln!(out, "{}{}", severity_prefix("ERROR", stderr_color()), error.message)?;
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}
