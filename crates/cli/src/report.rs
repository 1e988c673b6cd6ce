//! Rendering check results to stdout.

use crate::config::OutputFormat;
use rbxsig_signer::{CheckReport, Verification};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const CRLF_WARNING: &str = "Warning: Document is not fully CRLF";

/// A run that ended before a signature could be checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The path is not an existing file; holds the absolute path.
    MissingFile(PathBuf),
    /// No anchored `%token%` header.
    SignatureNotFound,
    /// The token is not base64.
    InvalidSignature(String),
}

impl Failure {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingFile(_) => "file_not_found",
            Self::SignatureNotFound => "signature_not_found",
            Self::InvalidSignature(_) => "invalid_signature",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::MissingFile(path) => format!("The path {} does not exist", path.display()),
            Self::SignatureNotFound => {
                "Could not find signature. Ensure there are no newlines at the start of the file."
                    .to_string()
            }
            Self::InvalidSignature(reason) => {
                format!("Signature token could not be decoded ({reason})")
            }
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    file: String,
    crlf: bool,
    valid: bool,
    #[serde(flatten)]
    outcome: &'a Verification,
}

#[derive(Serialize)]
struct JsonFailure<'a> {
    file: String,
    error: &'a str,
    message: String,
}

/// Write the outcome of a completed check.
pub fn render_report(
    out: &mut impl Write,
    format: OutputFormat,
    file: &Path,
    report: &CheckReport<'_>,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            if !report.crlf {
                writeln!(out, "{CRLF_WARNING}")?;
            }
            if report.outcome == Verification::Valid {
                writeln!(out, "{}", Verification::Valid)
            } else {
                writeln!(out, "{}", Verification::Invalid)?;
                if report.outcome.is_fallback() {
                    writeln!(out, "{}", report.outcome)?;
                }
                Ok(())
            }
        }
        OutputFormat::Json => write_json(
            out,
            &JsonReport {
                file: file.display().to_string(),
                crlf: report.crlf,
                valid: report.outcome.is_valid(),
                outcome: &report.outcome,
            },
        ),
    }
}

/// Write a run that ended early.
pub fn render_failure(
    out: &mut impl Write,
    format: OutputFormat,
    file: &Path,
    failure: &Failure,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "{}", failure.message()),
        OutputFormat::Json => write_json(
            out,
            &JsonFailure {
                file: file.display().to_string(),
                error: failure.code(),
                message: failure.message(),
            },
        ),
    }
}

fn write_json(out: &mut impl Write, value: &impl Serialize) -> io::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)
}
