//! Command-line checker for `--rbxsig` document signatures.

mod config;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use config::{CheckerConfig, OutputFormat};
use rbxsig_signer::{SignatureVerifier, SignerError, decode_text};
use report::Failure;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: rbxsigcheck <filepath>";

/// Check the embedded --rbxsig signature of a document
#[derive(Parser, Debug)]
#[command(name = "rbxsigcheck")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Document to check
    file: Option<OsString>,

    /// Arguments after the document are ignored
    #[arg(trailing_var_arg = true, hide = true)]
    _rest: Vec<OsString>,

    /// Output format (overrides the config file)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Increase diagnostic output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config =
        CheckerConfig::load(cli.config.as_deref())?.with_overrides(cli.format, cli.verbose);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let Some(path) = cli.file.filter(|file| !file.is_empty()).map(PathBuf::from) else {
        writeln!(out, "{USAGE}")?;
        return Ok(());
    };

    check_file(&mut out, &path, config.format)
}

fn check_file(out: &mut impl Write, path: &Path, format: OutputFormat) -> Result<()> {
    if !path.is_file() {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        tracing::debug!(path = %absolute.display(), "Document does not exist");
        report::render_failure(out, format, path, &Failure::MissingFile(absolute))?;
        return Ok(());
    }

    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let body = decode_text(&bytes);

    let verifier = SignatureVerifier::embedded().context("failed to load embedded public key")?;
    tracing::debug!(key = ?verifier.public_key(), "Loaded public key");

    let failure = match verifier.check(&body) {
        Ok(checked) => {
            tracing::info!(
                path = %path.display(),
                outcome = ?checked.outcome,
                crlf = checked.crlf,
                "Signature checked"
            );
            report::render_report(out, format, path, &checked)?;
            return Ok(());
        }
        Err(SignerError::SignatureNotFound) => Failure::SignatureNotFound,
        Err(SignerError::InvalidSignature(reason)) => Failure::InvalidSignature(reason),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(path = %path.display(), error = ?failure, "Signature could not be checked");
    report::render_failure(out, format, path, &failure)?;
    Ok(())
}
