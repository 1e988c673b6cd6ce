//! Checker configuration.
//!
//! Settings come from built-in defaults, optionally overlaid with a TOML
//! file passed via `--config`, and finally with command-line flags. The
//! verification key is not configurable.

use anyhow::{Context, Result};
use clap::ValueEnum;
use figment::Figment;
use figment::providers::{Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How results are written to stdout.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One human-readable line per finding.
    #[default]
    Text,
    /// A single JSON object.
    Json,
}

/// Checker configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckerConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,
    /// Tracing filter directive for diagnostics on stderr (e.g. "warn", "debug").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            log_level: default_log_level(),
        }
    }
}

impl CheckerConfig {
    /// Load configuration, reading `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            anyhow::ensure!(
                path.is_file(),
                "config file {} does not exist",
                path.display()
            );
            figment = figment.merge(Toml::file(path));
        }

        figment
            .extract()
            .context("failed to load checker configuration")
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, format: Option<OutputFormat>, verbose: u8) -> Self {
        if let Some(format) = format {
            self.format = format;
        }
        match verbose {
            0 => {}
            1 => self.log_level = "debug".to_string(),
            _ => self.log_level = "trace".to_string(),
        }
        self
    }
}
