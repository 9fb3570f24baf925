//! # evalform-cli
//!
//! Command-line front end for reviewing evaluation forms.
//!
//! ## Commands
//!
//! - `evalform show` - Print a form with every row and its current decision
//! - `evalform review` - Apply decisions and suggestions, then submit
//! - `evalform whoami` - Print the signed-in reviewer
//!
//! ## Configuration
//!
//! The CLI uses environment variables or command-line flags for settings:
//!
//! - `EVALFORM_API_URL` - API endpoint (default: `http://localhost:3000`)
//! - `EVALFORM_API_TOKEN` - API bearer token
//! - `EVALFORM_SUBJECT_ID` - Default subject (e.g. farmer) id
//! - `EVALFORM_TIMEOUT_SECS` - Per-request timeout (none by default)

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod client;
pub mod commands;

use clap::{Parser, Subcommand};

/// evalform CLI - review evaluation forms from the terminal.
#[derive(Debug, Parser)]
#[command(name = "evalform")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// API server URL.
    #[arg(long, env = "EVALFORM_API_URL", default_value = "http://localhost:3000")]
    pub api_url: String,

    /// API bearer token.
    #[arg(long, env = "EVALFORM_API_TOKEN")]
    pub api_token: Option<String>,

    /// Default subject ID for commands that take one.
    #[arg(long, env = "EVALFORM_SUBJECT_ID")]
    pub subject_id: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "EVALFORM_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Output format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            api_url: self.api_url.clone(),
            api_token: self.api_token.clone(),
            subject_id: self.subject_id.clone(),
            timeout_secs: self.timeout_secs,
            format: self.format.clone(),
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print a form and its rows.
    Show(commands::show::ShowArgs),
    /// Edit decisions and submit the evaluation.
    Review(commands::review::ReviewArgs),
    /// Print the signed-in reviewer.
    Whoami,
}

/// Output format.
#[derive(Debug, Clone, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// Table output.
    Table,
}

/// CLI configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// API server URL.
    pub api_url: String,
    /// API bearer token.
    pub api_token: Option<String>,
    /// Default subject ID.
    pub subject_id: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Output format.
    pub format: OutputFormat,
}

impl Config {
    /// Resolves the subject for a command: the explicit flag wins over the
    /// configured default.
    ///
    /// # Errors
    ///
    /// Returns an error if neither is set.
    pub fn subject<'a>(&'a self, explicit: Option<&'a str>) -> anyhow::Result<&'a str> {
        explicit
            .or(self.subject_id.as_deref())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Subject ID is required. Set EVALFORM_SUBJECT_ID or use --subject"
                )
            })
    }
}
