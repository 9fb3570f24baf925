//! Show command - print a form with its rows.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use evalform_core::{EvaluationSession, FormKey};

use crate::Config;
use crate::client::ApiClient;

/// Arguments for the show command.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Form ID to show.
    #[arg(long = "form", short = 'f')]
    pub form_id: String,

    /// Subject ID (defaults to EVALFORM_SUBJECT_ID).
    #[arg(long = "subject", short = 's')]
    pub subject_id: Option<String>,
}

/// Execute the show command.
///
/// # Errors
///
/// Returns an error if the subject ID is missing or the form cannot be
/// fetched.
pub async fn execute(args: ShowArgs, config: &Config) -> Result<()> {
    let subject_id = config.subject(args.subject_id.as_deref())?;
    let key = FormKey::new(subject_id, args.form_id);

    let client = ApiClient::new(config)?;
    let mut session = EvaluationSession::new(Arc::new(client));
    session
        .open(key.clone())
        .await
        .with_context(|| format!("Failed to load form {}", key.form_id))?;

    let cached = session
        .source()
        .cached(&key)
        .context("Form missing from cache after load")?;
    let state = session.state().context("No form open after load")?;

    super::print_form(&key, &cached.snapshot, state, Some(cached.fetched_at), &config.format)
}
