//! Review command - edit row decisions and submit the evaluation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use evalform_core::{
    ChildItemId, Edit, EvaluationSession, EvaluationStatus, FormKey, ReconciliationState,
    SubmissionPlan,
};
use serde::Deserialize;

use crate::client::ApiClient;
use crate::{Config, OutputFormat};

/// Arguments for the review command.
#[derive(Debug, Args)]
pub struct ReviewArgs {
    /// Form ID to review.
    #[arg(long = "form", short = 'f')]
    pub form_id: String,

    /// Subject ID (defaults to EVALFORM_SUBJECT_ID).
    #[arg(long = "subject", short = 's')]
    pub subject_id: Option<String>,

    /// Overall decision (approved or rejected).
    #[arg(long, short = 'd')]
    pub decision: Option<EvaluationStatus>,

    /// Reason for the overall decision.
    #[arg(long, short = 'r')]
    pub reason: Option<String>,

    /// Row decision as ROW=STATUS (repeatable).
    #[arg(long = "set", value_name = "ROW=STATUS")]
    pub set: Vec<String>,

    /// Row suggestion as ROW=TEXT (repeatable).
    #[arg(long = "suggest", value_name = "ROW=TEXT")]
    pub suggest: Vec<String>,

    /// JSON file with edits; flags are applied after it.
    #[arg(long, short = 'e')]
    pub edits_file: Option<PathBuf>,

    /// Print the requests that would be sent without submitting.
    #[arg(long)]
    pub dry_run: bool,
}

/// Edits loaded from `--edits-file`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EditsFile {
    /// Overall decision.
    #[serde(default)]
    pub decision: Option<EvaluationStatus>,
    /// Reason for the overall decision.
    #[serde(default)]
    pub reason: Option<String>,
    /// Per-row edits.
    #[serde(default)]
    pub rows: Vec<RowEdit>,
}

/// One row of an edits file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RowEdit {
    /// Row (child item) ID.
    pub row_id: ChildItemId,
    /// New status.
    #[serde(default)]
    pub status: Option<EvaluationStatus>,
    /// New suggestion.
    #[serde(default)]
    pub suggestion: Option<String>,
}

impl EditsFile {
    fn into_edits(self) -> Vec<Edit> {
        let mut edits = Vec::new();
        for row in self.rows {
            if let Some(status) = row.status {
                edits.push(Edit::RowDecision {
                    row_id: row.row_id.clone(),
                    status,
                });
            }
            if let Some(text) = row.suggestion {
                edits.push(Edit::RowSuggestion {
                    row_id: row.row_id,
                    text,
                });
            }
        }
        edits.extend(self.decision.map(Edit::OverallStatus));
        edits.extend(self.reason.map(Edit::OverallReason));
        edits
    }
}

/// Execute the review command.
///
/// # Errors
///
/// Returns an error if the subject ID is missing, an edit is malformed or
/// names an unknown row, or loading or submitting the form fails.
pub async fn execute(args: ReviewArgs, config: &Config) -> Result<()> {
    let subject_id = config.subject(args.subject_id.as_deref())?;
    let key = FormKey::new(subject_id, args.form_id.clone());
    let edits = collect_edits(&args)?;

    let client = ApiClient::new(config)?;
    let mut session = EvaluationSession::new(Arc::new(client));
    let state = session
        .open(key.clone())
        .await
        .with_context(|| format!("Failed to load form {}", key.form_id))?;
    check_rows(state, &edits)?;

    for edit in edits {
        session.apply(edit)?;
    }

    if args.dry_run {
        let reviewer = session
            .reviewer()
            .await
            .context("Failed to fetch current user")?
            .id
            .clone();
        let state = session.state().context("No form open")?;
        let plan = SubmissionPlan::build(&key, state, &reviewer)?;
        return print_plan(&plan, &config.format);
    }

    let outcome = session
        .submit()
        .await
        .context("Evaluation was not saved")?;

    match config.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?
            );
        }
        OutputFormat::Text | OutputFormat::Table => {
            println!("Evaluation saved!");
            println!("  Created: {}", outcome.created);
            println!("  Updated: {}", outcome.updated);
            if !outcome.refreshed {
                println!("  Could not reload the form; showing local state.");
            }
            println!();
            let cached = session.source().cached(&key).context("Form missing from cache")?;
            let state = session.state().context("No form open")?;
            super::print_form(
                &key,
                &cached.snapshot,
                state,
                Some(cached.fetched_at),
                &config.format,
            )?;
        }
    }

    Ok(())
}

fn collect_edits(args: &ReviewArgs) -> Result<Vec<Edit>> {
    let mut edits = match &args.edits_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read edits file: {}", path.display()))?;
            let file: EditsFile =
                serde_json::from_str(&content).context("Failed to parse edits JSON")?;
            file.into_edits()
        }
        None => Vec::new(),
    };

    for assignment in &args.set {
        let (row, status) = parse_assignment(assignment)?;
        let status = status
            .parse()
            .with_context(|| format!("Invalid status in --set {assignment}"))?;
        edits.push(Edit::RowDecision {
            row_id: ChildItemId::new(row),
            status,
        });
    }
    for assignment in &args.suggest {
        let (row, text) = parse_assignment(assignment)?;
        edits.push(Edit::RowSuggestion {
            row_id: ChildItemId::new(row),
            text: text.to_string(),
        });
    }
    edits.extend(args.decision.map(Edit::OverallStatus));
    edits.extend(args.reason.clone().map(Edit::OverallReason));

    Ok(edits)
}

/// Splits `ROW=VALUE`; the value may itself contain `=`.
fn parse_assignment(input: &str) -> Result<(&str, &str)> {
    match input.split_once('=') {
        Some((row, value)) if !row.trim().is_empty() => Ok((row.trim(), value)),
        _ => anyhow::bail!("Expected ROW=VALUE, got '{input}'"),
    }
}

/// Rejects edits for rows the form does not have.
fn check_rows(state: &ReconciliationState, edits: &[Edit]) -> Result<()> {
    let unknown: Vec<_> = edits
        .iter()
        .filter_map(Edit::row_id)
        .filter(|id| state.row(id).is_none())
        .map(ToString::to_string)
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("Unknown row(s): {}", unknown.join(", "))
    }
}

fn print_plan(plan: &SubmissionPlan, format: &OutputFormat) -> Result<()> {
    use evalform_core::RowRequest;

    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = plan
                .rows
                .iter()
                .map(|r| match r {
                    RowRequest::Create(body) => serde_json::json!({ "create": body }),
                    RowRequest::Update { id, body } => {
                        serde_json::json!({ "update": { "id": id, "body": body } })
                    }
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "formUpdate": plan.form_update,
                    "rows": rows,
                }))
                .context("Failed to serialize plan")?
            );
        }
        OutputFormat::Text | OutputFormat::Table => {
            println!("Dry run: {} requests would be sent", plan.request_count());
            println!(
                "  update form {} -> {}",
                plan.form_update.id, plan.form_update.status
            );
            for request in &plan.rows {
                match request {
                    RowRequest::Create(body) => {
                        println!("  create entry for {} -> {}", body.child_item_id, body.status);
                    }
                    RowRequest::Update { id, body } => {
                        println!("  update entry {id} -> {}", body.status);
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(clap::Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ReviewArgs,
    }

    #[test]
    fn test_review_args_parsing() {
        use clap::Parser;

        let cli = TestCli::parse_from([
            "test",
            "--form",
            "form-1",
            "--decision",
            "rejected",
            "--reason",
            "missing records",
            "--set",
            "c-1=approved",
            "--set",
            "c-2=rejected",
            "--suggest",
            "c-2=keep a log",
        ]);

        assert_eq!(cli.args.decision, Some(EvaluationStatus::Rejected));
        assert_eq!(cli.args.set, vec!["c-1=approved", "c-2=rejected"]);
        assert!(!cli.args.dry_run);

        let edits = collect_edits(&cli.args).expect("edits");
        assert_eq!(edits.len(), 5);
        assert_eq!(
            edits[2],
            Edit::RowSuggestion {
                row_id: ChildItemId::new("c-2"),
                text: "keep a log".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_status_rejected() {
        use clap::Parser;

        let cli = TestCli::parse_from(["test", "--form", "form-1", "--set", "c-1=maybe"]);
        assert!(collect_edits(&cli.args).is_err());
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("c-1=a=b").expect("parse"), ("c-1", "a=b"));
        assert_eq!(parse_assignment("c-1=").expect("parse"), ("c-1", ""));
        assert!(parse_assignment("c-1").is_err());
        assert!(parse_assignment("=approved").is_err());
    }

    #[test]
    fn test_edits_file_order() {
        let file: EditsFile = serde_json::from_str(
            r#"{
                "decision": "approved",
                "reason": "meets the standard",
                "rows": [
                    { "rowId": "c-1", "status": "approved" },
                    { "rowId": "c-2", "status": "rejected", "suggestion": "fence the plot" }
                ]
            }"#,
        )
        .expect("parse");

        let edits = file.into_edits();
        assert_eq!(edits.len(), 5);
        assert_eq!(edits[3], Edit::OverallStatus(EvaluationStatus::Approved));
        assert_eq!(
            edits[4],
            Edit::OverallReason("meets the standard".to_string())
        );
    }

    #[test]
    fn test_edits_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("edits.json");
        std::fs::write(&path, r#"{ "rows": [ { "rowId": "c-9", "suggestion": "x" } ] }"#)
            .expect("write");

        let cli = <TestCli as clap::Parser>::parse_from([
            "test".to_string(),
            "--form".to_string(),
            "form-1".to_string(),
            "--edits-file".to_string(),
            path.display().to_string(),
        ]);

        let edits = collect_edits(&cli.args).expect("edits");
        assert_eq!(
            edits,
            vec![Edit::RowSuggestion {
                row_id: ChildItemId::new("c-9"),
                text: "x".to_string(),
            }]
        );
    }
}
