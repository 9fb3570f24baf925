//! CLI command implementations.

pub mod review;
pub mod show;
pub mod whoami;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use evalform_core::{EvaluationStatus, FormKey, FormSnapshot, ReconciliationState};
use owo_colors::OwoColorize;

use crate::OutputFormat;

/// Prints a form and its reconciled rows in the requested format.
pub(crate) fn print_form(
    key: &FormKey,
    snapshot: &FormSnapshot,
    state: &ReconciliationState,
    fetched_at: Option<DateTime<Utc>>,
    format: &OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "subjectId": key.subject_id,
                    "form": snapshot.form,
                    "decision": state.decision(),
                    "rows": state.rows(),
                    "fetchedAt": fetched_at.map(|t| t.to_rfc3339()),
                }))
                .context("Failed to serialize form")?
            );
        }
        OutputFormat::Text => {
            let decision = state.decision();
            println!("Form:    {} (subject {})", decision.form_id, key.subject_id);
            println!("Status:  {}", format_status_colored(decision.status, 0));
            if let Some(reason) = decision.reason.as_deref().filter(|r| !r.is_empty()) {
                println!("Reason:  {reason}");
            }
            if let Some(reviewer) = &snapshot.form.approved_by {
                println!(
                    "Reviewed by: {}  {}  {}",
                    reviewer.full_name(),
                    reviewer.email.as_deref().unwrap_or("-"),
                    reviewer.phone.as_deref().unwrap_or("-")
                );
            }
            if let Some(fetched_at) = fetched_at {
                println!("Fetched: {fetched_at}");
            }

            for topic in &snapshot.topics {
                println!();
                println!("{} {}", topic.id.dimmed(), topic.title.bold());
                for child in &topic.children {
                    let Some(row) = state.row(&child.id) else {
                        continue;
                    };
                    let saved = if row.entry.is_persisted() { "" } else { " (new)" };
                    println!(
                        "  {} {} {}{}",
                        format_status_colored(row.entry.status, 10),
                        row.row_id(),
                        row.title(),
                        saved.dimmed()
                    );
                    let suggestion = row.entry.suggestion_text();
                    if !suggestion.is_empty() {
                        println!("             {suggestion}");
                    }
                }
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct RowLine {
                #[tabled(rename = "Topic")]
                topic: String,
                #[tabled(rename = "Row")]
                row: String,
                #[tabled(rename = "Title")]
                title: String,
                #[tabled(rename = "Status")]
                status: String,
                #[tabled(rename = "Suggestion")]
                suggestion: String,
                #[tabled(rename = "Saved")]
                saved: String,
            }

            let rows: Vec<_> = state
                .rows()
                .iter()
                .map(|r| RowLine {
                    topic: r.topic_id().to_string(),
                    row: r.row_id().to_string(),
                    title: r.title().to_string(),
                    status: r.entry.status.to_string(),
                    suggestion: r.entry.suggestion_text().to_string(),
                    saved: if r.entry.is_persisted() { "yes" } else { "no" }.to_string(),
                })
                .collect();

            let decision = state.decision();
            println!("Form {}: {}", decision.form_id, decision.status);
            if rows.is_empty() {
                println!("No items");
            } else {
                println!("{}", Table::new(rows));
            }
        }
    }

    Ok(())
}

/// Colors a status label, padding the plain text to `width` first.
fn format_status_colored(status: EvaluationStatus, width: usize) -> String {
    let s = format!("{:<width$}", status.as_str().to_uppercase());
    match status {
        EvaluationStatus::Approved => s.green().to_string(),
        EvaluationStatus::Rejected => s.red().to_string(),
        EvaluationStatus::Pending => s.yellow().to_string(),
    }
}
