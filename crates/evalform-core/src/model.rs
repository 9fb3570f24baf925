//! Server-side evaluation records as returned by the form service.
//!
//! These types mirror the service's JSON (camelCase, with the service's own
//! field names such as `childs` and `listFormEvaluation`). They are read-only
//! inputs to the reconciliation state; nothing in this crate mutates a
//! snapshot in place.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::id::{ChildItemId, FormId, ListEntryId, TopicId, UserId};

/// Decision state of a form or of a single list entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    /// No decision yet.
    #[default]
    Pending,
    /// Passed.
    Approved,
    /// Did not pass.
    Rejected,
}

impl EvaluationStatus {
    /// Returns true once a pass/fail decision has been made.
    #[must_use]
    pub const fn is_decided(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::InvalidInput(format!(
                "unknown evaluation status '{other}' (expected pending, approved or rejected)"
            ))),
        }
    }
}

/// Contact details of the user who approved a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviewer {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

impl Reviewer {
    /// Returns "first last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Top-level evaluation record carrying the overall decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    /// Form identifier.
    pub id: FormId,
    /// Overall decision.
    #[serde(default)]
    pub status: EvaluationStatus,
    /// Justification of the overall decision.
    #[serde(default)]
    pub reason: Option<String>,
    /// User who approved the form, once reviewed.
    #[serde(default, rename = "user")]
    pub approved_by: Option<Reviewer>,
}

/// Persisted decision for one child item.
///
/// An entry without an id has never been persisted and must be created; once
/// an id exists every further edit updates that record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    /// Server-assigned id, absent until created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ListEntryId>,
    /// Per-item decision.
    #[serde(default)]
    pub status: EvaluationStatus,
    /// Free-text suggestion.
    #[serde(default)]
    pub suggestion: Option<String>,
}

impl ListEntry {
    /// Entry used for child items that have no decision yet.
    #[must_use]
    pub fn unsaved() -> Self {
        Self {
            id: None,
            status: EvaluationStatus::Pending,
            suggestion: Some(String::new()),
        }
    }

    /// Returns true if this entry exists server-side.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Suggestion text, empty when unset.
    #[must_use]
    pub fn suggestion_text(&self) -> &str {
        self.suggestion.as_deref().unwrap_or_default()
    }
}

/// A single checklist line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildItem {
    /// Item identifier.
    pub id: ChildItemId,
    /// Display order within the topic.
    #[serde(default)]
    pub order: u32,
    /// Display title.
    pub title: String,
    /// Existing decision, if any.
    #[serde(default, rename = "listFormEvaluation")]
    pub list_entry: Option<ListEntry>,
}

/// A named group of child items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    /// Topic identifier.
    pub id: TopicId,
    /// Display order within the form.
    #[serde(default)]
    pub order: u32,
    /// Display title.
    pub title: String,
    /// Child items, in display order.
    #[serde(default, rename = "childs")]
    pub children: Vec<ChildItem>,
}

/// One response of the fetch-form call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    /// The form record.
    #[serde(rename = "formEvaluation")]
    pub form: Form,
    /// Topics, in display order.
    #[serde(default)]
    pub topics: Vec<Topic>,
}

impl FormSnapshot {
    /// Total number of child items across all topics.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.topics.iter().map(|t| t.children.len()).sum()
    }
}

/// The signed-in user, as returned by the current-user call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!(
            "Approved".parse::<EvaluationStatus>().expect("parse"),
            EvaluationStatus::Approved
        );
        assert_eq!(EvaluationStatus::Rejected.to_string(), "rejected");
        assert!("maybe".parse::<EvaluationStatus>().is_err());
        assert!(!EvaluationStatus::Pending.is_decided());
    }

    #[test]
    fn test_snapshot_decodes_service_json() {
        let json = r#"{
            "formEvaluation": {
                "id": "form-1",
                "status": "approved",
                "reason": "all good",
                "user": { "firstName": "Somchai", "lastName": "K", "email": "s@example.com", "phone": "0800" }
            },
            "topics": [
                {
                    "id": "t-1",
                    "order": 1,
                    "title": "Soil",
                    "childs": [
                        { "id": "c-1", "order": 1, "title": "No chemicals",
                          "listFormEvaluation": { "id": "le-1", "status": "approved", "suggestion": "ok" } },
                        { "id": "c-2", "order": 2, "title": "Water source" }
                    ]
                }
            ]
        }"#;

        let snapshot: FormSnapshot = serde_json::from_str(json).expect("decode");
        assert_eq!(snapshot.form.status, EvaluationStatus::Approved);
        assert_eq!(
            snapshot.form.approved_by.as_ref().map(Reviewer::full_name),
            Some("Somchai K".to_string())
        );
        assert_eq!(snapshot.child_count(), 2);

        let first = &snapshot.topics[0].children[0];
        assert_eq!(
            first.list_entry.as_ref().and_then(|e| e.id.clone()),
            Some(ListEntryId::new("le-1"))
        );
        assert!(snapshot.topics[0].children[1].list_entry.is_none());
    }

    #[test]
    fn test_unsaved_entry_defaults() {
        let entry = ListEntry::unsaved();
        assert!(!entry.is_persisted());
        assert_eq!(entry.status, EvaluationStatus::Pending);
        assert_eq!(entry.suggestion_text(), "");
    }
}
