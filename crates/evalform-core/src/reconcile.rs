//! Local reconciliation state.
//!
//! A locally editable copy of one fetched form: one [`ReconciledRow`] per
//! child item plus the [`PendingDecision`] for the form as a whole.
//!
//! The state is always rebuilt from scratch from a snapshot; edits made
//! before a refresh are discarded (last server fetch wins). Rows are stored in
//! server order and indexed by row id, so an edit to one row can never touch
//! another.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::id::{ChildItemId, FormId, ListEntryId, TopicId};
use crate::model::{EvaluationStatus, FormSnapshot, ListEntry};

/// Editable projection of one child item and its list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledRow {
    topic_id: TopicId,
    child_item_id: ChildItemId,
    row_id: ChildItemId,
    title: String,
    /// The decision being edited.
    pub entry: ListEntry,
}

impl ReconciledRow {
    /// Topic the row belongs to.
    #[must_use]
    pub fn topic_id(&self) -> &TopicId {
        &self.topic_id
    }

    /// Child item the row decides.
    #[must_use]
    pub fn child_item_id(&self) -> &ChildItemId {
        &self.child_item_id
    }

    /// Local merge key; equal to the child item id.
    #[must_use]
    pub fn row_id(&self) -> &ChildItemId {
        &self.row_id
    }

    /// Display title of the child item.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

/// The overall decision as currently entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDecision {
    /// Form being decided.
    pub form_id: FormId,
    /// Chosen overall status.
    pub status: EvaluationStatus,
    /// Justification.
    pub reason: Option<String>,
}

/// A user intent forwarded by a front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Set a row's status.
    RowDecision {
        /// Row to edit.
        row_id: ChildItemId,
        /// New status.
        status: EvaluationStatus,
    },
    /// Set a row's suggestion.
    RowSuggestion {
        /// Row to edit.
        row_id: ChildItemId,
        /// New suggestion text.
        text: String,
    },
    /// Set the overall status.
    OverallStatus(EvaluationStatus),
    /// Set the overall reason.
    OverallReason(String),
}

impl Edit {
    /// Applies the edit to `state`.
    pub fn apply(self, state: &mut ReconciliationState) {
        match self {
            Self::RowDecision { row_id, status } => state.set_row_decision(&row_id, status),
            Self::RowSuggestion { row_id, text } => state.set_row_suggestion(&row_id, text),
            Self::OverallStatus(status) => state.set_overall_status(status),
            Self::OverallReason(text) => state.set_overall_reason(text),
        }
    }

    /// Row targeted by the edit, if it is a row edit.
    #[must_use]
    pub fn row_id(&self) -> Option<&ChildItemId> {
        match self {
            Self::RowDecision { row_id, .. } | Self::RowSuggestion { row_id, .. } => Some(row_id),
            Self::OverallStatus(_) | Self::OverallReason(_) => None,
        }
    }
}

/// Rows and pending decision for one open form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationState {
    rows: Vec<ReconciledRow>,
    index: HashMap<ChildItemId, usize>,
    decision: PendingDecision,
}

impl ReconciliationState {
    /// Builds the state from a fetched snapshot.
    ///
    /// Produces exactly one row per child item, in topic then child order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSnapshot`] if two child items share an id.
    pub fn from_snapshot(snapshot: &FormSnapshot) -> Result<Self> {
        let mut rows = Vec::with_capacity(snapshot.child_count());
        let mut index = HashMap::with_capacity(snapshot.child_count());

        for topic in &snapshot.topics {
            for child in &topic.children {
                if index.insert(child.id.clone(), rows.len()).is_some() {
                    return Err(Error::InvalidSnapshot {
                        message: format!("child item '{}' appears more than once", child.id),
                    });
                }
                rows.push(ReconciledRow {
                    topic_id: topic.id.clone(),
                    child_item_id: child.id.clone(),
                    row_id: child.id.clone(),
                    title: child.title.clone(),
                    entry: child.list_entry.clone().unwrap_or_else(ListEntry::unsaved),
                });
            }
        }

        let decision = PendingDecision {
            form_id: snapshot.form.id.clone(),
            status: snapshot.form.status,
            reason: snapshot.form.reason.clone(),
        };

        Ok(Self {
            rows,
            index,
            decision,
        })
    }

    /// Rows in display order.
    #[must_use]
    pub fn rows(&self) -> &[ReconciledRow] {
        &self.rows
    }

    /// Looks up a row by id.
    #[must_use]
    pub fn row(&self, row_id: &ChildItemId) -> Option<&ReconciledRow> {
        self.index.get(row_id).map(|&i| &self.rows[i])
    }

    /// The pending overall decision.
    #[must_use]
    pub fn decision(&self) -> &PendingDecision {
        &self.decision
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the form has no child items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sets the status of one row. Unknown rows are ignored.
    pub fn set_row_decision(&mut self, row_id: &ChildItemId, status: EvaluationStatus) {
        if let Some(row) = self.row_mut(row_id) {
            row.entry.status = status;
        }
    }

    /// Sets the suggestion of one row. Unknown rows are ignored.
    pub fn set_row_suggestion(&mut self, row_id: &ChildItemId, text: impl Into<String>) {
        if let Some(row) = self.row_mut(row_id) {
            row.entry.suggestion = Some(text.into());
        }
    }

    /// Sets the overall status.
    pub fn set_overall_status(&mut self, status: EvaluationStatus) {
        self.decision.status = status;
    }

    /// Sets the overall reason.
    pub fn set_overall_reason(&mut self, text: impl Into<String>) {
        self.decision.reason = Some(text.into());
    }

    /// Records the server id of a row's entry after it was created.
    ///
    /// Later plans update that entry instead of creating another one.
    pub fn mark_persisted(&mut self, row_id: &ChildItemId, id: ListEntryId) {
        if let Some(row) = self.row_mut(row_id) {
            row.entry.id = Some(id);
        }
    }

    fn row_mut(&mut self, row_id: &ChildItemId) -> Option<&mut ReconciledRow> {
        let Some(&i) = self.index.get(row_id) else {
            tracing::debug!(row_id = %row_id, "edit for unknown row ignored");
            return None;
        };
        Some(&mut self.rows[i])
    }
}
