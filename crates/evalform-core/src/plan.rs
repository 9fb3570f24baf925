//! Typed submission plans.
//!
//! A plan is computed once from the reconciliation state, before anything is
//! sent: one form update plus exactly one [`RowRequest`] per row. Whether a
//! row is created or updated depends only on whether its entry already has a
//! server id at planning time.

use crate::error::{Error, Result};
use crate::id::{FormKey, ListEntryId, UserId};
use crate::reconcile::{ReconciledRow, ReconciliationState};
use crate::service::{CreateListEntryRequest, UpdateFormRequest, UpdateListEntryRequest};

/// The request a single row produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRequest {
    /// The entry has never been persisted.
    Create(CreateListEntryRequest),
    /// The entry exists and is updated in place.
    Update {
        /// Entry to update.
        id: ListEntryId,
        /// New contents.
        body: UpdateListEntryRequest,
    },
}

impl RowRequest {
    fn for_row(key: &FormKey, row: &ReconciledRow) -> Self {
        let suggestion = row.entry.suggestion_text().to_string();
        match &row.entry.id {
            Some(id) => Self::Update {
                id: id.clone(),
                body: UpdateListEntryRequest {
                    status: row.entry.status,
                    suggestion,
                },
            },
            None => Self::Create(CreateListEntryRequest {
                status: row.entry.status,
                suggestion,
                form_id: key.form_id.clone(),
                subject_id: key.subject_id.clone(),
                child_item_id: row.child_item_id().clone(),
                topic_id: row.topic_id().clone(),
            }),
        }
    }

    /// Returns true for create requests.
    #[must_use]
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create(_))
    }
}

/// Everything one submission sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPlan {
    /// Form being submitted.
    pub key: FormKey,
    /// The top-level update; always present.
    pub form_update: UpdateFormRequest,
    /// One request per row, in row order.
    pub rows: Vec<RowRequest>,
}

impl SubmissionPlan {
    /// Plans a submission of `state` on behalf of `reviewer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if no overall pass/fail decision
    /// has been chosen, or if `state` belongs to a different form than `key`.
    pub fn build(key: &FormKey, state: &ReconciliationState, reviewer: &UserId) -> Result<Self> {
        let decision = state.decision();
        if !decision.status.is_decided() {
            return Err(Error::precondition(
                "an overall decision (approved or rejected) is required",
            ));
        }
        if decision.form_id != key.form_id {
            return Err(Error::precondition(format!(
                "state belongs to form '{}', not '{}'",
                decision.form_id, key.form_id
            )));
        }

        let form_update = UpdateFormRequest {
            id: decision.form_id.clone(),
            status: decision.status,
            reason: decision.reason.clone(),
            approved_by: reviewer.clone(),
        };
        let rows = state
            .rows()
            .iter()
            .map(|row| RowRequest::for_row(key, row))
            .collect();

        Ok(Self {
            key: key.clone(),
            form_update,
            rows,
        })
    }

    /// Number of entries that will be created.
    #[must_use]
    pub fn creates(&self) -> usize {
        self.rows.iter().filter(|r| r.is_create()).count()
    }

    /// Number of entries that will be updated.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.rows.len() - self.creates()
    }

    /// Number of requests the plan issues, including the form update.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.rows.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{ChildItemId, FormId, TopicId};
    use crate::model::{ChildItem, EvaluationStatus, Form, FormSnapshot, ListEntry, Topic};

    fn state() -> ReconciliationState {
        let snapshot = FormSnapshot {
            form: Form {
                id: FormId::new("form-1"),
                status: EvaluationStatus::Pending,
                reason: Some("initial".to_string()),
                approved_by: None,
            },
            topics: vec![Topic {
                id: TopicId::new("t-1"),
                order: 1,
                title: "Soil".to_string(),
                children: vec![
                    ChildItem {
                        id: ChildItemId::new("r1"),
                        order: 1,
                        title: "persisted".to_string(),
                        list_entry: Some(ListEntry {
                            id: Some(ListEntryId::new("le-1")),
                            status: EvaluationStatus::Approved,
                            suggestion: None,
                        }),
                    },
                    ChildItem {
                        id: ChildItemId::new("r2"),
                        order: 2,
                        title: "new".to_string(),
                        list_entry: None,
                    },
                ],
            }],
        };
        ReconciliationState::from_snapshot(&snapshot).expect("state")
    }

    #[test]
    fn test_plan_requires_decision() {
        let key = FormKey::new("farmer-1", "form-1");
        let err = SubmissionPlan::build(&key, &state(), &UserId::new("u-1")).expect_err("pending");
        assert!(matches!(err, Error::PreconditionFailed { .. }));
    }

    #[test]
    fn test_plan_rejects_foreign_state() {
        let key = FormKey::new("farmer-1", "form-2");
        let mut state = state();
        state.set_overall_status(EvaluationStatus::Approved);

        let err = SubmissionPlan::build(&key, &state, &UserId::new("u-1")).expect_err("mismatch");
        assert!(matches!(err, Error::PreconditionFailed { .. }));
    }

    #[test]
    fn test_plan_partitions_rows() {
        let key = FormKey::new("farmer-1", "form-1");
        let mut state = state();
        state.set_overall_status(EvaluationStatus::Rejected);
        state.set_row_suggestion(&ChildItemId::new("r2"), "add labels");

        let plan = SubmissionPlan::build(&key, &state, &UserId::new("u-1")).expect("plan");

        assert_eq!(plan.request_count(), 3);
        assert_eq!((plan.creates(), plan.updates()), (1, 1));
        assert_eq!(plan.form_update.status, EvaluationStatus::Rejected);
        assert_eq!(plan.form_update.reason.as_deref(), Some("initial"));
        assert_eq!(plan.form_update.approved_by.as_str(), "u-1");

        match &plan.rows[0] {
            RowRequest::Update { id, body } => {
                assert_eq!(id.as_str(), "le-1");
                assert_eq!(body.suggestion, "");
            }
            RowRequest::Create(_) => panic!("persisted row must update"),
        }
        match &plan.rows[1] {
            RowRequest::Create(req) => {
                assert_eq!(req.child_item_id.as_str(), "r2");
                assert_eq!(req.topic_id.as_str(), "t-1");
                assert_eq!(req.subject_id.as_str(), "farmer-1");
                assert_eq!(req.suggestion, "add labels");
                assert_eq!(req.status, EvaluationStatus::Pending);
            }
            RowRequest::Update { .. } => panic!("unsaved row must create"),
        }
    }
}
