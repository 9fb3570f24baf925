//! The remote evaluation service contract.
//!
//! [`FormService`] is the seam between the reconciliation core and whatever
//! talks to the evaluation backend: the HTTP client in `evalform-cli`, or the
//! recording in-memory service in `evalform-test-utils`.
//!
//! Request bodies keep the service's wire names (`farmerId`,
//! `evalTopicKos06Id`, `childEvalTopicKos06Id`, `approveByUserId`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::id::{ChildItemId, FormId, FormKey, ListEntryId, SubjectId, TopicId, UserId};
use crate::model::{EvaluationStatus, FormSnapshot, ListEntry, User};

/// Body of the update-form call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormRequest {
    /// Form being decided.
    pub id: FormId,
    /// Overall decision.
    pub status: EvaluationStatus,
    /// Justification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Reviewer recorded as the approver.
    #[serde(rename = "approveByUserId")]
    pub approved_by: UserId,
}

/// Body of the create-list-entry call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListEntryRequest {
    /// Per-item decision.
    pub status: EvaluationStatus,
    /// Free-text suggestion.
    pub suggestion: String,
    /// Owning form.
    #[serde(rename = "formEvaluationId")]
    pub form_id: FormId,
    /// Subject under evaluation.
    #[serde(rename = "farmerId")]
    pub subject_id: SubjectId,
    /// Child item the entry decides.
    #[serde(rename = "childEvalTopicKos06Id")]
    pub child_item_id: ChildItemId,
    /// Topic of the child item.
    #[serde(rename = "evalTopicKos06Id")]
    pub topic_id: TopicId,
}

/// Body of the update-list-entry call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListEntryRequest {
    /// Per-item decision.
    pub status: EvaluationStatus,
    /// Free-text suggestion.
    pub suggestion: String,
}

/// Operations the evaluation backend provides.
///
/// Implementations must be safe to call concurrently: a submission issues
/// every row request and the form update at the same time.
#[async_trait]
pub trait FormService: Send + Sync {
    /// Fetches the form, its topics, child items and existing entries.
    ///
    /// Must be re-invokable; it is used for the initial load and for every
    /// refresh after a submission.
    async fn fetch_form(&self, key: &FormKey) -> Result<FormSnapshot>;

    /// Records the overall decision of a form.
    async fn update_form(&self, key: &FormKey, request: &UpdateFormRequest) -> Result<()>;

    /// Creates a list entry and returns it with its server-assigned id.
    async fn create_list_entry(&self, request: &CreateListEntryRequest) -> Result<ListEntry>;

    /// Updates an existing list entry.
    async fn update_list_entry(
        &self,
        id: &ListEntryId,
        request: &UpdateListEntryRequest,
    ) -> Result<()>;

    /// Returns the signed-in reviewer.
    async fn current_user(&self) -> Result<User>;
}
