//! Pre-built test fixtures for common evaluation scenarios.

use std::sync::Arc;

use evalform_core::{
    ChildItem, ChildItemId, EvaluationSession, EvaluationStatus, Form, FormId, FormKey,
    FormSnapshot, ListEntry, ListEntryId, Topic, TopicId,
};

use crate::service::RecordingFormService;

/// Test context with a recording service and a unique form key.
pub struct TestContext {
    /// Shared recording service.
    pub service: Arc<RecordingFormService>,
    /// Key of the form under test.
    pub key: FormKey,
}

impl TestContext {
    /// Creates a context with a unique subject and an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self {
            service: Arc::new(RecordingFormService::new()),
            key: FormKey::new(
                format!("farmer-{}", uuid::Uuid::new_v4().as_simple()),
                "form-1",
            ),
        }
    }

    /// Creates a context whose service already holds `snapshot`.
    #[must_use]
    pub fn with_form(snapshot: FormSnapshot) -> Self {
        let ctx = Self::new();
        ctx.service.insert_form(ctx.key.clone(), snapshot);
        ctx
    }

    /// Creates a session over this context's service.
    #[must_use]
    pub fn session(&self) -> EvaluationSession<RecordingFormService> {
        EvaluationSession::new(Arc::clone(&self.service))
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for form snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotFactory {
    form: Form,
    topics: Vec<Topic>,
}

impl SnapshotFactory {
    /// Starts a pending form with no topics.
    #[must_use]
    pub fn new(form_id: &str) -> Self {
        Self {
            form: Form {
                id: FormId::new(form_id),
                status: EvaluationStatus::Pending,
                reason: None,
                approved_by: None,
            },
            topics: Vec::new(),
        }
    }

    /// Sets the form's stored decision.
    #[must_use]
    pub fn status(mut self, status: EvaluationStatus, reason: Option<&str>) -> Self {
        self.form.status = status;
        self.form.reason = reason.map(str::to_string);
        self
    }

    /// Adds a topic with child items that have no entry yet.
    #[must_use]
    pub fn topic(mut self, topic_id: &str, child_ids: &[&str]) -> Self {
        let children = child_ids.iter().map(|id| child(id, None)).collect();
        self.topics.push(Topic {
            id: TopicId::new(topic_id),
            order: u32::try_from(self.topics.len()).unwrap_or(u32::MAX),
            title: format!("Topic {topic_id}"),
            children,
        });
        self
    }

    /// Attaches a persisted entry to an existing child item.
    ///
    /// # Panics
    ///
    /// Panics if no topic contains `child_id`.
    #[must_use]
    pub fn entry(
        mut self,
        child_id: &str,
        entry_id: &str,
        status: EvaluationStatus,
        suggestion: &str,
    ) -> Self {
        let child = self
            .topics
            .iter_mut()
            .flat_map(|t| t.children.iter_mut())
            .find(|c| c.id.as_str() == child_id)
            .expect("child item exists");
        child.list_entry = Some(ListEntry {
            id: Some(ListEntryId::new(entry_id)),
            status,
            suggestion: Some(suggestion.to_string()),
        });
        self
    }

    /// Finishes the snapshot.
    #[must_use]
    pub fn build(self) -> FormSnapshot {
        FormSnapshot {
            form: self.form,
            topics: self.topics,
        }
    }

    /// A form with one persisted row (`r1`, entry `le-1`) and one new row
    /// (`r2`) in topic `t-1`.
    #[must_use]
    pub fn mixed(form_id: &str) -> FormSnapshot {
        Self::new(form_id)
            .topic("t-1", &["r1", "r2"])
            .entry("r1", "le-1", EvaluationStatus::Approved, "looks fine")
            .build()
    }

    /// A form with no topics at all.
    #[must_use]
    pub fn empty(form_id: &str) -> FormSnapshot {
        Self::new(form_id).build()
    }
}

fn child(id: &str, entry: Option<ListEntry>) -> ChildItem {
    ChildItem {
        id: ChildItemId::new(id),
        order: 0,
        title: format!("Item {id}"),
        list_entry: entry,
    }
}
