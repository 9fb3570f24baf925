//! In-memory form service with operation recording.
//!
//! [`RecordingFormService`] behaves like the evaluation backend (it assigns
//! list-entry ids, applies updates, and returns fresh snapshots) while
//! recording every call for assertions. Failures can be injected per
//! operation kind, optionally narrowed to one target id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use evalform_core::error::{Error, Result};
use evalform_core::{
    CreateListEntryRequest, FormKey, FormService, FormSnapshot, ListEntry, ListEntryId, Reviewer,
    UpdateFormRequest, UpdateListEntryRequest, User, UserId,
};

/// Kind of service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `fetch_form`.
    FetchForm,
    /// `update_form`.
    UpdateForm,
    /// `create_list_entry`.
    CreateListEntry,
    /// `update_list_entry`.
    UpdateListEntry,
    /// `current_user`.
    CurrentUser,
}

/// Record of a service call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceOp {
    /// A form was fetched.
    FetchForm {
        /// Form requested.
        key: FormKey,
    },
    /// A form decision was written.
    UpdateForm {
        /// Form updated.
        key: FormKey,
        /// Body sent.
        request: UpdateFormRequest,
    },
    /// A list entry creation was requested.
    CreateListEntry {
        /// Body sent.
        request: CreateListEntryRequest,
    },
    /// A list entry update was requested.
    UpdateListEntry {
        /// Entry targeted.
        id: ListEntryId,
        /// Body sent.
        request: UpdateListEntryRequest,
    },
    /// The current user was requested.
    CurrentUser,
}

impl ServiceOp {
    /// Kind of this call.
    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            Self::FetchForm { .. } => OpKind::FetchForm,
            Self::UpdateForm { .. } => OpKind::UpdateForm,
            Self::CreateListEntry { .. } => OpKind::CreateListEntry,
            Self::UpdateListEntry { .. } => OpKind::UpdateListEntry,
            Self::CurrentUser => OpKind::CurrentUser,
        }
    }

    /// Id the call targets: form id, child item id, or entry id.
    fn target(&self) -> Option<&str> {
        match self {
            Self::FetchForm { key } | Self::UpdateForm { key, .. } => Some(key.form_id.as_str()),
            Self::CreateListEntry { request } => Some(request.child_item_id.as_str()),
            Self::UpdateListEntry { id, .. } => Some(id.as_str()),
            Self::CurrentUser => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Failure {
    kind: OpKind,
    target: Option<String>,
}

/// In-memory evaluation backend that records every call.
#[derive(Debug, Clone)]
pub struct RecordingFormService {
    forms: Arc<Mutex<HashMap<FormKey, FormSnapshot>>>,
    user: Arc<Mutex<User>>,
    operations: Arc<Mutex<Vec<ServiceOp>>>,
    failures: Arc<Mutex<Vec<Failure>>>,
    latency: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for RecordingFormService {
    fn default() -> Self {
        Self {
            forms: Arc::default(),
            user: Arc::new(Mutex::new(default_user())),
            operations: Arc::default(),
            failures: Arc::default(),
            latency: None,
            in_flight: Arc::default(),
            max_in_flight: Arc::default(),
        }
    }
}

fn default_user() -> User {
    User {
        id: UserId::new("reviewer-1"),
        first_name: "Test".to_string(),
        last_name: "Reviewer".to_string(),
        email: Some("reviewer@example.com".to_string()),
        phone: Some("000-000-0000".to_string()),
    }
}

impl RecordingFormService {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service where every call sleeps for `latency` first.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Stores `snapshot` under `key`, replacing any previous form.
    pub fn insert_form(&self, key: FormKey, snapshot: FormSnapshot) {
        self.forms.lock().expect("lock").insert(key, snapshot);
    }

    /// Returns the stored form for `key`.
    #[must_use]
    pub fn form(&self, key: &FormKey) -> Option<FormSnapshot> {
        self.forms.lock().expect("lock").get(key).cloned()
    }

    /// Replaces the signed-in user.
    pub fn set_user(&self, user: User) {
        *self.user.lock().expect("lock") = user;
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<ServiceOp> {
        self.operations.lock().expect("lock").clone()
    }

    /// Returns recorded operations of one kind.
    #[must_use]
    pub fn operations_of(&self, kind: OpKind) -> Vec<ServiceOp> {
        self.operations()
            .into_iter()
            .filter(|op| op.kind() == kind)
            .collect()
    }

    /// Number of recorded operations of one kind.
    #[must_use]
    pub fn count(&self, kind: OpKind) -> usize {
        self.operations_of(kind).len()
    }

    /// Clears recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().expect("lock").clear();
    }

    /// Makes every call of `kind` fail.
    pub fn inject_failure(&self, kind: OpKind) {
        self.failures.lock().expect("lock").push(Failure { kind, target: None });
    }

    /// Makes calls of `kind` on `target` fail.
    ///
    /// The target is the form id for form calls, the child item id for
    /// creates, and the entry id for updates.
    pub fn inject_failure_for(&self, kind: OpKind, target: impl Into<String>) {
        self.failures.lock().expect("lock").push(Failure {
            kind,
            target: Some(target.into()),
        });
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.failures.lock().expect("lock").clear();
    }

    /// Highest number of calls observed in flight at the same time.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Number of stored entries for `child_item_id` across all forms.
    #[must_use]
    pub fn entries_for(&self, child_item_id: &str) -> usize {
        self.forms
            .lock()
            .expect("lock")
            .values()
            .flat_map(|f| f.topics.iter())
            .flat_map(|t| t.children.iter())
            .filter(|c| c.id.as_str() == child_item_id && c.list_entry.is_some())
            .count()
    }

    /// Records `op`, waits out the configured latency, then applies any
    /// injected failure.
    async fn begin(&self, op: ServiceOp) -> Result<()> {
        let failure = {
            let failures = self.failures.lock().expect("lock");
            failures.iter().any(|f| {
                f.kind == op.kind()
                    && f.target
                        .as_deref()
                        .map_or(true, |t| op.target() == Some(t))
            })
        };
        let description = format!("{:?} {}", op.kind(), op.target().unwrap_or("-"));
        self.operations.lock().expect("lock").push(op);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if failure {
            return Err(Error::Api {
                status: 500,
                body: format!("injected failure: {description}"),
            });
        }
        Ok(())
    }
}

fn not_found(what: impl std::fmt::Display) -> Error {
    Error::Api {
        status: 404,
        body: format!("not found: {what}"),
    }
}

#[async_trait]
impl FormService for RecordingFormService {
    async fn fetch_form(&self, key: &FormKey) -> Result<FormSnapshot> {
        self.begin(ServiceOp::FetchForm { key: key.clone() }).await?;
        self.form(key).ok_or_else(|| not_found(key))
    }

    async fn update_form(&self, key: &FormKey, request: &UpdateFormRequest) -> Result<()> {
        self.begin(ServiceOp::UpdateForm {
            key: key.clone(),
            request: request.clone(),
        })
        .await?;

        let user = self.user.lock().expect("lock").clone();
        let mut forms = self.forms.lock().expect("lock");
        let form = &mut forms.get_mut(key).ok_or_else(|| not_found(key))?.form;
        form.status = request.status;
        form.reason.clone_from(&request.reason);
        form.approved_by = (user.id == request.approved_by).then(|| Reviewer {
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
        });
        Ok(())
    }

    async fn create_list_entry(&self, request: &CreateListEntryRequest) -> Result<ListEntry> {
        self.begin(ServiceOp::CreateListEntry {
            request: request.clone(),
        })
        .await?;

        let key = FormKey {
            subject_id: request.subject_id.clone(),
            form_id: request.form_id.clone(),
        };
        let mut forms = self.forms.lock().expect("lock");
        let child = forms
            .get_mut(&key)
            .ok_or_else(|| not_found(&key))?
            .topics
            .iter_mut()
            .filter(|t| t.id == request.topic_id)
            .flat_map(|t| t.children.iter_mut())
            .find(|c| c.id == request.child_item_id)
            .ok_or_else(|| not_found(&request.child_item_id))?;

        let entry = ListEntry {
            id: Some(ListEntryId::new(format!("le-{}", uuid::Uuid::new_v4().as_simple()))),
            status: request.status,
            suggestion: Some(request.suggestion.clone()),
        };
        child.list_entry = Some(entry.clone());
        Ok(entry)
    }

    async fn update_list_entry(
        &self,
        id: &ListEntryId,
        request: &UpdateListEntryRequest,
    ) -> Result<()> {
        self.begin(ServiceOp::UpdateListEntry {
            id: id.clone(),
            request: request.clone(),
        })
        .await?;

        let mut forms = self.forms.lock().expect("lock");
        let entry = forms
            .values_mut()
            .flat_map(|f| f.topics.iter_mut())
            .flat_map(|t| t.children.iter_mut())
            .filter_map(|c| c.list_entry.as_mut())
            .find(|e| e.id.as_ref() == Some(id))
            .ok_or_else(|| not_found(id))?;

        entry.status = request.status;
        entry.suggestion = Some(request.suggestion.clone());
        Ok(())
    }

    async fn current_user(&self) -> Result<User> {
        self.begin(ServiceOp::CurrentUser).await?;
        Ok(self.user.lock().expect("lock").clone())
    }
}
