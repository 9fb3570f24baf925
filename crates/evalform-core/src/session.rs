//! Evaluation session: the submission coordinator.
//!
//! An [`EvaluationSession`] opens one form at a time, exposes its
//! reconciliation state for editing, and submits it:
//!
//! 1. plan the submission (form update + one create/update per row);
//! 2. issue every request concurrently;
//! 3. wait until all of them have settled;
//! 4. on full success, record the ids of created entries, then refetch the
//!    form and rebuild local state; on any failure, report it and leave local
//!    edits untouched.
//!
//! `submit` takes `&mut self`, so a session never has two submissions in
//! flight. Nothing is rolled back when some requests of a failed submission
//! succeeded: retrying after such a failure may create a second entry for a
//! row whose create already went through.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::Instrument;

use crate::error::{Error, Result};
use crate::id::{ChildItemId, FormKey, ListEntryId};
use crate::model::{EvaluationStatus, FormSnapshot, User};
use crate::observability::evaluation_span;
use crate::plan::{RowRequest, SubmissionPlan};
use crate::reconcile::{Edit, ReconciliationState};
use crate::service::FormService;
use crate::source::FormSource;

/// Counts reported by a successful submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    /// List entries created.
    pub created: usize,
    /// List entries updated.
    pub updated: usize,
    /// Whether the form was refetched after saving. When false the server
    /// holds the submission but local state was not rebuilt from it.
    pub refreshed: bool,
}

/// Lifecycle of the most recent submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmitPhase {
    /// Nothing submitted since the form was opened.
    #[default]
    Idle,
    /// Requests are in flight.
    InFlight,
    /// The last submission succeeded.
    Succeeded(SubmitOutcome),
    /// The last submission failed with this message.
    Failed(String),
}

/// Open form plus its local edits.
#[derive(Debug)]
struct OpenForm {
    key: FormKey,
    state: ReconciliationState,
}

/// Loads, edits and submits evaluation forms against a [`FormService`].
#[derive(Debug)]
pub struct EvaluationSession<S: ?Sized> {
    source: FormSource<S>,
    open: Option<OpenForm>,
    phase: SubmitPhase,
}

impl<S: FormService + ?Sized> EvaluationSession<S> {
    /// Creates a session with nothing open.
    #[must_use]
    pub fn new(service: Arc<S>) -> Self {
        Self {
            source: FormSource::new(service),
            open: None,
            phase: SubmitPhase::Idle,
        }
    }

    /// Opens `key`, using the cached snapshot when there is one.
    ///
    /// Local state is rebuilt from the snapshot; edits to a previously open
    /// form are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if the form is not cached and cannot be
    /// fetched, or [`Error::InvalidSnapshot`] if the snapshot is malformed.
    /// The previously open form stays open on error.
    pub async fn open(&mut self, key: FormKey) -> Result<&ReconciliationState> {
        let span = evaluation_span("open", &key);
        let cached = self.source.load(&key).instrument(span).await?;
        let state = ReconciliationState::from_snapshot(&cached.snapshot)?;
        Ok(self.replace_open(key, state))
    }

    /// Refetches the open form and rebuilds local state, discarding edits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if no form is open, or
    /// [`Error::Fetch`] if the refetch fails. Local state is unchanged on
    /// error.
    pub async fn refresh(&mut self) -> Result<&ReconciliationState> {
        let key = self.open_key()?.clone();
        let span = evaluation_span("refresh", &key);
        let cached = self.source.refetch(&key).instrument(span).await?;
        let state = ReconciliationState::from_snapshot(&cached.snapshot)?;
        Ok(self.replace_open(key, state))
    }

    /// Key of the open form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if no form is open.
    pub fn open_key(&self) -> Result<&FormKey> {
        self.open
            .as_ref()
            .map(|o| &o.key)
            .ok_or_else(|| Error::precondition("no form is open"))
    }

    /// Local state of the open form.
    #[must_use]
    pub fn state(&self) -> Option<&ReconciliationState> {
        self.open.as_ref().map(|o| &o.state)
    }

    /// Last fetched snapshot of the open form.
    #[must_use]
    pub fn snapshot(&self) -> Option<&FormSnapshot> {
        let open = self.open.as_ref()?;
        self.source.cached(&open.key).map(|c| &c.snapshot)
    }

    /// Lifecycle of the most recent submission.
    #[must_use]
    pub fn phase(&self) -> &SubmitPhase {
        &self.phase
    }

    /// The underlying form source.
    #[must_use]
    pub fn source(&self) -> &FormSource<S> {
        &self.source
    }

    /// Mutable access to the underlying form source.
    pub fn source_mut(&mut self) -> &mut FormSource<S> {
        &mut self.source
    }

    /// Returns the signed-in reviewer.
    ///
    /// # Errors
    ///
    /// Returns the service error if the current user cannot be fetched.
    pub async fn reviewer(&mut self) -> Result<&User> {
        self.source.reviewer().await
    }

    /// Applies one edit to the open form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if no form is open.
    pub fn apply(&mut self, edit: Edit) -> Result<()> {
        edit.apply(self.state_mut()?);
        Ok(())
    }

    /// Sets the status of one row of the open form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if no form is open.
    pub fn set_row_decision(&mut self, row_id: &ChildItemId, status: EvaluationStatus) -> Result<()> {
        self.state_mut()?.set_row_decision(row_id, status);
        Ok(())
    }

    /// Sets the suggestion of one row of the open form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if no form is open.
    pub fn set_row_suggestion(&mut self, row_id: &ChildItemId, text: impl Into<String>) -> Result<()> {
        self.state_mut()?.set_row_suggestion(row_id, text);
        Ok(())
    }

    /// Sets the overall status of the open form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if no form is open.
    pub fn set_overall_status(&mut self, status: EvaluationStatus) -> Result<()> {
        self.state_mut()?.set_overall_status(status);
        Ok(())
    }

    /// Sets the overall reason of the open form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionFailed`] if no form is open.
    pub fn set_overall_reason(&mut self, text: impl Into<String>) -> Result<()> {
        self.state_mut()?.set_overall_reason(text);
        Ok(())
    }

    /// Submits the open form.
    ///
    /// Once every request has succeeded the submission counts as saved. The
    /// form is then refetched; if that refetch fails the outcome reports
    /// `refreshed: false` and local state keeps the ids of the entries just
    /// created, so a second submit updates them instead of creating new ones.
    ///
    /// # Errors
    ///
    /// - [`Error::PreconditionFailed`] if no form is open or no overall
    ///   decision was chosen; nothing is sent and the phase is unchanged.
    /// - [`Error::Fetch`] if the reviewer cannot be fetched before sending.
    /// - [`Error::Submission`] if any request failed; local edits are kept
    ///   and no refresh happens.
    pub async fn submit(&mut self) -> Result<SubmitOutcome> {
        let key = self.open_key()?.clone();
        let decided = self
            .state()
            .is_some_and(|state| state.decision().status.is_decided());
        if !decided {
            return Err(Error::precondition(
                "an overall decision (approved or rejected) is required",
            ));
        }

        let span = evaluation_span("submit", &key);
        let result = self.submit_inner(&key).instrument(span).await;
        match &result {
            Ok(outcome) => self.phase = SubmitPhase::Succeeded(*outcome),
            Err(Error::PreconditionFailed { .. }) => {}
            Err(err) => self.phase = SubmitPhase::Failed(err.to_string()),
        }
        result
    }

    async fn submit_inner(&mut self, key: &FormKey) -> Result<SubmitOutcome> {
        let reviewer = self
            .source
            .reviewer()
            .await
            .map_err(|e| Error::fetch(key, e))?
            .id
            .clone();

        let state = self
            .state()
            .ok_or_else(|| Error::precondition("no form is open"))?;
        let plan = SubmissionPlan::build(key, state, &reviewer)?;

        tracing::info!(
            creates = plan.creates(),
            updates = plan.updates(),
            requests = plan.request_count(),
            "submitting evaluation"
        );

        self.phase = SubmitPhase::InFlight;
        let created = dispatch(self.source.service().as_ref(), &plan).await?;

        let state = self.state_mut()?;
        for (row_id, id) in created {
            state.mark_persisted(&row_id, id);
        }

        let refetched = self
            .source
            .refetch(key)
            .await
            .and_then(|cached| ReconciliationState::from_snapshot(&cached.snapshot));
        let refreshed = match refetched {
            Ok(state) => {
                self.replace_open(key.clone(), state);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "evaluation saved but refresh failed");
                false
            }
        };

        let outcome = SubmitOutcome {
            created: plan.creates(),
            updated: plan.updates(),
            refreshed,
        };

        tracing::info!(
            created = outcome.created,
            updated = outcome.updated,
            refreshed = outcome.refreshed,
            "evaluation submitted"
        );
        Ok(outcome)
    }

    fn state_mut(&mut self) -> Result<&mut ReconciliationState> {
        self.open
            .as_mut()
            .map(|o| &mut o.state)
            .ok_or_else(|| Error::precondition("no form is open"))
    }

    fn replace_open(&mut self, key: FormKey, state: ReconciliationState) -> &ReconciliationState {
        let changed_form = self.open.as_ref().map_or(true, |o| o.key != key);
        if changed_form {
            self.phase = SubmitPhase::Idle;
        }
        &self.open.insert(OpenForm { key, state }).state
    }
}

/// Issues every request of `plan` at once and waits for all to settle.
///
/// Requests are not cancelled when a sibling fails. On success returns the
/// server id of every created entry, keyed by row. The error, if any,
/// carries the message of the first failure in plan order (form update
/// first, then rows).
async fn dispatch<S: FormService + ?Sized>(
    service: &S,
    plan: &SubmissionPlan,
) -> Result<Vec<(ChildItemId, ListEntryId)>> {
    let form_update = service.update_form(&plan.key, &plan.form_update);
    let rows = join_all(plan.rows.iter().map(|request| async move {
        match request {
            RowRequest::Create(body) => service
                .create_list_entry(body)
                .await
                .map(|entry| entry.id.map(|id| (body.child_item_id.clone(), id))),
            RowRequest::Update { id, body } => {
                service.update_list_entry(id, body).await.map(|()| None)
            }
        }
    }));

    let (form_result, row_results) = futures::join!(form_update, rows);

    let total = plan.request_count();
    let mut created = Vec::new();
    let mut failures = Vec::new();
    if let Err(err) = form_result {
        failures.push(err);
    }
    for result in row_results {
        match result {
            Ok(Some(pair)) => created.push(pair),
            Ok(None) => {}
            Err(err) => failures.push(err),
        }
    }

    let failed = failures.len();
    let Some(first) = failures.into_iter().next() else {
        return Ok(created);
    };

    tracing::warn!(failed, total, error = %first, "evaluation submission failed");
    Err(Error::Submission {
        message: first.to_string(),
        failed,
        total,
    })
}
