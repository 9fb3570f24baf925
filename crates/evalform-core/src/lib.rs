//! # evalform-core
//!
//! Form-state reconciliation and batched submission for hierarchical
//! evaluation forms.
//!
//! A reviewer loads a form (topics, each with child items), marks every item
//! approved or rejected with a suggestion, and submits an overall pass/fail
//! decision with a reason. This crate owns the parts of that workflow that
//! are independent of any user interface:
//!
//! - **Model**: the service's records ([`FormSnapshot`], [`Topic`], [`ChildItem`], [`ListEntry`])
//! - **Service seam**: the [`FormService`] trait any backend client implements
//! - **Form source**: per-form cache with explicit invalidate/refetch ([`FormSource`])
//! - **Reconciliation**: one editable [`ReconciledRow`] per child item plus a [`PendingDecision`]
//! - **Submission**: typed [`SubmissionPlan`]s dispatched concurrently by an [`EvaluationSession`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use evalform_core::prelude::*;
//!
//! let mut session = EvaluationSession::new(Arc::new(client));
//! session.open(FormKey::new("farmer-7", "form-1")).await?;
//! session.set_row_decision(&ChildItemId::new("c-1"), EvaluationStatus::Rejected)?;
//! session.set_overall_status(EvaluationStatus::Rejected)?;
//! let outcome = session.submit().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod model;
pub mod observability;
pub mod plan;
pub mod reconcile;
pub mod service;
pub mod session;
pub mod source;

/// Prelude module for convenient imports.
///
/// ```rust
/// use evalform_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::{ChildItemId, FormId, FormKey, ListEntryId, SubjectId, TopicId, UserId};
    pub use crate::model::{EvaluationStatus, FormSnapshot, ListEntry, User};
    pub use crate::reconcile::{Edit, ReconciledRow, ReconciliationState};
    pub use crate::service::FormService;
    pub use crate::session::{EvaluationSession, SubmitOutcome, SubmitPhase};
}

pub use error::{Error, Result};
pub use id::{ChildItemId, FormId, FormKey, ListEntryId, SubjectId, TopicId, UserId};
pub use model::{ChildItem, EvaluationStatus, Form, FormSnapshot, ListEntry, Reviewer, Topic, User};
pub use observability::{LogFormat, init_logging};
pub use plan::{RowRequest, SubmissionPlan};
pub use reconcile::{Edit, PendingDecision, ReconciledRow, ReconciliationState};
pub use service::{CreateListEntryRequest, FormService, UpdateFormRequest, UpdateListEntryRequest};
pub use session::{EvaluationSession, SubmitOutcome, SubmitPhase};
pub use source::{CachedForm, FormSource};
