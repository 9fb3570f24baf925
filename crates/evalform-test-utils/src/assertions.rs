//! Custom assertion helpers for evaluation tests.

use evalform_core::{ChildItemId, EvaluationStatus, ReconciliationState};

use crate::service::{OpKind, RecordingFormService};

/// Asserts the exact number of submission calls of each kind.
///
/// # Panics
///
/// Panics if any count differs.
pub fn assert_fan_out(
    service: &RecordingFormService,
    update_forms: usize,
    creates: usize,
    updates: usize,
) {
    let actual = (
        service.count(OpKind::UpdateForm),
        service.count(OpKind::CreateListEntry),
        service.count(OpKind::UpdateListEntry),
    );
    assert_eq!(
        actual,
        (update_forms, creates, updates),
        "expected (update_form, create, update) = {:?}, got {actual:?}",
        (update_forms, creates, updates)
    );
}

/// Asserts a row's current status and suggestion.
///
/// # Panics
///
/// Panics if the row is missing or differs.
pub fn assert_row(
    state: &ReconciliationState,
    row_id: &str,
    status: EvaluationStatus,
    suggestion: &str,
) {
    let row = state
        .row(&ChildItemId::new(row_id))
        .unwrap_or_else(|| panic!("row {row_id} missing"));
    assert_eq!(row.entry.status, status, "status of row {row_id}");
    assert_eq!(
        row.entry.suggestion_text(),
        suggestion,
        "suggestion of row {row_id}"
    );
}
