//! Submission coordinator tests against the recording service.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use evalform_core::{ChildItemId, Error, EvaluationStatus, SubmitOutcome, SubmitPhase};
use evalform_test_utils::{
    OpKind, RecordingFormService, ServiceOp, SnapshotFactory, TestContext, assert_fan_out,
    assert_row, init_test_logging,
};

fn r(id: &str) -> ChildItemId {
    ChildItemId::new(id)
}

#[tokio::test]
async fn test_open_builds_one_row_per_child() {
    let snapshot = SnapshotFactory::new("form-1")
        .topic("t-1", &["a", "b", "c"])
        .topic("t-2", &[])
        .topic("t-3", &["d"])
        .build();
    let ctx = TestContext::with_form(snapshot);
    let mut session = ctx.session();

    let state = session.open(ctx.key.clone()).await.expect("open");

    assert_eq!(state.len(), 4);
    assert_eq!(state.row(&r("d")).map(|row| row.topic_id().as_str()), Some("t-3"));
    assert_eq!(session.phase(), &SubmitPhase::Idle);
}

#[tokio::test]
async fn test_submit_fans_out_exactly_once_per_row() {
    init_test_logging();
    let ctx = TestContext::with_form(SnapshotFactory::mixed("form-1"));
    let mut session = ctx.session();
    session.open(ctx.key.clone()).await.expect("open");

    session.set_row_decision(&r("r1"), EvaluationStatus::Rejected).unwrap();
    session.set_row_suggestion(&r("r2"), "label the storage shed").unwrap();
    session.set_overall_status(EvaluationStatus::Rejected).unwrap();
    session.set_overall_reason("storage not compliant").unwrap();

    let outcome = session.submit().await.expect("submit");

    assert_eq!(
        outcome,
        SubmitOutcome {
            created: 1,
            updated: 1,
            refreshed: true,
        }
    );
    assert_fan_out(&ctx.service, 1, 1, 1);

    let update_form = ctx.service.operations_of(OpKind::UpdateForm);
    match &update_form[0] {
        ServiceOp::UpdateForm { key, request } => {
            assert_eq!(key, &ctx.key);
            assert_eq!(request.status, EvaluationStatus::Rejected);
            assert_eq!(request.reason.as_deref(), Some("storage not compliant"));
            assert_eq!(request.approved_by.as_str(), "reviewer-1");
        }
        other => panic!("unexpected op {other:?}"),
    }

    match &ctx.service.operations_of(OpKind::UpdateListEntry)[0] {
        ServiceOp::UpdateListEntry { id, request } => {
            assert_eq!(id.as_str(), "le-1");
            assert_eq!(request.status, EvaluationStatus::Rejected);
        }
        other => panic!("unexpected op {other:?}"),
    }

    match &ctx.service.operations_of(OpKind::CreateListEntry)[0] {
        ServiceOp::CreateListEntry { request } => {
            assert_eq!(request.child_item_id.as_str(), "r2");
            assert_eq!(request.topic_id.as_str(), "t-1");
            assert_eq!(request.subject_id, ctx.key.subject_id);
            assert_eq!(request.form_id, ctx.key.form_id);
            assert_eq!(request.suggestion, "label the storage shed");
        }
        other => panic!("unexpected op {other:?}"),
    }

    assert!(matches!(session.phase(), SubmitPhase::Succeeded(_)));
}

#[tokio::test]
async fn test_created_entry_id_survives_refresh() {
    let ctx = TestContext::with_form(SnapshotFactory::mixed("form-1"));
    let mut session = ctx.session();
    session.open(ctx.key.clone()).await.expect("open");
    session.set_overall_status(EvaluationStatus::Approved).unwrap();

    session.submit().await.expect("submit");

    let stored = ctx.service.form(&ctx.key).expect("stored form");
    let stored_id = stored.topics[0].children[1]
        .list_entry
        .as_ref()
        .and_then(|e| e.id.clone())
        .expect("server assigned id");

    let state = session.state().expect("state");
    assert_eq!(state.row(&r("r2")).and_then(|row| row.entry.id.clone()), Some(stored_id));
    assert_eq!(ctx.service.count(OpKind::FetchForm), 2);

    // A second submit updates the created entry instead of creating another.
    ctx.service.clear_operations();
    session.submit().await.expect("second submit");
    assert_fan_out(&ctx.service, 1, 0, 2);
    assert_eq!(ctx.service.entries_for("r2"), 1);
}

#[tokio::test]
async fn test_failed_create_keeps_local_edits() {
    let ctx = TestContext::with_form(SnapshotFactory::mixed("form-1"));
    ctx.service.inject_failure_for(OpKind::CreateListEntry, "r2");
    let mut session = ctx.session();
    session.open(ctx.key.clone()).await.expect("open");

    session.set_row_decision(&r("r1"), EvaluationStatus::Rejected).unwrap();
    session.set_row_suggestion(&r("r1"), "retest water").unwrap();
    session.set_overall_status(EvaluationStatus::Approved).unwrap();
    session.set_overall_reason("conditional pass").unwrap();
    let before = session.state().cloned().expect("state");

    let err = session.submit().await.expect_err("create fails");

    match &err {
        Error::Submission { message, failed, total } => {
            assert_eq!((*failed, *total), (1, 3));
            assert!(message.contains("injected failure"), "message: {message}");
        }
        other => panic!("expected submission error, got {other:?}"),
    }
    // Every request still ran to completion.
    assert_fan_out(&ctx.service, 1, 1, 1);
    // No refresh, local state exactly as entered.
    assert_eq!(ctx.service.count(OpKind::FetchForm), 1);
    assert_eq!(session.state(), Some(&before));
    assert_row(&before, "r1", EvaluationStatus::Rejected, "retest water");
    assert!(matches!(session.phase(), SubmitPhase::Failed(_)));
}

#[tokio::test]
async fn test_empty_form_submits_only_form_update() {
    let ctx = TestContext::with_form(SnapshotFactory::empty("form-1"));
    let mut session = ctx.session();
    let state = session.open(ctx.key.clone()).await.expect("open");
    assert!(state.is_empty());

    session.set_overall_status(EvaluationStatus::Approved).unwrap();
    let outcome = session.submit().await.expect("submit");

    assert_eq!(outcome, SubmitOutcome::default());
    assert_fan_out(&ctx.service, 1, 0, 0);
    assert_eq!(
        ctx.service.form(&ctx.key).map(|f| f.form.status),
        Some(EvaluationStatus::Approved)
    );
}

#[tokio::test]
async fn test_refresh_discards_unsaved_edits() {
    let ctx = TestContext::with_form(SnapshotFactory::mixed("form-1"));
    let mut session = ctx.session();
    session.open(ctx.key.clone()).await.expect("open");

    session.set_row_decision(&r("r1"), EvaluationStatus::Rejected).unwrap();
    session.set_row_suggestion(&r("r2"), "draft").unwrap();
    session.set_overall_status(EvaluationStatus::Rejected).unwrap();

    let state = session.refresh().await.expect("refresh");

    assert_row(state, "r1", EvaluationStatus::Approved, "looks fine");
    assert_row(state, "r2", EvaluationStatus::Pending, "");
    assert_eq!(state.decision().status, EvaluationStatus::Pending);
}

#[tokio::test]
async fn test_submit_without_decision_sends_nothing() {
    let ctx = TestContext::with_form(SnapshotFactory::mixed("form-1"));
    let mut session = ctx.session();
    session.open(ctx.key.clone()).await.expect("open");

    let err = session.submit().await.expect_err("no decision");

    assert!(matches!(err, Error::PreconditionFailed { .. }));
    assert_fan_out(&ctx.service, 0, 0, 0);
}

#[tokio::test]
async fn test_submit_without_open_form_fails() {
    let ctx = TestContext::new();
    let mut session = ctx.session();

    let err = session.submit().await.expect_err("nothing open");
    assert!(matches!(err, Error::PreconditionFailed { .. }));
    assert!(session.set_overall_status(EvaluationStatus::Approved).is_err());
}

#[tokio::test]
async fn test_requests_are_issued_concurrently() {
    let service = RecordingFormService::with_latency(Duration::from_millis(50));
    let ctx = TestContext {
        service: std::sync::Arc::new(service),
        ..TestContext::new()
    };
    ctx.service.insert_form(
        ctx.key.clone(),
        SnapshotFactory::new("form-1")
            .topic("t-1", &["a", "b", "c"])
            .topic("t-2", &["d", "e"])
            .entry("d", "le-d", EvaluationStatus::Approved, "")
            .build(),
    );
    let mut session = ctx.session();
    session.open(ctx.key.clone()).await.expect("open");
    session.set_overall_status(EvaluationStatus::Approved).unwrap();

    session.submit().await.expect("submit");

    // Five rows plus the form update, all in flight together.
    assert_eq!(ctx.service.max_in_flight(), 6);
    assert_fan_out(&ctx.service, 1, 4, 1);
}

#[tokio::test]
async fn test_open_unknown_form_is_fetch_error() {
    let ctx = TestContext::new();
    let mut session = ctx.session();

    let err = session.open(ctx.key.clone()).await.expect_err("missing");

    assert!(err.is_fetch());
    assert!(session.state().is_none());
}

#[tokio::test]
async fn test_failed_refresh_keeps_state() {
    let ctx = TestContext::with_form(SnapshotFactory::mixed("form-1"));
    let mut session = ctx.session();
    session.open(ctx.key.clone()).await.expect("open");
    session.set_row_suggestion(&r("r2"), "keep me").unwrap();

    ctx.service.inject_failure(OpKind::FetchForm);
    let err = session.refresh().await.expect_err("fetch fails");

    assert!(err.is_fetch());
    assert_row(session.state().expect("state"), "r2", EvaluationStatus::Pending, "keep me");
}

#[tokio::test]
async fn test_refresh_failure_after_successful_submit() {
    let ctx = TestContext::with_form(SnapshotFactory::mixed("form-1"));
    let mut session = ctx.session();
    session.open(ctx.key.clone()).await.expect("open");
    session.set_row_suggestion(&r("r2"), "add a permit").unwrap();
    session.set_overall_status(EvaluationStatus::Approved).unwrap();

    ctx.service.inject_failure(OpKind::FetchForm);
    let outcome = session.submit().await.expect("writes succeeded");

    assert_eq!(
        outcome,
        SubmitOutcome {
            created: 1,
            updated: 1,
            refreshed: false,
        }
    );
    assert_eq!(session.phase(), &SubmitPhase::Succeeded(outcome));
    assert_fan_out(&ctx.service, 1, 1, 1);

    let state = session.state().expect("state");
    let created = state.row(&r("r2")).expect("r2");
    assert!(created.entry.is_persisted());
    assert_eq!(created.entry.suggestion_text(), "add a permit");

    ctx.service.clear_failures();
    ctx.service.clear_operations();
    let retry = session.submit().await.expect("retry");

    assert_eq!(
        retry,
        SubmitOutcome {
            created: 0,
            updated: 2,
            refreshed: true,
        }
    );
    assert_fan_out(&ctx.service, 1, 0, 2);
    assert_eq!(ctx.service.entries_for("r2"), 1);
}

#[tokio::test]
async fn test_precondition_failure_leaves_phase_idle() {
    let ctx = TestContext::with_form(SnapshotFactory::mixed("form-1"));
    let mut session = ctx.session();
    session.open(ctx.key.clone()).await.expect("open");

    session.submit().await.expect_err("no decision");

    assert_eq!(session.phase(), &SubmitPhase::Idle);
    assert_eq!(ctx.service.count(OpKind::CurrentUser), 0);
}

#[tokio::test]
async fn test_reviewer_fetched_once() {
    let ctx = TestContext::with_form(SnapshotFactory::mixed("form-1"));
    let mut session = ctx.session();
    session.open(ctx.key.clone()).await.expect("open");
    session.set_overall_status(EvaluationStatus::Approved).unwrap();

    session.submit().await.expect("first");
    session.submit().await.expect("second");

    assert_eq!(ctx.service.count(OpKind::CurrentUser), 1);
    let approved_by = ctx
        .service
        .form(&ctx.key)
        .and_then(|f| f.form.approved_by)
        .expect("approver recorded");
    assert_eq!(approved_by.full_name(), "Test Reviewer");
}

#[tokio::test]
async fn test_reviewer_failure_blocks_submit() {
    let ctx = TestContext::with_form(SnapshotFactory::mixed("form-1"));
    ctx.service.inject_failure(OpKind::CurrentUser);
    let mut session = ctx.session();
    session.open(ctx.key.clone()).await.expect("open");
    session.set_overall_status(EvaluationStatus::Approved).unwrap();

    let err = session.submit().await.expect_err("no reviewer");

    assert!(err.is_fetch());
    assert_fan_out(&ctx.service, 0, 0, 0);
}
