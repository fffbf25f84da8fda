//! Integration tests for `AnswerPipeline`.
//!
//! Each test builds a fresh store, hub and pipeline around a judge double and
//! drives submissions directly, checking what ends up in the race state and
//! what viewers receive.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use axum::extract::ws::Message;
use derby_core::{AnswerStatus, RaceState};

use derby_api::engine::pipeline::{SkipReason, GENERATION_FALLBACK};
use derby_api::engine::{Submission, SubmissionOutcome};

use common::{
    test_state, BrokenEvaluator, FailingJudge, HangingJudge, ModelDownJudge, ScriptedJudge,
    SilentEvaluator,
};

const TIMEOUT: Duration = Duration::from_secs(2);

fn submission(horse_id: i64, question_id: &str, model: &str) -> Submission {
    Submission {
        horse_id,
        question_id: question_id.to_string(),
        model_value: model.to_string(),
    }
}

async fn first_question(state: &derby_api::state::AppState) -> String {
    state.store.snapshot().await.questions[0].id.clone()
}

fn decode(message: Message) -> RaceState {
    match message {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("Expected Text message, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Test: an approved answer moves the horse forward and is recorded
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approved_answer_advances_horse() {
    let state = test_state(Arc::new(ScriptedJudge::approving()), TIMEOUT);
    let question_id = first_question(&state).await;

    let outcome = state
        .pipeline
        .process(submission(1, &question_id, "gpt-4o"))
        .await;

    let answer = assert_matches!(outcome, SubmissionOutcome::Judged(a) => a);
    assert_eq!(answer.status, AnswerStatus::Approved);
    assert_eq!(answer.horse_id, 1);
    assert_eq!(answer.question_id, question_id);
    assert!(answer.content.starts_with("gpt-4o says:"));

    let snapshot = state.store.snapshot().await;
    assert_eq!(snapshot.horse(1).unwrap().position, 1);
    assert_eq!(snapshot.answers, vec![answer]);
}

// ---------------------------------------------------------------------------
// Test: a rejected answer at the start stays at zero but is recorded
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_answer_at_start_is_clamped() {
    let state = test_state(Arc::new(ScriptedJudge::rejecting()), TIMEOUT);
    let question_id = first_question(&state).await;

    let outcome = state
        .pipeline
        .process(submission(2, &question_id, "gpt-4o"))
        .await;

    assert!(!outcome.approved());
    let snapshot = state.store.snapshot().await;
    assert_eq!(snapshot.horse(2).unwrap().position, 0);
    assert_eq!(snapshot.answers.len(), 1);
    assert_eq!(snapshot.answers[0].status, AnswerStatus::Rejected);
}

// ---------------------------------------------------------------------------
// Test: unknown horse or question is skipped without any change
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_horse_is_skipped() {
    let state = test_state(Arc::new(ScriptedJudge::approving()), TIMEOUT);
    let question_id = first_question(&state).await;
    let before = state.store.snapshot().await;

    let outcome = state
        .pipeline
        .process(submission(99, &question_id, "gpt-4o"))
        .await;

    assert_eq!(outcome, SubmissionOutcome::Skipped(SkipReason::UnknownHorse));
    assert_eq!(state.store.snapshot().await, before);
}

#[tokio::test]
async fn unknown_question_is_skipped() {
    let judge = Arc::new(ScriptedJudge::approving());
    let state = test_state(judge.clone(), TIMEOUT);
    let before = state.store.snapshot().await;

    let outcome = state
        .pipeline
        .process(submission(1, "no-such-question", "gpt-4o"))
        .await;

    assert_eq!(
        outcome,
        SubmissionOutcome::Skipped(SkipReason::UnknownQuestion)
    );
    assert_eq!(state.store.snapshot().await, before);
    assert_eq!(judge.generate_calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Test: generation failure records the fallback text and rejects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generation_failure_rejects_with_fallback() {
    let state = test_state(Arc::new(FailingJudge), TIMEOUT);
    let question_id = first_question(&state).await;

    let outcome = state
        .pipeline
        .process(submission(3, &question_id, "gpt-4o"))
        .await;

    let answer = assert_matches!(outcome, SubmissionOutcome::Judged(a) => a);
    assert_eq!(answer.status, AnswerStatus::Rejected);
    assert_eq!(answer.content, GENERATION_FALLBACK);
}

// ---------------------------------------------------------------------------
// Test: the fallback text is never sent for evaluation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generation_failure_skips_evaluation() {
    let judge = Arc::new(ModelDownJudge::default());
    let state = test_state(judge.clone(), TIMEOUT);
    let question_id = first_question(&state).await;

    let outcome = state
        .pipeline
        .process(submission(2, &question_id, "gpt-4o"))
        .await;

    let answer = assert_matches!(outcome, SubmissionOutcome::Judged(a) => a);
    assert_eq!(answer.status, AnswerStatus::Rejected);
    assert_eq!(answer.content, GENERATION_FALLBACK);
    assert_eq!(judge.evaluate_calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Test: evaluation failure keeps the generated text but rejects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn evaluation_failure_rejects() {
    let state = test_state(Arc::new(BrokenEvaluator), TIMEOUT);
    let question_id = first_question(&state).await;

    let outcome = state
        .pipeline
        .process(submission(1, &question_id, "gpt-4o"))
        .await;

    let answer = assert_matches!(outcome, SubmissionOutcome::Judged(a) => a);
    assert_eq!(answer.status, AnswerStatus::Rejected);
    assert_eq!(answer.content, "A perfectly good answer");
}

// ---------------------------------------------------------------------------
// Test: a judge that never answers is rejected within the timeout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hanging_judge_is_rejected_within_timeout() {
    let state = test_state(Arc::new(HangingJudge), Duration::from_millis(100));
    let question_id = first_question(&state).await;

    let started = Instant::now();
    let outcome = state
        .pipeline
        .process(submission(1, &question_id, "gpt-4o"))
        .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    let answer = assert_matches!(outcome, SubmissionOutcome::Judged(a) => a);
    assert_eq!(answer.status, AnswerStatus::Rejected);
    assert_eq!(answer.content, GENERATION_FALLBACK);
}

// ---------------------------------------------------------------------------
// Test: a verdict that never arrives is rejected within the same deadline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hanging_evaluation_is_rejected_within_timeout() {
    let state = test_state(Arc::new(SilentEvaluator), Duration::from_millis(100));
    let question_id = first_question(&state).await;

    let started = Instant::now();
    let outcome = state
        .pipeline
        .process(submission(3, &question_id, "gpt-4o"))
        .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    let answer = assert_matches!(outcome, SubmissionOutcome::Judged(a) => a);
    assert_eq!(answer.status, AnswerStatus::Rejected);
    assert_eq!(answer.content, "An answer nobody will judge");
    assert_eq!(state.store.snapshot().await.horse(3).unwrap().position, 0);
}

// ---------------------------------------------------------------------------
// Test: empty model falls back to the horse's assigned model
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_model_uses_horse_model() {
    let state = test_state(Arc::new(ScriptedJudge::approving()), TIMEOUT);
    let question_id = first_question(&state).await;
    state
        .store
        .update_horse_profile(1, "Dobbin", "claude-3-haiku")
        .await;

    let outcome = state.pipeline.process(submission(1, &question_id, "")).await;

    let answer = assert_matches!(outcome, SubmissionOutcome::Judged(a) => a);
    assert!(answer.content.starts_with("claude-3-haiku says:"));
    assert_eq!(answer.status, AnswerStatus::Approved);
}

// ---------------------------------------------------------------------------
// Test: no model at all is rejected without calling the judge
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_model_rejects_without_judge_calls() {
    let judge = Arc::new(ScriptedJudge::approving());
    let state = test_state(judge.clone(), TIMEOUT);
    let question_id = first_question(&state).await;

    let outcome = state.pipeline.process(submission(1, &question_id, "")).await;

    let answer = assert_matches!(outcome, SubmissionOutcome::Judged(a) => a);
    assert_eq!(answer.status, AnswerStatus::Rejected);
    assert_eq!(answer.content, GENERATION_FALLBACK);
    assert_eq!(judge.generate_calls.load(Ordering::SeqCst), 0);
    assert_eq!(judge.evaluate_calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Test: concurrent submissions for distinct horses are all recorded
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_are_all_recorded() {
    let judge = Arc::new(ScriptedJudge::approving().delayed(Duration::from_millis(20)));
    let state = test_state(judge, TIMEOUT);
    let question_id = first_question(&state).await;

    let handles: Vec<_> = (1..=4)
        .map(|horse_id| {
            state
                .pipeline
                .submit(submission(horse_id, &question_id, "gpt-4o"))
        })
        .collect();

    for handle in handles {
        assert!(handle.outcome().await.approved());
    }

    let snapshot = state.store.snapshot().await;
    assert_eq!(snapshot.answers.len(), 4);
    assert!(snapshot.horses.iter().all(|h| h.position == 1));
    assert_eq!(snapshot.revision, 4);
}

// ---------------------------------------------------------------------------
// Test: the recorded verdict is pushed to viewers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verdict_is_broadcast_to_viewers() {
    let state = test_state(Arc::new(ScriptedJudge::approving()), TIMEOUT);
    let question_id = first_question(&state).await;

    let initial = state.store.snapshot().await;
    let mut rx = state.hub.register("viewer".to_string(), &initial).await;
    assert_eq!(decode(rx.recv().await.unwrap()).answers.len(), 0);

    state
        .pipeline
        .submit(submission(4, &question_id, "gpt-4o"))
        .outcome()
        .await;

    let pushed = decode(rx.recv().await.unwrap());
    assert_eq!(pushed.answers.len(), 1);
    assert_eq!(pushed.horse(4).unwrap().position, 1);
}

// ---------------------------------------------------------------------------
// Test: shutdown cancels in-flight submissions without recording them
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_cancels_in_flight_submissions() {
    let state = test_state(Arc::new(HangingJudge), Duration::from_secs(60));
    let question_id = first_question(&state).await;

    let handle = state
        .pipeline
        .submit(submission(1, &question_id, "gpt-4o"));
    assert_eq!(state.pipeline.in_flight(), 1);

    assert!(state.pipeline.shutdown(Duration::from_secs(1)).await);

    assert_eq!(handle.outcome().await, SubmissionOutcome::Cancelled);
    assert!(state.store.snapshot().await.answers.is_empty());
    assert_eq!(state.pipeline.in_flight(), 0);
}

// ---------------------------------------------------------------------------
// Test: submissions after shutdown are cancelled immediately
// ---------------------------------------------------------------------------

#[tokio::test]
async fn process_after_shutdown_is_cancelled() {
    let state = test_state(Arc::new(ScriptedJudge::approving()), TIMEOUT);
    let question_id = first_question(&state).await;

    state.pipeline.shutdown(Duration::from_millis(10)).await;

    let outcome = state
        .pipeline
        .process(submission(1, &question_id, "gpt-4o"))
        .await;
    assert_eq!(outcome, SubmissionOutcome::Cancelled);
}
