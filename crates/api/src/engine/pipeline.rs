//! Answer pipeline: one submission from request to broadcast.
//!
//! For each submission the pipeline resolves the horse and question, asks
//! the judge for an answer and a verdict with no lock held, applies the
//! verdict to the [`RaceStore`] in a single critical section, and hands the
//! resulting snapshot to the [`BroadcastHub`].
//!
//! Failure policy:
//! - generation failure: content becomes [`GENERATION_FALLBACK`] and the
//!   answer is rejected outright. The fallback text is never sent to the
//!   judge model for a verdict;
//! - evaluation failure: rejected;
//! - both judge calls share one deadline, so a judge that never answers
//!   still produces a rejection within `judge_timeout`.

use std::sync::Arc;
use std::time::Duration;

use derby_core::types::HorseId;
use derby_core::{Answer, AnswerStatus, RaceStore};
use derby_judge::JudgeClient;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::ws::BroadcastHub;

/// Answer text recorded when the model could not produce one.
pub const GENERATION_FALLBACK: &str = "Error generating answer";

/// Default upper bound on judge latency per submission.
pub const DEFAULT_JUDGE_TIMEOUT: Duration = Duration::from_secs(30);

/// One answer request for a horse.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub horse_id: HorseId,
    pub question_id: String,
    /// Model to answer with. Empty means the horse's assigned model.
    pub model_value: String,
}

/// Why a submission was dropped before judging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnknownHorse,
    UnknownQuestion,
}

/// Final result of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// The verdict was applied; carries the answer as recorded.
    Judged(Answer),
    /// Unknown horse or question; nothing was recorded.
    Skipped(SkipReason),
    /// The pipeline shut down before the verdict was applied.
    Cancelled,
}

impl SubmissionOutcome {
    /// Whether a recorded answer was approved.
    pub fn approved(&self) -> bool {
        matches!(self, Self::Judged(answer) if answer.status == AnswerStatus::Approved)
    }
}

/// Handle to a submission running in the background.
pub struct SubmissionHandle(JoinHandle<SubmissionOutcome>);

impl SubmissionHandle {
    /// Wait for the submission to finish.
    pub async fn outcome(self) -> SubmissionOutcome {
        match self.0.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Submission task did not complete");
                SubmissionOutcome::Cancelled
            }
        }
    }
}

/// Runs submissions against the shared store, judge and hub.
///
/// Cheap to clone; clones share the same task tracker and cancellation
/// token.
#[derive(Clone)]
pub struct AnswerPipeline {
    store: Arc<RaceStore>,
    judge: Arc<dyn JudgeClient>,
    hub: Arc<BroadcastHub>,
    judge_timeout: Duration,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl AnswerPipeline {
    pub fn new(
        store: Arc<RaceStore>,
        judge: Arc<dyn JudgeClient>,
        hub: Arc<BroadcastHub>,
        judge_timeout: Duration,
    ) -> Self {
        Self {
            store,
            judge,
            hub,
            judge_timeout,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Start processing `submission` in the background and return at once.
    pub fn submit(&self, submission: Submission) -> SubmissionHandle {
        let pipeline = self.clone();
        SubmissionHandle(
            self.tracker
                .spawn(async move { pipeline.process(submission).await }),
        )
    }

    /// Number of submissions still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Process `submission` on the current task.
    pub async fn process(&self, submission: Submission) -> SubmissionOutcome {
        let Submission {
            horse_id,
            question_id,
            model_value,
        } = submission;

        if self.cancel.is_cancelled() {
            return SubmissionOutcome::Cancelled;
        }

        let Some(horse) = self.store.horse(horse_id).await else {
            tracing::warn!(horse_id, question_id = %question_id, "Submission for unknown horse ignored");
            return SubmissionOutcome::Skipped(SkipReason::UnknownHorse);
        };
        let Some(question) = self.store.question(&question_id).await else {
            tracing::warn!(horse_id, question_id = %question_id, "Submission for unknown question ignored");
            return SubmissionOutcome::Skipped(SkipReason::UnknownQuestion);
        };

        let model = if model_value.is_empty() {
            horse.model_value
        } else {
            model_value
        };

        let mut answer = Answer::pending(question.id.as_str(), horse_id, "");
        tracing::info!(
            horse_id,
            question_id = %question.id,
            answer_id = %answer.id,
            model = %model,
            "Judging submission",
        );

        let deadline = Instant::now() + self.judge_timeout;
        let (content, approved) = tokio::select! {
            () = self.cancel.cancelled() => {
                tracing::info!(horse_id, answer_id = %answer.id, "Submission cancelled before verdict");
                return SubmissionOutcome::Cancelled;
            }
            judged = self.judge_answer(&model, &question.text, deadline) => judged,
        };
        answer.content = content;
        let answer_id = answer.id;

        let snapshot = self.store.apply_verdict(horse_id, approved, answer).await;
        let Some(recorded) = snapshot.answers.iter().rev().find(|a| a.id == answer_id).cloned()
        else {
            return SubmissionOutcome::Skipped(SkipReason::UnknownHorse);
        };

        tracing::info!(
            horse_id,
            answer_id = %answer_id,
            approved,
            revision = snapshot.revision,
            "Verdict recorded",
        );
        self.hub.push(&snapshot).await;

        SubmissionOutcome::Judged(recorded)
    }

    /// Generate and evaluate an answer, applying the failure policy.
    /// Returns the answer text and the verdict.
    async fn judge_answer(&self, model: &str, question: &str, deadline: Instant) -> (String, bool) {
        if model.is_empty() {
            tracing::warn!("No model assigned, rejecting");
            return (GENERATION_FALLBACK.to_string(), false);
        }

        let generated = tokio::time::timeout_at(deadline, self.judge.generate(model, question)).await;
        let content = match generated {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(model, error = %e, "Answer generation failed, rejecting");
                return (GENERATION_FALLBACK.to_string(), false);
            }
            Err(_) => {
                tracing::warn!(model, "Answer generation timed out, rejecting");
                return (GENERATION_FALLBACK.to_string(), false);
            }
        };

        let approved =
            match tokio::time::timeout_at(deadline, self.judge.evaluate(question, &content)).await {
                Ok(Ok(approved)) => approved,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Answer evaluation failed, rejecting");
                    false
                }
                Err(_) => {
                    tracing::warn!("Answer evaluation timed out, rejecting");
                    false
                }
            };

        (content, approved)
    }

    /// Stop accepting work, cancel running submissions and wait for them to
    /// finish. Returns `false` if they did not finish within `grace`.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.cancel.cancel();
        self.tracker.close();
        let drained = tokio::time::timeout(grace, self.tracker.wait()).await.is_ok();
        tracing::info!(drained, remaining = self.tracker.len(), "Answer pipeline stopped");
        drained
    }
}
