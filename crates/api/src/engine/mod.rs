//! Race engine: turns answer submissions into recorded verdicts.
//!
//! Contains the answer pipeline that judges submissions in the background,
//! commits verdicts to the race store and broadcasts the resulting
//! snapshots to viewers.

pub mod pipeline;

pub use pipeline::{AnswerPipeline, Submission, SubmissionHandle, SubmissionOutcome};
