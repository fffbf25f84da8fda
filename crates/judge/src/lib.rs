//! Answer generation and judging for the horse race.
//!
//! [`JudgeClient`] is the seam the race engine depends on: produce an answer
//! for a question with a given model, and decide whether an answer is
//! acceptable. [`ClodJudge`] implements it against an OpenAI-compatible
//! chat-completions endpoint.

pub mod client;
pub mod clod;
pub mod config;

pub use client::{JudgeClient, JudgeError};
pub use clod::ClodJudge;
pub use config::JudgeConfig;
