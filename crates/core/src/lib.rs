//! Race domain for the horse race exhibit.
//!
//! - [`race`] -- questions, horses, answers and the [`RaceState`] aggregate
//!   with its pure state transitions.
//! - [`store`] -- [`RaceStore`], the single lock-guarded owner of the race
//!   state shared by request handlers and background submissions.
//! - [`seed`] -- the fixed question set and starting horses.
//! - [`validation`] -- input checks for operator-supplied fields.

pub mod error;
pub mod race;
pub mod seed;
pub mod store;
pub mod types;
pub mod validation;

pub use race::{Answer, AnswerStatus, Horse, Question, RaceState, MAX_TRACK};
pub use store::RaceStore;
