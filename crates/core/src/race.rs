//! Race state model and its pure transitions.
//!
//! Everything in here is synchronous and lock-free; [`RaceStore`](crate::store::RaceStore)
//! wraps a [`RaceState`] in a lock and is the only thing that mutates it at
//! runtime. Keeping the transitions pure lets them be tested exhaustively
//! without a runtime.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::{HorseId, QuestionId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Last square of the track. Positions live in `0..=MAX_TRACK`.
pub const MAX_TRACK: i32 = 9;

/// Move a position one square forward (approved) or back (rejected),
/// clamped to the track.
pub fn step_position(position: i32, approved: bool) -> i32 {
    if approved {
        (position + 1).min(MAX_TRACK)
    } else {
        (position - 1).max(0)
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A trivia question. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    /// Board column the client renders this question in.
    pub column: i32,
}

/// A race participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Horse {
    pub id: HorseId,
    pub emoji: String,
    pub position: i32,
    /// Operator-assigned display name.
    pub name: String,
    /// Model that answers on this horse's behalf.
    pub model_value: String,
}

impl Horse {
    /// A horse at the starting line with no profile assigned.
    pub fn new(id: HorseId, emoji: impl Into<String>) -> Self {
        Self {
            id,
            emoji: emoji.into(),
            position: 0,
            name: String::new(),
            model_value: String::new(),
        }
    }
}

/// Judging status of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    Pending,
    Approved,
    Rejected,
}

impl AnswerStatus {
    pub fn from_verdict(approved: bool) -> Self {
        if approved {
            Self::Approved
        } else {
            Self::Rejected
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One submitted answer. Only terminal answers ever enter the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: Uuid,
    pub question_id: QuestionId,
    pub horse_id: HorseId,
    pub content: String,
    pub status: AnswerStatus,
    pub timestamp: Timestamp,
}

impl Answer {
    /// Start a new answer in the `pending` state, stamped now.
    pub fn pending(
        question_id: impl Into<QuestionId>,
        horse_id: HorseId,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            question_id: question_id.into(),
            horse_id,
            content: content.into(),
            status: AnswerStatus::Pending,
            timestamp: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// RaceState
// ---------------------------------------------------------------------------

/// The whole race: questions, answer history and horses.
///
/// A cloned `RaceState` is a snapshot: it shares nothing with the live state.
/// `revision` increases by one on every successful mutation so consumers can
/// tell newer snapshots from older ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceState {
    pub revision: u64,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
    pub horses: Vec<Horse>,
}

impl RaceState {
    pub fn new(questions: Vec<Question>, horses: Vec<Horse>) -> Self {
        Self {
            revision: 0,
            questions,
            answers: Vec::new(),
            horses,
        }
    }

    pub fn horse(&self, id: HorseId) -> Option<&Horse> {
        self.horses.iter().find(|h| h.id == id)
    }

    fn horse_mut(&mut self, id: HorseId) -> Result<&mut Horse, CoreError> {
        self.horses
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or(CoreError::HorseNotFound(id))
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Record a verdict: move the horse one square, finalize the answer and
    /// append it to the history.
    ///
    /// Only `position` is touched on the horse. Fails without changing
    /// anything if the horse is unknown or the answer is not a fresh pending
    /// answer.
    pub fn apply_verdict(
        &mut self,
        horse_id: HorseId,
        approved: bool,
        mut answer: Answer,
    ) -> Result<&Horse, CoreError> {
        if answer.status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "answer {} has already been judged",
                answer.id
            )));
        }
        if self.answers.iter().rev().any(|a| a.id == answer.id) {
            return Err(CoreError::Conflict(format!(
                "answer {} is already in the history",
                answer.id
            )));
        }

        let horse = self.horse_mut(horse_id)?;
        horse.position = step_position(horse.position, approved);

        answer.status = AnswerStatus::from_verdict(approved);
        self.answers.push(answer);
        self.revision += 1;

        self.horse(horse_id).ok_or(CoreError::HorseNotFound(horse_id))
    }

    /// Replace a horse's name and model. Position is left alone.
    pub fn update_horse_profile(
        &mut self,
        horse_id: HorseId,
        name: impl Into<String>,
        model_value: impl Into<String>,
    ) -> Result<(), CoreError> {
        let horse = self.horse_mut(horse_id)?;
        horse.name = name.into();
        horse.model_value = model_value.into();
        self.revision += 1;
        Ok(())
    }

    /// Send every horse back to the start and clear the history.
    /// Questions and horse profiles are kept.
    pub fn reset(&mut self) {
        for horse in &mut self.horses {
            horse.position = 0;
        }
        self.answers.clear();
        self.revision += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
