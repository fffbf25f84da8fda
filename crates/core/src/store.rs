//! Lock-guarded owner of the live [`RaceState`].
//!
//! All mutations take the write half of one `RwLock`, so they are
//! linearizable; readers share the read half. Every operation returns an
//! owned snapshot taken inside the same critical section as the mutation, so
//! callers never observe a half-applied update and never hold the lock
//! across an await point of their own.

use tokio::sync::RwLock;

use crate::race::{Answer, Horse, Question, RaceState};
use crate::seed;
use crate::types::HorseId;

/// Shared race state. Wrap in `Arc` and hand clones to every component.
pub struct RaceStore {
    state: RwLock<RaceState>,
}

impl RaceStore {
    pub fn new(state: RaceState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Independent copy of the current state.
    pub async fn snapshot(&self) -> RaceState {
        self.state.read().await.clone()
    }

    pub async fn question(&self, id: &str) -> Option<Question> {
        self.state.read().await.question(id).cloned()
    }

    pub async fn horse(&self, id: HorseId) -> Option<Horse> {
        self.state.read().await.horse(id).cloned()
    }

    /// Apply a judged answer and return the resulting snapshot.
    ///
    /// An unknown horse or an answer that was already applied is a no-op;
    /// the unchanged snapshot is returned.
    pub async fn apply_verdict(
        &self,
        horse_id: HorseId,
        approved: bool,
        answer: Answer,
    ) -> RaceState {
        let mut state = self.state.write().await;
        let answer_id = answer.id;

        match state.apply_verdict(horse_id, approved, answer) {
            Ok(horse) => {
                tracing::debug!(
                    horse_id,
                    %answer_id,
                    approved,
                    position = horse.position,
                    "Verdict applied",
                );
            }
            Err(e) => {
                tracing::warn!(horse_id, %answer_id, error = %e, "Verdict ignored");
            }
        }

        state.clone()
    }

    /// Replace a horse's name and model and return the resulting snapshot.
    ///
    /// An unknown horse is a no-op; the unchanged snapshot is returned.
    pub async fn update_horse_profile(
        &self,
        horse_id: HorseId,
        name: &str,
        model_value: &str,
    ) -> RaceState {
        let mut state = self.state.write().await;

        match state.update_horse_profile(horse_id, name, model_value) {
            Ok(()) => {
                tracing::debug!(horse_id, name, model_value, "Horse profile updated");
            }
            Err(e) => {
                tracing::warn!(horse_id, error = %e, "Horse profile update ignored");
            }
        }

        state.clone()
    }

    /// Start a new race: every horse back to zero, history cleared.
    pub async fn reset_race(&self) -> RaceState {
        let mut state = self.state.write().await;
        state.reset();
        tracing::info!(revision = state.revision, "Race reset");
        state.clone()
    }
}

impl Default for RaceStore {
    fn default() -> Self {
        Self::new(seed::initial_state())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
