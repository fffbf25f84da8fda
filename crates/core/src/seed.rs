//! Starting line-up: the fixed question board and the four horses.

use uuid::Uuid;

use crate::race::{Horse, Question, RaceState};

/// Question texts in board order; the index becomes the column.
const QUESTION_TEXTS: [&str; 10] = [
    "Explain quantum computing in simple terms",
    "What is the meaning of life?",
    "How does photosynthesis work?",
    "Explain blockchain technology",
    "What causes northern lights?",
    "How do black holes work?",
    "Explain how vaccines work",
    "What is dark matter?",
    "How does AI learning work?",
    "Explain string theory",
];

const HORSE_EMOJIS: [&str; 4] = ["🐎", "🦄", "🎠", "🏇"];

/// One question per column, each with a fresh UUID.
pub fn default_questions() -> Vec<Question> {
    QUESTION_TEXTS
        .iter()
        .enumerate()
        .map(|(column, text)| Question {
            id: Uuid::new_v4().to_string(),
            text: (*text).to_string(),
            column: column as i32,
        })
        .collect()
}

/// Horses 1..=4 at the starting line with empty profiles.
pub fn default_horses() -> Vec<Horse> {
    HORSE_EMOJIS
        .iter()
        .zip(1..)
        .map(|(emoji, id)| Horse::new(id, *emoji))
        .collect()
}

/// Fresh race with the default board and line-up.
pub fn initial_state() -> RaceState {
    RaceState::new(default_questions(), default_horses())
}
