//! Community interaction events and the bounded per-user history kept for
//! support-chat context assembly.

use serde::{Deserialize, Serialize};

use crate::classify::ContentInput;

/// Retained interactions per user; oldest entries are evicted past this.
pub const HISTORY_CAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Post,
    Like,
    Comment,
}

impl InteractionKind {
    /// How strongly this interaction counts as a signal of the user's own
    /// emotional state. A like says less about the user than authored content.
    pub fn score_weight(self) -> f64 {
        match self {
            InteractionKind::Post => 1.0,
            InteractionKind::Comment => 0.7,
            InteractionKind::Like => 0.3,
        }
    }
}

/// One feed event: the user posted, liked, or commented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub post_id: String,
    pub content: ContentInput,
    pub kind: InteractionKind,
    pub ts_unix: u64,
}

/// Append with oldest-eviction at the cap. Pure; the engine owns persistence.
pub fn push_capped(history: &mut Vec<Interaction>, event: Interaction) {
    history.push(event);
    if history.len() > HISTORY_CAP {
        let excess = history.len() - HISTORY_CAP;
        history.drain(0..excess);
    }
}

/// The `n` most recent entries, oldest first.
pub fn recent(history: &[Interaction], n: usize) -> &[Interaction] {
    &history[history.len().saturating_sub(n)..]
}
