//! # Score Accumulator
//! Exponential decay over four sentiment buckets plus a time-windowed log of
//! safety triggers. Pure functions over explicit state; the engine owns
//! persistence and locking.

use serde::{Deserialize, Serialize};

use crate::classify::{ClassificationResult, Sentiment};

/// Multiplicative shrinkage applied to all buckets before folding in a new
/// observation, so recent interactions outweigh older ones.
pub const DECAY: f64 = 0.95;
/// Trigger hits older than this fall out of the window.
pub const TRIGGER_WINDOW_SECS: u64 = 14 * 24 * 3600;
/// Hard cap on retained trigger hits; the newest win.
pub const TRIGGER_CAP: usize = 20;

/// One detected safety trigger, recorded at update time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerHit {
    pub trigger: String,
    pub ts_unix: u64,
    pub weight: f64,
}

/// Persisted per-user score state. Buckets never go negative; the trigger log
/// is append-ordered oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub concerning: f64,
    pub total_interactions: u64,
    pub last_updated: u64,
    #[serde(default)]
    pub recent_triggers: Vec<TriggerHit>,
}

impl SentimentScore {
    pub fn total(&self) -> f64 {
        self.positive + self.negative + self.neutral + self.concerning
    }

    pub fn bucket(&self, s: Sentiment) -> f64 {
        match s {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
            Sentiment::Concerning => self.concerning,
        }
    }

    fn bucket_mut(&mut self, s: Sentiment) -> &mut f64 {
        match s {
            Sentiment::Positive => &mut self.positive,
            Sentiment::Negative => &mut self.negative,
            Sentiment::Neutral => &mut self.neutral,
            Sentiment::Concerning => &mut self.concerning,
        }
    }
}

/// One score update: decay every bucket, fold in the weighted observation,
/// refresh the trigger window. `total_interactions` advances by exactly one
/// per call, whether or not the classification succeeded upstream.
pub fn apply_update(
    state: &mut SentimentScore,
    classification: &ClassificationResult,
    weight: f64,
    now_unix: u64,
) {
    state.positive *= DECAY;
    state.negative *= DECAY;
    state.neutral *= DECAY;
    state.concerning *= DECAY;

    *state.bucket_mut(classification.sentiment) += weight * classification.confidence;
    state.total_interactions += 1;
    state.last_updated = now_unix;

    for label in &classification.content_triggers {
        state.recent_triggers.push(TriggerHit {
            trigger: label.clone(),
            ts_unix: now_unix,
            weight: weight * classification.confidence,
        });
    }
    prune_triggers(&mut state.recent_triggers, now_unix);
}

/// Keep only hits inside the 14-day window, then the most recent
/// `TRIGGER_CAP` entries. The list is append-ordered oldest first, so the cap
/// drops from the front.
pub fn prune_triggers(hits: &mut Vec<TriggerHit>, now_unix: u64) {
    let cutoff = now_unix.saturating_sub(TRIGGER_WINDOW_SECS);
    hits.retain(|h| h.ts_unix >= cutoff);
    if hits.len() > TRIGGER_CAP {
        let excess = hits.len() - TRIGGER_CAP;
        hits.drain(0..excess);
    }
}
