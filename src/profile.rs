//! # Risk Profile Projector
//! Read-only summary derived from accumulated score state. Never persisted;
//! callers project on demand.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::classify::Sentiment;
use crate::score::SentimentScore;

/// How many trigger labels the profile surfaces.
pub const COMMON_TRIGGER_COUNT: usize = 3;

/// Bucket masses normalized to sum 1 (all zero when there is no mass).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Proportions {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub concerning: f64,
}

impl Proportions {
    pub fn get(&self, s: Sentiment) -> f64 {
        match s {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
            Sentiment::Concerning => self.concerning,
        }
    }
}

/// Derived per-user risk summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub dominant: Sentiment,
    /// 0-10, the authoritative concern signal for escalation.
    pub concern_level: u8,
    pub proportions: Proportions,
    /// Top trigger labels by summed weight, first-encounter order on ties.
    pub common_triggers: Vec<String>,
    pub total_interactions: u64,
    pub last_updated: u64,
}

impl RiskProfile {
    /// The profile of a user with no accumulated mass.
    fn neutral_zero(state: &SentimentScore) -> Self {
        Self {
            dominant: Sentiment::Neutral,
            concern_level: 0,
            proportions: Proportions::default(),
            common_triggers: Vec::new(),
            total_interactions: state.total_interactions,
            last_updated: state.last_updated,
        }
    }
}

/// Project the current score state into a risk profile.
pub fn project(state: &SentimentScore) -> RiskProfile {
    let total = state.total();
    if total == 0.0 {
        return RiskProfile::neutral_zero(state);
    }

    let proportions = Proportions {
        positive: state.positive / total,
        negative: state.negative / total,
        neutral: state.neutral / total,
        concerning: state.concerning / total,
    };

    // First strict maximum in enum order; ties keep the earlier bucket.
    let mut dominant = Sentiment::Positive;
    let mut best = f64::NEG_INFINITY;
    for s in Sentiment::ALL {
        let p = proportions.get(s);
        if p > best {
            best = p;
            dominant = s;
        }
    }

    let concern_raw = (proportions.concerning * 7.0 + proportions.negative * 3.0) * 10.0;
    let concern_level = concern_raw.min(10.0).round() as u8;

    RiskProfile {
        dominant,
        concern_level,
        proportions,
        common_triggers: common_triggers(state),
        total_interactions: state.total_interactions,
        last_updated: state.last_updated,
    }
}

/// Sum weight per distinct trigger label, sort descending, take the top
/// labels. Stable sort preserves first-encounter order on equal sums.
fn common_triggers(state: &SentimentScore) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for hit in &state.recent_triggers {
        if !sums.contains_key(hit.trigger.as_str()) {
            order.push(hit.trigger.clone());
        }
        *sums.entry(hit.trigger.as_str()).or_insert(0.0) += hit.weight;
    }

    order.sort_by(|a, b| {
        sums[b.as_str()]
            .partial_cmp(&sums[a.as_str()])
            .unwrap_or(Ordering::Equal)
    });
    order.truncate(COMMON_TRIGGER_COUNT);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::TriggerHit;

    fn state_with(positive: f64, negative: f64, neutral: f64, concerning: f64) -> SentimentScore {
        SentimentScore {
            positive,
            negative,
            neutral,
            concerning,
            total_interactions: 7,
            last_updated: 1_700_000_000,
            recent_triggers: Vec::new(),
        }
    }

    #[test]
    fn zero_mass_projects_neutral_zero() {
        let p = project(&SentimentScore::default());
        assert_eq!(p.dominant, Sentiment::Neutral);
        assert_eq!(p.concern_level, 0);
        assert!(p.common_triggers.is_empty());
        assert_eq!(p.proportions, Proportions::default());
    }

    #[test]
    fn four_way_tie_goes_to_positive() {
        let p = project(&state_with(1.0, 1.0, 1.0, 1.0));
        assert_eq!(p.dominant, Sentiment::Positive);
    }

    #[test]
    fn concern_level_clamps_at_ten() {
        // All mass concerning: raw value would be 70, clamped before rounding.
        let p = project(&state_with(0.0, 0.0, 0.0, 2.5));
        assert_eq!(p.concern_level, 10);
        assert_eq!(p.dominant, Sentiment::Concerning);
    }

    #[test]
    fn concern_level_blends_concerning_and_negative() {
        // proportions: concerning 0.05, negative 0.05 -> (0.35 + 0.15) * 10 -> 5
        let p = project(&state_with(0.1, 0.05, 0.8, 0.05));
        assert_eq!(p.concern_level, 5);
    }

    #[test]
    fn common_triggers_ranked_by_summed_weight() {
        let mut state = state_with(0.0, 1.0, 0.0, 0.0);
        for (label, w) in [
            ("loneliness", 0.4),
            ("self-harm", 0.9),
            ("loneliness", 0.4),
            ("grief", 0.5),
            ("insomnia", 0.1),
        ] {
            state.recent_triggers.push(TriggerHit {
                trigger: label.to_string(),
                ts_unix: 1_700_000_000,
                weight: w,
            });
        }
        let p = project(&state);
        assert_eq!(
            p.common_triggers,
            vec![
                "self-harm".to_string(),
                "loneliness".to_string(),
                "grief".to_string()
            ]
        );
    }

    #[test]
    fn trigger_ties_keep_first_encounter_order() {
        let mut state = state_with(1.0, 0.0, 0.0, 0.0);
        for label in ["grief", "insomnia", "loneliness", "grief2"] {
            state.recent_triggers.push(TriggerHit {
                trigger: label.to_string(),
                ts_unix: 1_700_000_000,
                weight: 0.5,
            });
        }
        let p = project(&state);
        assert_eq!(
            p.common_triggers,
            vec![
                "grief".to_string(),
                "insomnia".to_string(),
                "loneliness".to_string()
            ]
        );
    }
}
