//! # Escalation Policy
//! Two related but independently-invoked threshold rules over the same state.
//! They overlap without agreeing; both are preserved as separate named
//! functions because callers depend on each one individually (see DESIGN.md
//! for the open question around the split). Both are boolean and
//! side-effect-free; callers decide what action to take.

use crate::classify::Sentiment;
use crate::profile::RiskProfile;
use crate::score::{SentimentScore, TriggerHit};

/// Trigger labels that escalate on repetition regardless of bucket ratios.
pub const DANGEROUS_TRIGGERS: [&str; 5] = ["self-harm", "suicide", "abuse", "assault", "violence"];

const CONCERNING_RATIO_LIMIT: f64 = 0.3;
const NEGATIVE_RATIO_LIMIT: f64 = 0.6;
const CONCERNING_MASS_LIMIT: f64 = 5.0;
const DANGEROUS_REPEAT_MIN: usize = 2;
const OFFER_CHAT_CONCERN_MIN: u8 = 7;

/// Rule A, evaluated after every score update: should supportive resources be
/// surfaced to this user?
pub fn needs_support_outreach(state: &SentimentScore) -> bool {
    let total = state.total();
    let (concerning_ratio, negative_ratio) = if total > 0.0 {
        (state.concerning / total, state.negative / total)
    } else {
        (0.0, 0.0)
    };

    concerning_ratio > CONCERNING_RATIO_LIMIT
        || negative_ratio > NEGATIVE_RATIO_LIMIT
        || state.concerning > CONCERNING_MASS_LIMIT
        || has_dangerous_triggers(&state.recent_triggers)
}

/// Rule B, evaluated independently (e.g. before offering the support chat).
pub fn should_offer_chat(profile: &RiskProfile) -> bool {
    profile.concern_level >= OFFER_CHAT_CONCERN_MIN || profile.dominant == Sentiment::Concerning
}

/// True when any dangerous label shows up at least twice in the window.
fn has_dangerous_triggers(hits: &[TriggerHit]) -> bool {
    DANGEROUS_TRIGGERS.iter().any(|label| {
        hits.iter()
            .filter(|h| h.trigger.trim().eq_ignore_ascii_case(label))
            .count()
            >= DANGEROUS_REPEAT_MIN
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{project, Proportions};

    fn state_with(positive: f64, negative: f64, neutral: f64, concerning: f64) -> SentimentScore {
        SentimentScore {
            positive,
            negative,
            neutral,
            concerning,
            ..Default::default()
        }
    }

    fn hit(label: &str) -> TriggerHit {
        TriggerHit {
            trigger: label.to_string(),
            ts_unix: 1_700_000_000,
            weight: 0.5,
        }
    }

    #[test]
    fn outreach_on_concerning_ratio_and_absolute_mass() {
        // ratio 0.6 > 0.3 and mass 6 > 5: both legs fire.
        let state = state_with(4.0, 0.0, 0.0, 6.0);
        assert!(needs_support_outreach(&state));
    }

    #[test]
    fn outreach_on_negative_ratio() {
        let state = state_with(0.5, 7.0, 2.0, 0.5);
        assert!(needs_support_outreach(&state));
    }

    #[test]
    fn no_outreach_for_balanced_low_mass() {
        let state = state_with(1.0, 1.0, 2.0, 0.5);
        assert!(!needs_support_outreach(&state));
    }

    #[test]
    fn empty_state_never_escalates() {
        assert!(!needs_support_outreach(&SentimentScore::default()));
    }

    #[test]
    fn repeated_dangerous_trigger_escalates_despite_positive_buckets() {
        let mut state = state_with(8.0, 0.0, 1.0, 0.0);
        state.recent_triggers.push(hit("self-harm"));
        state.recent_triggers.push(hit("Self-Harm"));
        assert!(needs_support_outreach(&state));
    }

    #[test]
    fn single_dangerous_trigger_is_not_enough() {
        let mut state = state_with(8.0, 0.0, 1.0, 0.0);
        state.recent_triggers.push(hit("suicide"));
        state.recent_triggers.push(hit("loneliness"));
        assert!(!needs_support_outreach(&state));
    }

    #[test]
    fn chat_offer_on_high_concern_level() {
        // All mass concerning projects to concern level 10 and dominant concerning.
        let profile = project(&state_with(0.0, 0.0, 0.0, 0.9));
        assert!(should_offer_chat(&profile));
    }

    #[test]
    fn chat_offer_on_dominant_concerning_even_with_low_level() {
        // The dominant leg stands on its own, independent of concern level.
        let profile = RiskProfile {
            dominant: Sentiment::Concerning,
            concern_level: 2,
            proportions: Proportions::default(),
            common_triggers: Vec::new(),
            total_interactions: 1,
            last_updated: 0,
        };
        assert!(should_offer_chat(&profile));
    }

    #[test]
    fn no_chat_offer_for_calm_profile() {
        let profile = project(&state_with(3.0, 0.5, 2.0, 0.1));
        assert!(!should_offer_chat(&profile));
    }
}
