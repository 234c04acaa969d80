//! Context assembly for the support chat: prompt builders for the greeting
//! and reply paths, plus the canned content served when generation fails.

use rand::Rng;

use crate::conversation::{ChatMessage, Sender};
use crate::interactions::Interaction;
use crate::profile::RiskProfile;

/// Stored turns included in a reply prompt.
pub const CONTEXT_MESSAGES: usize = 6;
/// Recent interactions included in a reply prompt.
pub const CONTEXT_INTERACTIONS: usize = 3;
/// Recent interactions included in a greeting prompt.
pub const GREETING_INTERACTIONS: usize = 5;

/// Served uniformly at random when greeting generation fails.
pub const CANNED_GREETINGS: [&str; 3] = [
    "Hi, I'm glad you stopped by. How are you feeling today?",
    "Hello! This is a space where you can talk about whatever is on your mind.",
    "Hey there. No pressure at all, but I'm here if you'd like to share how things are going.",
];

/// Served when reply generation fails.
pub const REPLY_FALLBACK: &str = "I'm having trouble responding right now. Please try again in \
     a moment, or consider reaching out to someone you trust if you need support.";

/// Prompt for the opening message of an empty conversation. The greeting must
/// never mention the analysis behind it.
pub fn greeting_prompt(profile: &RiskProfile, interactions: &[Interaction]) -> String {
    let mut prompt = String::from(
        "You open a supportive wellbeing chat. Write a short greeting (2-3 sentences), warm \
         and unintrusive. Do not mention sentiment analysis, scores, or monitoring of any \
         kind.\n",
    );
    push_profile(&mut prompt, profile);
    push_interactions(&mut prompt, interactions);
    prompt
}

/// Prompt for one reply turn, built from recent conversation, recent
/// interactions, and the current profile.
pub fn reply_prompt(
    messages: &[ChatMessage],
    interactions: &[Interaction],
    profile: &RiskProfile,
) -> String {
    let mut prompt = String::from(
        "You are a supportive wellbeing companion. Be concise and warm. Suggest practical \
         coping strategies where they fit. Only bring up emergency guidance if the user \
         expresses explicit danger signals. Stay culturally appropriate and never mention \
         sentiment analysis or monitoring.\n",
    );
    push_profile(&mut prompt, profile);
    push_interactions(&mut prompt, interactions);

    prompt.push_str("\nConversation so far:\n");
    for msg in messages {
        let who = match msg.sender {
            Sender::User => "User",
            Sender::System => "Companion",
        };
        prompt.push_str(who);
        prompt.push_str(": ");
        prompt.push_str(&msg.message);
        prompt.push('\n');
    }
    prompt.push_str("\nWrite the companion's next message.");
    prompt
}

/// Uniform pick from the canned greetings.
pub fn pick_canned_greeting() -> &'static str {
    let idx = rand::thread_rng().gen_range(0..CANNED_GREETINGS.len());
    CANNED_GREETINGS[idx]
}

fn push_profile(prompt: &mut String, profile: &RiskProfile) {
    prompt.push_str(&format!(
        "\nThe user's recent mood reads as {:?} (concern level {} of 10).",
        profile.dominant, profile.concern_level
    ));
    if !profile.common_triggers.is_empty() {
        prompt.push_str(&format!(
            " Recent themes: {}.",
            profile.common_triggers.join(", ")
        ));
    }
    prompt.push('\n');
}

fn push_interactions(prompt: &mut String, interactions: &[Interaction]) {
    if interactions.is_empty() {
        return;
    }
    prompt.push_str("Recent community activity:\n");
    for event in interactions {
        prompt.push_str(&format!(
            "- {:?}: {}\n",
            event.kind,
            if event.content.title.is_empty() {
                &event.content.description
            } else {
                &event.content.title
            }
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ContentInput, Sentiment};
    use crate::interactions::InteractionKind;
    use crate::profile::Proportions;

    fn profile() -> RiskProfile {
        RiskProfile {
            dominant: Sentiment::Negative,
            concern_level: 4,
            proportions: Proportions::default(),
            common_triggers: vec!["loneliness".to_string()],
            total_interactions: 3,
            last_updated: 0,
        }
    }

    #[test]
    fn greeting_prompt_carries_profile_but_forbids_mechanics() {
        let p = greeting_prompt(&profile(), &[]);
        assert!(p.contains("concern level 4"));
        assert!(p.contains("loneliness"));
        assert!(p.contains("Do not mention sentiment analysis"));
    }

    #[test]
    fn reply_prompt_includes_conversation_and_activity() {
        let messages = vec![ChatMessage {
            id: 1,
            sender: Sender::User,
            message: "rough day".to_string(),
            ts_unix: 0,
        }];
        let interactions = vec![Interaction {
            post_id: "p1".to_string(),
            content: ContentInput {
                title: "tired of it all".to_string(),
                description: String::new(),
                tags: Vec::new(),
            },
            kind: InteractionKind::Post,
            ts_unix: 0,
        }];
        let p = reply_prompt(&messages, &interactions, &profile());
        assert!(p.contains("User: rough day"));
        assert!(p.contains("tired of it all"));
        assert!(p.contains("coping strategies"));
    }

    #[test]
    fn canned_pick_is_always_a_known_greeting() {
        for _ in 0..20 {
            assert!(CANNED_GREETINGS.contains(&pick_canned_greeting()));
        }
    }
}
