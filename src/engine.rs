//! # Risk Engine
//! Owns the storage and model collaborators and wires the pure pieces
//! together: classify, accumulate, project, escalate, cache, chat.
//!
//! Score mutation is a read-modify-write over one persisted blob per user, so
//! the engine serializes those cycles through a per-user async lock instead of
//! assuming low contention. Storage failures are absorbed into best-effort
//! defaults and reported on the diagnostic channel; no operation raises.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::warn;

use crate::ai::{GenRequest, SharedAi};
use crate::classify::{self, ClassificationResult, ContentInput};
use crate::conversation::{self, ChatMessage, Sender};
use crate::escalation;
use crate::interactions::{self, Interaction};
use crate::profile::{self, RiskProfile};
use crate::resources::{self, Resource};
use crate::score::{self, SentimentScore};
use crate::storage::{anon_key, chat_key, interactions_key, score_key, KvStore};
use crate::support;

/// What one recorded interaction produced: the classification that was folded
/// in, and whether the outreach rule asks for supportive intervention.
#[derive(Debug, Clone)]
pub struct InteractionOutcome {
    pub classification: ClassificationResult,
    pub needs_support_outreach: bool,
}

pub struct RiskEngine {
    store: Arc<dyn KvStore>,
    ai: SharedAi,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RiskEngine {
    pub fn new(store: Arc<dyn KvStore>, ai: SharedAi) -> Self {
        Self {
            store,
            ai,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Classify one feed event and fold it into the user's score at the
    /// weight of its interaction kind. Evaluates the outreach rule on the
    /// fresh state so callers can act immediately.
    pub async fn record_interaction(&self, user: &str, event: Interaction) -> InteractionOutcome {
        let classification = classify::classify(self.ai.as_ref(), &event.content).await;
        let weight = event.kind.score_weight();

        let lock = self.lock_for(user).await;
        let _guard = lock.lock().await;

        let mut state: SentimentScore = self.load_json(&score_key(user)).await;
        score::apply_update(&mut state, &classification, weight, now_unix());
        self.save_json(&score_key(user), &state).await;

        let mut history: Vec<Interaction> = self.load_json(&interactions_key(user)).await;
        interactions::push_capped(&mut history, event);
        self.save_json(&interactions_key(user), &history).await;

        InteractionOutcome {
            needs_support_outreach: escalation::needs_support_outreach(&state),
            classification,
        }
    }

    /// Classify content the user authored themselves. Folds the result into
    /// the score at full weight and hands the classification back for tagging.
    pub async fn classify_content(&self, user: &str, content: &ContentInput) -> ClassificationResult {
        let classification = classify::classify(self.ai.as_ref(), content).await;

        let lock = self.lock_for(user).await;
        let _guard = lock.lock().await;

        let mut state: SentimentScore = self.load_json(&score_key(user)).await;
        score::apply_update(&mut state, &classification, 1.0, now_unix());
        self.save_json(&score_key(user), &state).await;

        classification
    }

    /// Project the user's current risk profile.
    pub async fn profile(&self, user: &str) -> RiskProfile {
        let state: SentimentScore = self.load_json(&score_key(user)).await;
        profile::project(&state)
    }

    /// Rule B convenience: should this user be offered the support chat?
    pub async fn should_offer_chat(&self, user: &str) -> bool {
        escalation::should_offer_chat(&self.profile(user).await)
    }

    /// Serve support resources for this user's profile (7-day cached).
    pub async fn get_resources(&self, user: &str) -> Vec<Resource> {
        let profile = self.profile(user).await;
        resources::get_resources(self.store.as_ref(), self.ai.as_ref(), &profile, now_unix()).await
    }

    /// Open an empty conversation with a supportive greeting. Appends exactly
    /// one system message (generated or canned) and returns it.
    pub async fn greeting(&self, user: &str) -> String {
        let profile = self.profile(user).await;
        let history: Vec<Interaction> = self.load_json(&interactions_key(user)).await;
        let recent = interactions::recent(&history, support::GREETING_INTERACTIONS);

        let req = GenRequest::new(support::greeting_prompt(&profile, recent))
            .max_tokens(160)
            .temperature(0.7);
        let text = match self.ai.generate(&req).await {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => {
                warn!("greeting generation failed, serving canned greeting");
                support::pick_canned_greeting().to_string()
            }
        };

        self.append_chat(user, Sender::System, &text).await;
        text
    }

    /// Handle one user message: store it, build context, generate the reply.
    /// Success or failure, exactly one new system message is stored.
    pub async fn reply(&self, user: &str, message: &str) -> String {
        self.append_chat(user, Sender::User, message).await;

        let log: Vec<ChatMessage> = self.load_json(&chat_key(user)).await;
        let history: Vec<Interaction> = self.load_json(&interactions_key(user)).await;
        let profile = self.profile(user).await;

        let prompt = support::reply_prompt(
            conversation::recent(&log, support::CONTEXT_MESSAGES),
            interactions::recent(&history, support::CONTEXT_INTERACTIONS),
            &profile,
        );
        let req = GenRequest::new(prompt).max_tokens(240).temperature(0.6);
        let text = match self.ai.generate(&req).await {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => {
                warn!("reply generation failed, serving fallback");
                support::REPLY_FALLBACK.to_string()
            }
        };

        self.append_chat(user, Sender::System, &text).await;
        text
    }

    /// Full (≤50 turns) conversation log, oldest first.
    pub async fn conversation_history(&self, user: &str) -> Vec<ChatMessage> {
        self.load_json(&chat_key(user)).await
    }

    pub async fn clear_conversation(&self, user: &str) {
        if let Err(e) = self.store.remove(&chat_key(user)).await {
            warn!(key = %anon_key(&chat_key(user)), error = %e, "failed to clear conversation");
        }
    }

    /// Explicit user-initiated reset: drops score state, interaction history,
    /// and the conversation log.
    pub async fn reset_user(&self, user: &str) {
        let lock = self.lock_for(user).await;
        let _guard = lock.lock().await;
        for key in [score_key(user), interactions_key(user), chat_key(user)] {
            if let Err(e) = self.store.remove(&key).await {
                warn!(key = %anon_key(&key), error = %e, "failed to remove user data");
            }
        }
    }

    // --- internals ---

    async fn lock_for(&self, user: &str) -> Arc<Mutex<()>> {
        let mut map = self.user_locks.lock().await;
        map.entry(user.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn append_chat(&self, user: &str, sender: Sender, message: &str) {
        let lock = self.lock_for(user).await;
        let _guard = lock.lock().await;
        let mut log: Vec<ChatMessage> = self.load_json(&chat_key(user)).await;
        conversation::push_capped(&mut log, sender, message, now_millis());
        self.save_json(&chat_key(user), &log).await;
    }

    /// Read and decode one blob; any failure degrades to the default with a
    /// diagnostic, never an error to the caller.
    async fn load_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!(key = %anon_key(key), error = %e, "stored blob unreadable, using default");
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(e) => {
                warn!(key = %anon_key(key), error = %e, "storage read failed, using default");
                T::default()
            }
        }
    }

    async fn save_json<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %anon_key(key), error = %e, "failed to encode blob, skipping write");
                return;
            }
        };
        if let Err(e) = self.store.set(key, &raw).await {
            warn!(key = %anon_key(key), error = %e, "storage write failed");
        }
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
