//! Support-chat conversation store: a bounded FIFO log of turns per user.

use serde::{Deserialize, Serialize};

/// Retained chat turns per user; oldest entries are evicted past this.
pub const CHAT_CAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Derived from append time (unix milliseconds).
    pub id: u64,
    pub sender: Sender,
    pub message: String,
    pub ts_unix: u64,
}

/// Append one turn with oldest-eviction at the cap. Pure; the engine owns
/// persistence.
pub fn push_capped(log: &mut Vec<ChatMessage>, sender: Sender, message: impl Into<String>, now_ms: u64) {
    log.push(ChatMessage {
        id: now_ms,
        sender,
        message: message.into(),
        ts_unix: now_ms / 1000,
    });
    if log.len() > CHAT_CAP {
        let excess = log.len() - CHAT_CAP;
        log.drain(0..excess);
    }
}

/// The `n` most recent turns, oldest first.
pub fn recent(log: &[ChatMessage], n: usize) -> &[ChatMessage] {
    &log[log.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifty_first_message_evicts_the_first() {
        let mut log = Vec::new();
        for i in 0..CHAT_CAP + 1 {
            push_capped(&mut log, Sender::User, format!("msg {i}"), 1_000 + i as u64);
        }
        assert_eq!(log.len(), CHAT_CAP);
        assert_eq!(log[0].message, "msg 1");
        assert_eq!(log.last().map(|m| m.message.clone()), Some("msg 50".to_string()));
    }

    #[test]
    fn ids_derive_from_append_time() {
        let mut log = Vec::new();
        push_capped(&mut log, Sender::System, "hello", 1_700_000_000_123);
        assert_eq!(log[0].id, 1_700_000_000_123);
        assert_eq!(log[0].ts_unix, 1_700_000_000);
    }

    #[test]
    fn recent_takes_the_tail_in_order() {
        let mut log = Vec::new();
        for i in 0..10 {
            push_capped(&mut log, Sender::User, format!("m{i}"), i);
        }
        let tail = recent(&log, 6);
        assert_eq!(tail.len(), 6);
        assert_eq!(tail[0].message, "m4");
        assert_eq!(tail[5].message, "m9");
    }
}
