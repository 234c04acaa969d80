//! Support-chat flows: greeting and reply paths, message accounting, and
//! degradation to canned content when the model fails.

use std::sync::Arc;

use wellbeing_risk_analyzer::ai::MockClient;
use wellbeing_risk_analyzer::support::{CANNED_GREETINGS, REPLY_FALLBACK};
use wellbeing_risk_analyzer::{MemoryStore, RiskEngine, Sender};

fn engine_with(ai: MockClient) -> RiskEngine {
    RiskEngine::new(Arc::new(MemoryStore::default()), Arc::new(ai))
}

#[tokio::test]
async fn greeting_appends_one_system_message() {
    let engine = engine_with(MockClient::always("  Hi, good to see you here.  "));

    let text = engine.greeting("u1").await;
    assert_eq!(text, "Hi, good to see you here.", "response is trimmed");

    let log = engine.conversation_history("u1").await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].sender, Sender::System);
    assert_eq!(log[0].message, text);
}

#[tokio::test]
async fn failed_greeting_serves_a_canned_one() {
    let engine = engine_with(MockClient::failing());

    let text = engine.greeting("u1").await;
    assert!(CANNED_GREETINGS.contains(&text.as_str()));

    let log = engine.conversation_history("u1").await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].sender, Sender::System);
}

#[tokio::test]
async fn reply_stores_user_turn_then_exactly_one_system_turn() {
    let engine = engine_with(MockClient::always("That sounds heavy. What helped before?"));

    let reply = engine.reply("u1", "rough day today").await;
    assert_eq!(reply, "That sounds heavy. What helped before?");

    let log = engine.conversation_history("u1").await;
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].sender, Sender::User);
    assert_eq!(log[0].message, "rough day today");
    assert_eq!(log[1].sender, Sender::System);
    assert_eq!(log[1].message, reply);
}

#[tokio::test]
async fn failed_reply_stores_the_fallback() {
    let engine = engine_with(MockClient::failing());

    let reply = engine.reply("u1", "are you there?").await;
    assert_eq!(reply, REPLY_FALLBACK);

    let log = engine.conversation_history("u1").await;
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].sender, Sender::System);
    assert_eq!(log[1].message, REPLY_FALLBACK);
}

#[tokio::test]
async fn every_reply_call_adds_exactly_two_turns() {
    let engine = engine_with(MockClient::script(vec![
        Some("first answer".to_string()),
        None,
        Some("third answer".to_string()),
    ]));

    for message in ["one", "two", "three"] {
        engine.reply("u1", message).await;
    }

    let log = engine.conversation_history("u1").await;
    assert_eq!(log.len(), 6);
    // Turns alternate user/system regardless of generation success.
    for pair in log.chunks(2) {
        assert_eq!(pair[0].sender, Sender::User);
        assert_eq!(pair[1].sender, Sender::System);
    }
    assert_eq!(log[3].message, REPLY_FALLBACK);
}

#[tokio::test]
async fn clear_conversation_empties_the_log() {
    let engine = engine_with(MockClient::always("ok"));

    engine.reply("u1", "hello").await;
    assert!(!engine.conversation_history("u1").await.is_empty());

    engine.clear_conversation("u1").await;
    assert!(engine.conversation_history("u1").await.is_empty());
}

#[tokio::test]
async fn conversations_are_per_user() {
    let engine = engine_with(MockClient::always("ok"));

    engine.reply("alice", "hi").await;
    engine.reply("bob", "hey").await;

    assert_eq!(engine.conversation_history("alice").await.len(), 2);
    assert_eq!(engine.conversation_history("bob").await.len(), 2);
    assert_eq!(
        engine.conversation_history("alice").await[0].message,
        "hi"
    );
}
