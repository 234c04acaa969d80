//! Demo that walks a few community interactions through the engine and prints
//! the resulting risk profile (in-memory store; no network unless configured).

use std::sync::Arc;

use chrono::Utc;
use wellbeing_risk_analyzer::{
    build_ai_client, ContentInput, Interaction, InteractionKind, MemoryStore, RiskEngine,
};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let engine = RiskEngine::new(Arc::new(MemoryStore::default()), build_ai_client());
    let user = "demo-user";

    let script = [
        (InteractionKind::Post, "long week", "everything feels heavy lately"),
        (InteractionKind::Comment, "", "same here, hang in there"),
        (InteractionKind::Like, "sunset walks", "small things that help"),
    ];

    for (i, (kind, title, description)) in script.into_iter().enumerate() {
        let outcome = engine
            .record_interaction(
                user,
                Interaction {
                    post_id: format!("demo-{i}"),
                    content: ContentInput {
                        title: title.to_string(),
                        description: description.to_string(),
                        tags: Vec::new(),
                    },
                    kind,
                    ts_unix: Utc::now().timestamp() as u64,
                },
            )
            .await;
        println!(
            "recorded {:?}: sentiment={:?} outreach={}",
            kind, outcome.classification.sentiment, outcome.needs_support_outreach
        );
    }

    let profile = engine.profile(user).await;
    match serde_json::to_string_pretty(&profile) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("profile serialization failed: {e}"),
    }

    println!("risk-demo done");
}
