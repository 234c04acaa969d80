//! Classification adapter: turns raw content into a structured sentiment
//! classification via the external model, with a neutral default whenever the
//! model is unavailable or answers with something unusable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::ai::{AiClient, GenRequest};
use crate::error::RiskError;
use crate::extract;

/// Sentiment buckets. The enum order is load-bearing: dominant-sentiment
/// scanning walks `ALL` front to back and ties keep the earlier bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Concerning,
}

impl Sentiment {
    pub const ALL: [Sentiment; 4] = [
        Sentiment::Positive,
        Sentiment::Negative,
        Sentiment::Neutral,
        Sentiment::Concerning,
    ];
}

/// The content fields the classifier sees for a post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentInput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One classification, ephemeral. `concern_level` here is advisory; the
/// authoritative concern level is derived from the accumulated profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub emotional_tone: Vec<String>,
    pub concern_level: u8,
    pub suggested_tags: Vec<String>,
    pub content_triggers: Vec<String>,
}

impl ClassificationResult {
    /// Safe default used whenever classification cannot complete.
    pub fn neutral_default() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            confidence: 0.5,
            emotional_tone: vec!["neutral".to_string()],
            concern_level: 0,
            suggested_tags: Vec::new(),
            content_triggers: Vec::new(),
        }
    }
}

/// Fixed instruction template sent to the model for one piece of content.
pub fn classification_prompt(content: &ContentInput) -> String {
    format!(
        "You analyze short community posts for emotional wellbeing signals. \
         Respond with a single JSON object containing exactly these fields: \
         \"sentiment\" (one of \"positive\", \"negative\", \"neutral\", \"concerning\"), \
         \"confidenceScore\" (number between 0.0 and 1.0), \
         \"emotionalTone\" (array of short labels), \
         \"concernLevel\" (integer 0-10), \
         \"suggestedTags\" (3 to 5 short strings), \
         \"contentTriggers\" (array of safety trigger labels such as \"self-harm\", empty if none apply). \
         No other text.\n\n\
         Title: {}\nDescription: {}\nTags: {}",
        content.title,
        content.description,
        content.tags.join(", ")
    )
}

/// Classify one piece of content. Never fails: any problem along the way is
/// reported to the diagnostic channel and replaced by the neutral default.
pub async fn classify(ai: &dyn AiClient, content: &ContentInput) -> ClassificationResult {
    match try_classify(ai, content).await {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "classification fell back to neutral default");
            ClassificationResult::neutral_default()
        }
    }
}

async fn try_classify(
    ai: &dyn AiClient,
    content: &ContentInput,
) -> Result<ClassificationResult, RiskError> {
    let req = GenRequest::new(classification_prompt(content))
        .max_tokens(300)
        .temperature(0.2);
    let raw = ai
        .generate(&req)
        .await
        .ok_or_else(|| RiskError::Classification("model unavailable".to_string()))?;
    let payload =
        extract::extract_object(&raw).map_err(|e| RiskError::Classification(e.to_string()))?;
    Ok(parse_classification(&payload))
}

/// Lenient mapping from the raw payload. Out-of-range numbers are clamped,
/// unknown sentiment strings map to neutral, missing arrays become empty.
fn parse_classification(v: &Value) -> ClassificationResult {
    let sentiment = match v["sentiment"].as_str().map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("positive") => Sentiment::Positive,
        Some(s) if s.eq_ignore_ascii_case("negative") => Sentiment::Negative,
        Some(s) if s.eq_ignore_ascii_case("concerning") => Sentiment::Concerning,
        _ => Sentiment::Neutral,
    };
    let confidence = v["confidenceScore"].as_f64().unwrap_or(0.5).clamp(0.0, 1.0);
    let concern_level = v["concernLevel"].as_f64().unwrap_or(0.0).clamp(0.0, 10.0).round() as u8;

    ClassificationResult {
        sentiment,
        confidence,
        emotional_tone: string_list(&v["emotionalTone"], usize::MAX),
        concern_level,
        suggested_tags: string_list(&v["suggestedTags"], 5),
        content_triggers: string_list(&v["contentTriggers"], usize::MAX),
    }
}

fn string_list(v: &Value, cap: usize) -> Vec<String> {
    v.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|x| x.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .take(cap)
                .collect()
        })
        .unwrap_or_default()
}
