//! # Resource Cache
//! Serves the support resource list, regenerating it through the external
//! model at most once per 7-day period. One global slot, no per-user key;
//! fallback results are cached too, which bounds retry cost when the model is
//! down for a while.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::ai::{AiClient, GenRequest};
use crate::error::RiskError;
use crate::extract;
use crate::profile::RiskProfile;
use crate::storage::{KvStore, RESOURCES_KEY};

/// Cache entries older than this force a refresh attempt.
pub const RESOURCE_TTL_SECS: u64 = 7 * 24 * 3600;
/// How many resources one generation is asked for.
pub const RESOURCE_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Hotline,
    App,
    Website,
    Organization,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub description: String,
    pub contact_info: String,
    pub kind: ResourceKind,
}

/// The single persisted cache slot, replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCacheEntry {
    pub resources: Vec<Resource>,
    pub ts_unix: u64,
}

impl ResourceCacheEntry {
    pub fn is_fresh(&self, now_unix: u64) -> bool {
        now_unix.saturating_sub(self.ts_unix) < RESOURCE_TTL_SECS
    }
}

/// Known-good list served (and cached) when generation fails.
pub static FALLBACK_RESOURCES: Lazy<Vec<Resource>> = Lazy::new(|| {
    vec![
        Resource {
            name: "988 Suicide & Crisis Lifeline".to_string(),
            description: "Free, confidential support around the clock for people in distress."
                .to_string(),
            contact_info: "Call or text 988".to_string(),
            kind: ResourceKind::Hotline,
        },
        Resource {
            name: "Crisis Text Line".to_string(),
            description: "Text-based crisis counseling, any time of day.".to_string(),
            contact_info: "Text HOME to 741741".to_string(),
            kind: ResourceKind::Hotline,
        },
        Resource {
            name: "SAMHSA National Helpline".to_string(),
            description: "Referrals for mental health and substance use support services."
                .to_string(),
            contact_info: "1-800-662-4357".to_string(),
            kind: ResourceKind::Hotline,
        },
        Resource {
            name: "Calm Harm".to_string(),
            description: "Short guided activities for riding out the urge to self-harm."
                .to_string(),
            contact_info: "calmharm.co.uk".to_string(),
            kind: ResourceKind::App,
        },
        Resource {
            name: "Mental Health America".to_string(),
            description: "Screening tools and directories of local support options.".to_string(),
            contact_info: "mhanational.org".to_string(),
            kind: ResourceKind::Organization,
        },
    ]
});

/// Request template parameterized by the caller's risk profile.
pub fn resources_prompt(profile: &RiskProfile) -> String {
    format!(
        "Suggest exactly {} mental wellbeing support resources for someone whose recent \
         mood reads as {:?} (concern level {} of 10{}). \
         Respond with a JSON array of objects, each with fields \"name\", \"description\", \
         \"contactInfo\", and \"type\" (one of \"hotline\", \"app\", \"website\", \
         \"organization\"). No other text.",
        RESOURCE_COUNT,
        profile.dominant,
        profile.concern_level,
        if profile.common_triggers.is_empty() {
            String::new()
        } else {
            format!("; recent themes: {}", profile.common_triggers.join(", "))
        }
    )
}

/// Serve the resource list for this profile: cache hit inside the TTL,
/// otherwise one refresh attempt whose result (generated or fallback) is
/// cached with a fresh timestamp.
pub async fn get_resources(
    store: &dyn KvStore,
    ai: &dyn AiClient,
    profile: &RiskProfile,
    now_unix: u64,
) -> Vec<Resource> {
    match read_cache(store).await {
        Ok(Some(entry)) if entry.is_fresh(now_unix) => return entry.resources,
        Ok(_) => {}
        Err(e) => debug!(error = %e, "resource cache unreadable, treating as miss"),
    }

    let req = GenRequest::new(resources_prompt(profile))
        .max_tokens(600)
        .temperature(0.5);
    let generated = match ai.generate(&req).await {
        Some(raw) => match parse_resources(&raw) {
            Ok(list) => Some(list),
            Err(e) => {
                warn!(error = %e, "generated resources unusable, serving fallback");
                None
            }
        },
        None => {
            warn!("resource generation unavailable, serving fallback");
            None
        }
    };

    let resources = generated.unwrap_or_else(|| FALLBACK_RESOURCES.clone());
    let entry = ResourceCacheEntry {
        resources: resources.clone(),
        ts_unix: now_unix,
    };
    if let Err(e) = write_cache(store, &entry).await {
        warn!(error = %e, "failed to persist resource cache");
    }
    resources
}

async fn read_cache(store: &dyn KvStore) -> Result<Option<ResourceCacheEntry>, RiskError> {
    let Some(raw) = store.get(RESOURCES_KEY).await? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

async fn write_cache(store: &dyn KvStore, entry: &ResourceCacheEntry) -> Result<(), RiskError> {
    let raw = serde_json::to_string(entry)?;
    store.set(RESOURCES_KEY, &raw).await?;
    Ok(())
}

/// Lenient mapping from a generated payload: malformed entries are skipped;
/// an array with nothing usable counts as a failure.
fn parse_resources(raw: &str) -> Result<Vec<Resource>, RiskError> {
    let payload = extract::extract_array(raw).map_err(|e| RiskError::Generation(e.to_string()))?;
    let list: Vec<Resource> = payload
        .as_array()
        .map(|items| items.iter().filter_map(resource_from_value).collect())
        .unwrap_or_default();
    if list.is_empty() {
        return Err(RiskError::Generation(
            "no usable resources in payload".to_string(),
        ));
    }
    Ok(list)
}

fn resource_from_value(v: &Value) -> Option<Resource> {
    let name = v["name"].as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let kind = match v["type"].as_str().map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("hotline") => ResourceKind::Hotline,
        Some(s) if s.eq_ignore_ascii_case("app") => ResourceKind::App,
        Some(s) if s.eq_ignore_ascii_case("website") => ResourceKind::Website,
        _ => ResourceKind::Organization,
    };
    Some(Resource {
        name: name.to_string(),
        description: v["description"].as_str().unwrap_or("").trim().to_string(),
        contact_info: v["contactInfo"].as_str().unwrap_or("").trim().to_string(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_list_has_exactly_five_entries() {
        assert_eq!(FALLBACK_RESOURCES.len(), RESOURCE_COUNT);
    }

    #[test]
    fn freshness_boundary_is_exclusive() {
        let entry = ResourceCacheEntry {
            resources: Vec::new(),
            ts_unix: 1_000,
        };
        assert!(entry.is_fresh(1_000 + RESOURCE_TTL_SECS - 1));
        assert!(!entry.is_fresh(1_000 + RESOURCE_TTL_SECS));
    }

    #[test]
    fn parse_skips_malformed_entries() {
        let raw = r#"Of course. ```json
        [
            {"name": "Lifeline", "description": "d", "contactInfo": "988", "type": "hotline"},
            {"description": "missing name"},
            {"name": "Some Org", "type": "charity"}
        ]
        ```"#;
        let list = parse_resources(raw).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].kind, ResourceKind::Hotline);
        // Unknown type strings default to organization.
        assert_eq!(list[1].kind, ResourceKind::Organization);
    }

    #[test]
    fn parse_rejects_payload_with_nothing_usable() {
        assert!(parse_resources("[]").is_err());
        assert!(parse_resources("try calling a hotline").is_err());
    }
}
