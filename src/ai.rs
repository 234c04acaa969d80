//! Model client: provider abstraction over the external text generation
//! capability. Providers return `None` on any failure (network, timeout,
//! non-2xx, empty content); callers own their fallback behavior.

use std::collections::VecDeque;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use std::{env, fs};

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Structured generation parameters for one request.
#[derive(Debug, Clone)]
pub struct GenRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: 256,
            temperature: 0.4,
        }
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }
}

/// Trait object used across the engine.
pub trait AiClient: Send + Sync {
    /// Run one generation. `None` covers unavailable, slow, or unusable outcomes.
    fn generate<'a>(
        &'a self,
        req: &'a GenRequest,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type SharedAi = Arc<dyn AiClient>;

/// Build-time config loaded from `config/ai.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "openai" is the only live provider today.
    pub provider: Option<String>,
    /// Optional model override; defaults to gpt-4o-mini.
    pub model: Option<String>,
}

/// Load config from `config/ai.json`. If reading/parsing fails, returns `AiConfig::default()`.
pub fn load_ai_config() -> AiConfig {
    let path = Path::new("config/ai.json");
    match fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => AiConfig::default(),
    }
}

/// Factory: build a client according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock client.
/// * Else if `config.enabled==false`, returns a disabled client.
/// * Else builds the real provider (OpenAI).
pub fn build_client_from_config(config: &AiConfig) -> SharedAi {
    if env::var("AI_TEST_MODE").map(|v| v == "mock").unwrap_or(false) {
        return Arc::new(MockClient::always("Thanks for checking in. (mock)"));
    }

    if !config.enabled {
        return Arc::new(DisabledClient);
    }

    match config.provider.as_deref() {
        Some("openai") => Arc::new(OpenAiProvider::new(config.model.as_deref())),
        _ => Arc::new(DisabledClient),
    }
}

/// Convenience for bins: reads config from disk and builds a client.
pub fn build_ai_client() -> SharedAi {
    let cfg = load_ai_config();
    build_client_from_config(&cfg)
}

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

/// OpenAI provider (uses Chat Completions API). Requires `OPENAI_API_KEY`.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    /// `model_override`: pass Some("gpt-4o-mini") to override; defaults to gpt-4o-mini.
    pub fn new(model_override: Option<&str>) -> Self {
        let api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("wellbeing-risk-analyzer/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(12))
            .build()
            .expect("reqwest client");
        let model = model_override.unwrap_or("gpt-4o-mini").to_string();
        Self {
            http,
            api_key,
            model,
        }
    }
}

impl AiClient for OpenAiProvider {
    fn generate<'a>(
        &'a self,
        req: &'a GenRequest,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return None;
            }

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let body = Req {
                model: &self.model,
                messages: vec![Msg {
                    role: "user",
                    content: &req.prompt,
                }],
                temperature: req.temperature,
                max_tokens: req.max_tokens,
            };

            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .ok()?;

            if !resp.status().is_success() {
                return None;
            }
            let parsed: Resp = resp.json().await.ok()?;
            let content = parsed
                .choices
                .first()
                .map(|c| c.message.content.trim())
                .unwrap_or("");
            if content.is_empty() {
                None
            } else {
                Some(content.to_string())
            }
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Returns `None` always; used when generation is not configured.
pub struct DisabledClient;

impl AiClient for DisabledClient {
    fn generate<'a>(
        &'a self,
        _req: &'a GenRequest,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async { None })
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic in-process client for tests and `AI_TEST_MODE=mock`.
///
/// Serves scripted responses first (in order), then the fixed fallback for
/// every later call. Counts how many generations were attempted, which lets
/// cache tests assert "no second network call".
pub struct MockClient {
    scripted: Mutex<VecDeque<Option<String>>>,
    fixed: Option<String>,
    calls: AtomicUsize,
}

impl MockClient {
    /// Always answer with the same text.
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fixed: Some(text.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fail, as an unreachable provider would.
    pub fn failing() -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fixed: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Serve the given responses in order, then fail.
    pub fn script(responses: Vec<Option<String>>) -> Self {
        Self {
            scripted: Mutex::new(responses.into()),
            fixed: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of generation attempts seen so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AiClient for MockClient {
    fn generate<'a>(
        &'a self,
        _req: &'a GenRequest,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = {
            let mut q = self.scripted.lock().unwrap_or_else(|p| p.into_inner());
            match q.pop_front() {
                Some(r) => r,
                None => self.fixed.clone(),
            }
        };
        Box::pin(async move { next })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
