//! Ollama-backed content generator.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::generator::{ContentGenerator, truncate_at_word};

/// Connection settings for an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaSettings {
    /// Server root, e.g. `http://localhost:11434`.
    pub base_url: String,
    /// Model tag.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Extra transport attempts after the first.
    pub max_retries: u32,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "qwen2.5:7b".into(),
            temperature: 0.8,
            timeout_ms: 60_000,
            max_retries: 1,
        }
    }
}

/// Generator calling Ollama's `/api/generate`.
pub struct OllamaGenerator {
    settings: OllamaSettings,
    http: Client,
}

impl OllamaGenerator {
    /// Create a generator.
    #[must_use]
    pub fn new(settings: OllamaSettings) -> Self {
        Self {
            settings,
            http: Client::new(),
        }
    }

    /// Model tag in use.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Whether the server answers its model listing.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.settings.base_url.trim_end_matches('/'));
        match self
            .http
            .get(&url)
            .timeout(Duration::from_millis(self.settings.timeout_ms))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Ollama not reachable");
                false
            }
        }
    }
}

#[async_trait]
impl ContentGenerator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, prompt: &str, max_length: Option<usize>) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.settings.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.settings.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": self.settings.temperature },
        });

        let attempts = self.settings.max_retries + 1;
        let mut last_error = LlmError::RequestFailed("no attempt made".into());
        for attempt in 0..attempts {
            if attempt > 0 {
                debug!(attempt = attempt + 1, of = attempts, "Retrying Ollama call");
            }

            let start = Instant::now();
            let result = self
                .http
                .post(&url)
                .json(&body)
                .timeout(Duration::from_millis(self.settings.timeout_ms))
                .send()
                .await;
            let latency_ms = start.elapsed().as_millis();

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let json: serde_json::Value = resp
                        .json()
                        .await
                        .map_err(|e| LlmError::ParseError(e.to_string()))?;
                    let text = json["response"]
                        .as_str()
                        .ok_or_else(|| LlmError::ParseError("missing `response` field".into()))?
                        .trim()
                        .to_string();
                    debug!(
                        model = %self.settings.model,
                        latency_ms,
                        chars = text.chars().count(),
                        "Ollama generated"
                    );
                    return Ok(match max_length {
                        Some(max) => truncate_at_word(&text, max),
                        None => text,
                    });
                }
                Ok(resp) => {
                    last_error = LlmError::RequestFailed(format!("HTTP {}", resp.status()));
                    warn!(error = %last_error, "Ollama returned error");
                }
                Err(e) => {
                    let err = self.transport_error(&e);
                    warn!(error = %err, "Ollama request failed");
                    if matches!(err, LlmError::Unavailable(_)) {
                        return Err(err);
                    }
                    last_error = err;
                }
            }
        }

        if attempts == 1 {
            return Err(last_error);
        }
        Err(LlmError::RetriesExhausted {
            attempts,
            last_error: last_error.to_string(),
        })
    }
}

impl OllamaGenerator {
    fn transport_error(&self, e: &reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.settings.timeout_ms)
        } else if e.is_connect() {
            LlmError::Unavailable(e.to_string())
        } else {
            LlmError::RequestFailed(e.to_string())
        }
    }
}
