//! The content generator seam and a scripted test double.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::LlmError;

/// Anything that turns a prompt into text.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Generate text for `prompt`, trimmed to `max_length` characters when given.
    ///
    /// # Errors
    /// Returns [`LlmError`] if the backend cannot produce a response.
    async fn generate(&self, prompt: &str, max_length: Option<usize>) -> Result<String, LlmError>;
}

/// Replays canned responses in order and records every prompt it saw.
///
/// Used by tests and offline runs.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, String>>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    /// Generator that answers with `responses` in order, then fails.
    #[must_use]
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Generator that always answers `text` once the script runs out.
    #[must_use]
    pub fn repeating(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::default()
        }
    }

    /// Queue another response.
    pub fn push(&self, text: impl Into<String>) {
        self.responses.lock().push_back(Ok(text.into()));
    }

    /// Queue a transport failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.responses.lock().push_back(Err(message.into()));
    }

    /// Every prompt received so far.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Number of prompts received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, max_length: Option<usize>) -> Result<String, LlmError> {
        self.prompts.lock().push(prompt.to_string());
        let next = self.responses.lock().pop_front();
        let text = match next {
            Some(Ok(text)) => text,
            Some(Err(message)) => return Err(LlmError::RequestFailed(message)),
            None => self.fallback.clone().ok_or(LlmError::ScriptExhausted)?,
        };
        Ok(match max_length {
            Some(max) => truncate_at_word(&text, max),
            None => text,
        })
    }
}

const ELLIPSIS: &str = "...";

/// Cut `text` to at most `max` characters, ellipsis included, backing off
/// to the last space before the cut.
#[must_use]
pub fn truncate_at_word(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= ELLIPSIS.len() {
        return text.chars().take(max).collect();
    }
    let budget = max - ELLIPSIS.len();
    let head: String = text.chars().take(budget).collect();
    if text.chars().nth(budget) == Some(' ') {
        return format!("{head}{ELLIPSIS}");
    }
    match head.rsplit_once(' ') {
        Some((kept, _)) if !kept.is_empty() => format!("{kept}{ELLIPSIS}"),
        _ => format!("{head}{ELLIPSIS}"),
    }
}
