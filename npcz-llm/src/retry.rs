//! Bounded generate-and-check loop.

use tracing::{debug, warn};

use crate::generator::ContentGenerator;
use crate::validate::Rejection;

/// How many times a generation turn may ask the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Result of a generation turn.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// Usable text.
    Success {
        /// Cleaned, accepted text.
        content: String,
        /// Attempts used.
        attempts: u32,
    },
    /// The generator answered every time but the last answer was refused.
    ValidationFailed {
        /// Attempts used.
        attempts: u32,
        /// Why the last answer was refused.
        rejection: Rejection,
    },
    /// The last attempt failed to reach the generator.
    Exhausted {
        /// Attempts used.
        attempts: u32,
        /// Last transport error.
        error: String,
    },
}

impl GenerationOutcome {
    /// The accepted text, if any.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Success { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Consume into the accepted text, if any.
    #[must_use]
    pub fn into_content(self) -> Option<String> {
        match self {
            Self::Success { content, .. } => Some(content),
            _ => None,
        }
    }
}

impl RetryPolicy {
    /// Policy with `max_attempts` total attempts (minimum 1).
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Ask `generator` until `check` accepts an answer or attempts run out.
    ///
    /// `prompt` is rebuilt for every attempt (0-based index) so callers can
    /// vary topic choice. `check` cleans and validates the raw answer.
    pub async fn run<G, P, C>(
        &self,
        generator: &G,
        max_length: Option<usize>,
        mut prompt: P,
        mut check: C,
    ) -> GenerationOutcome
    where
        G: ContentGenerator + ?Sized,
        P: FnMut(u32) -> String,
        C: FnMut(&str) -> Result<String, Rejection>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last = GenerationOutcome::Exhausted {
            attempts: 0,
            error: String::new(),
        };
        for attempt in 0..attempts {
            let text = prompt(attempt);
            match generator.generate(&text, max_length).await {
                Ok(raw) => match check(&raw) {
                    Ok(content) => {
                        debug!(attempt = attempt + 1, generator = generator.name(), "Generation accepted");
                        return GenerationOutcome::Success {
                            content,
                            attempts: attempt + 1,
                        };
                    }
                    Err(rejection) => {
                        warn!(attempt = attempt + 1, of = attempts, reason = %rejection, "Generated text refused");
                        last = GenerationOutcome::ValidationFailed {
                            attempts: attempt + 1,
                            rejection,
                        };
                    }
                },
                Err(e) => {
                    warn!(attempt = attempt + 1, of = attempts, error = %e, "Generator call failed");
                    last = GenerationOutcome::Exhausted {
                        attempts: attempt + 1,
                        error: e.to_string(),
                    };
                }
            }
        }
        last
    }
}
