//! Content generator error types.

use thiserror::Error;

/// Errors that can occur while talking to a content generator.
///
/// Unusable *content* is not an error; see
/// [`GenerationOutcome`](crate::retry::GenerationOutcome).
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("generator request failed: {0}")]
    RequestFailed(String),

    /// Response body was not the expected JSON.
    #[error("failed to parse generator response: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("generator request timed out after {0}ms")]
    Timeout(u64),

    /// Nothing is listening at the configured address. Not retried.
    #[error("generator unavailable: {0}")]
    Unavailable(String),

    /// All transport retries exhausted.
    #[error("all generator retry attempts exhausted after {attempts} tries: {last_error}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Last failure seen.
        last_error: String,
    },

    /// A scripted generator ran out of responses.
    #[error("no scripted response left for prompt")]
    ScriptExhausted,
}
