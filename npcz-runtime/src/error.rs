//! Error types for the NPCZ runtime.

use npcz_core::{NpczError, PersonaId};
use npcz_llm::LlmError;
use thiserror::Error;

use crate::publisher::PublishError;

/// Errors raised while orchestrating a tick.
///
/// None of these abort a tick: a failing persona or entry is logged and the
/// rest of the roster keeps running.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A generation turn produced nothing usable.
    #[error("Generation failed for {persona} after {attempts} attempts: {reason}")]
    Generation {
        /// Persona whose turn was skipped.
        persona: PersonaId,
        /// Attempts spent.
        attempts: u32,
        /// Last refusal or transport error.
        reason: String,
    },

    /// Publishing failed; the entry stays APPROVED for the next run.
    #[error("Publish failed for entry {entry}: {source}")]
    Publish {
        /// Queue entry id.
        entry: String,
        /// Underlying publisher error.
        #[source]
        source: PublishError,
    },

    /// Generation is suspended while the approved backlog is over its cap.
    #[error("Approved backlog of {count} exceeds cap {cap}")]
    BacklogFull {
        /// APPROVED entries.
        count: usize,
        /// Configured ceiling.
        cap: usize,
    },

    /// Review decision string was not understood.
    #[error("Unknown review decision: {0}")]
    UnknownDecision(String),

    /// Core library failure.
    #[error(transparent)]
    Core(#[from] NpczError),

    /// Generator failure outside the retry loop.
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, RuntimeError>;
