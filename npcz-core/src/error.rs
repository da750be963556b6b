//! Error types for the NPCZ core library.

use std::path::PathBuf;

use thiserror::Error;

use crate::queue::QueueStatus;
use crate::types::PersonaId;

/// Top-level error type for all NPCZ core operations.
#[derive(Error, Debug)]
pub enum NpczError {
    /// Workspace configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A persona document is missing a field or holds an out-of-range value.
    ///
    /// Only that persona is skipped; the rest of the roster keeps running.
    #[error("Invalid profile for {persona}: {reason}")]
    InvalidProfile {
        /// Persona whose profile failed validation.
        persona: String,
        /// What was wrong.
        reason: String,
    },

    /// A persona was requested that is not on the roster.
    #[error("Persona not found: {0}")]
    PersonaNotFound(PersonaId),

    /// A queue entry with the given id does not exist in any partition.
    #[error("Queue entry not found: {0}")]
    EntryNotFound(String),

    /// A queue status change that the pipeline does not allow.
    #[error("Invalid queue transition for {id}: {from} -> {to}")]
    InvalidTransition {
        /// Entry id.
        id: String,
        /// Current status.
        from: QueueStatus,
        /// Requested status.
        to: QueueStatus,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A document could not be read or written.
    #[error("Persistence error at {}: {source}", path.display())]
    Persistence {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for NpczError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for NpczError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, NpczError>;
