//! Lookup of which posts already have responses, rebuilt once per tick.

use std::collections::HashSet;

use super::QueueEntry;
use crate::types::PersonaId;

/// Who has already responded to which remote post.
///
/// Built from the PENDING, APPROVED and POSTED partitions at the start of a
/// tick and updated in memory as the tick enqueues new responses. Never
/// persisted.
#[derive(Debug, Clone, Default)]
pub struct ResponseIndex {
    pairs: HashSet<(PersonaId, String)>,
    answered: HashSet<String>,
}

impl ResponseIndex {
    /// Index every response among `entries`.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a QueueEntry>) -> Self {
        let mut index = Self::default();
        for entry in entries {
            index.observe(entry);
        }
        index
    }

    /// Index one entry if it responds to something.
    pub fn observe(&mut self, entry: &QueueEntry) {
        if let Some(remote_id) = entry.responded_remote_id() {
            self.record(entry.author, remote_id);
        }
    }

    /// Mark `responder` as having responded to `remote_id`.
    pub fn record(&mut self, responder: PersonaId, remote_id: &str) {
        self.pairs.insert((responder, remote_id.to_string()));
        self.answered.insert(remote_id.to_string());
    }

    /// Whether `responder` already responded to `remote_id`.
    #[must_use]
    pub fn already_responded(&self, responder: PersonaId, remote_id: &str) -> bool {
        self.pairs.contains(&(responder, remote_id.to_string()))
    }

    /// Whether anyone responded to `remote_id`.
    #[must_use]
    pub fn has_any_response(&self, remote_id: &str) -> bool {
        self.answered.contains(remote_id)
    }

    /// Number of (responder, post) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
