//! JSON partition files backing the queue pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{QueueEntry, QueueStatus, ResponseIndex};
use crate::error::{NpczError, Result};
use crate::persistence::{read_json_lenient, write_json};
use crate::types::PersonaId;

/// One JSON array per status under a queue directory.
#[derive(Debug, Clone)]
pub struct QueueStore {
    dir: PathBuf,
}

impl QueueStore {
    /// Queue rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the partitions.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn partition_path(&self, status: QueueStatus) -> PathBuf {
        self.dir.join(format!("{status}.json"))
    }

    fn load(&self, status: QueueStatus) -> Vec<QueueEntry> {
        read_json_lenient(&self.partition_path(status)).unwrap_or_default()
    }

    fn save(&self, status: QueueStatus, entries: &[QueueEntry]) -> Result<()> {
        write_json(&self.partition_path(status), &entries)
    }

    /// Every entry with `status`, in insertion order.
    #[must_use]
    pub fn all(&self, status: QueueStatus) -> Vec<QueueEntry> {
        self.load(status)
    }

    /// Append an entry to the partition matching its status.
    ///
    /// # Errors
    /// Returns an error if the partition cannot be written.
    pub fn add(&self, entry: QueueEntry) -> Result<()> {
        let status = entry.status;
        let mut entries = self.load(status);
        debug!(entry = %entry.id, author = %entry.author, %status, "Enqueued entry");
        entries.push(entry);
        self.save(status, &entries)
    }

    /// Find an entry in any partition.
    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<QueueEntry> {
        QueueStatus::ALL
            .into_iter()
            .find_map(|status| self.load(status).into_iter().find(|e| e.id == id))
    }

    /// Number of entries with `status`.
    #[must_use]
    pub fn count(&self, status: QueueStatus) -> usize {
        self.load(status).len()
    }

    /// Entry counts for every status.
    #[must_use]
    pub fn summary(&self) -> BTreeMap<QueueStatus, usize> {
        QueueStatus::ALL.into_iter().map(|s| (s, self.count(s))).collect()
    }

    /// Whether the APPROVED backlog is above `cap`.
    #[must_use]
    pub fn backlog_exceeded(&self, cap: usize) -> bool {
        self.count(QueueStatus::Approved) > cap
    }

    /// Move an entry from its current status to `to`, applying `update` first.
    ///
    /// # Errors
    /// [`NpczError::EntryNotFound`] if no partition holds `id`;
    /// [`NpczError::InvalidTransition`] if the move is not allowed.
    pub fn transition<F>(&self, id: &str, to: QueueStatus, update: F) -> Result<QueueEntry>
    where
        F: FnOnce(&mut QueueEntry),
    {
        let (from, mut source) = QueueStatus::ALL
            .into_iter()
            .map(|s| (s, self.load(s)))
            .find(|(_, entries)| entries.iter().any(|e| e.id == id))
            .ok_or_else(|| NpczError::EntryNotFound(id.to_string()))?;

        if !from.can_transition_to(to) {
            return Err(NpczError::InvalidTransition {
                id: id.to_string(),
                from,
                to,
            });
        }

        let pos = source
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| NpczError::EntryNotFound(id.to_string()))?;
        let mut entry = source.remove(pos);
        entry.status = to;
        update(&mut entry);

        let mut target = self.load(to);
        target.push(entry.clone());
        // Destination first: a crash in between duplicates rather than loses.
        self.save(to, &target)?;
        self.save(from, &source)?;

        info!(entry = %id, %from, %to, "Queue transition");
        Ok(entry)
    }

    /// PENDING → APPROVED.
    ///
    /// # Errors
    /// See [`QueueStore::transition`].
    pub fn approve(&self, id: &str, note: Option<String>, now: DateTime<Utc>) -> Result<QueueEntry> {
        self.transition(id, QueueStatus::Approved, |e| {
            e.reviewed_at = Some(now);
            e.review_note = note;
        })
    }

    /// PENDING → REJECTED.
    ///
    /// # Errors
    /// See [`QueueStore::transition`].
    pub fn reject(&self, id: &str, note: Option<String>, now: DateTime<Utc>) -> Result<QueueEntry> {
        self.transition(id, QueueStatus::Rejected, |e| {
            e.reviewed_at = Some(now);
            e.review_note = note;
        })
    }

    /// APPROVED → POSTED.
    ///
    /// # Errors
    /// See [`QueueStore::transition`].
    pub fn mark_posted(&self, id: &str, remote_id: Option<String>, now: DateTime<Utc>) -> Result<QueueEntry> {
        self.transition(id, QueueStatus::Posted, |e| {
            e.posted_at = Some(now);
            e.remote_id = remote_id;
        })
    }

    /// Modify an entry without changing its status.
    ///
    /// # Errors
    /// [`NpczError::EntryNotFound`] if `id` is not in the `status` partition.
    pub fn update_in_place<F>(&self, status: QueueStatus, id: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut QueueEntry),
    {
        let mut entries = self.load(status);
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| NpczError::EntryNotFound(id.to_string()))?;
        update(entry);
        entry.status = status;
        self.save(status, &entries)
    }

    /// Most recent rejections for `author`, newest first.
    #[must_use]
    pub fn recent_rejected(&self, author: PersonaId, limit: usize) -> Vec<QueueEntry> {
        let mut rejected: Vec<QueueEntry> = self
            .load(QueueStatus::Rejected)
            .into_iter()
            .filter(|e| e.author == author)
            .collect();
        rejected.sort_by_key(|e| std::cmp::Reverse(e.reviewed_at.unwrap_or(e.created_at)));
        rejected.truncate(limit);
        rejected
    }

    /// Build the duplicate-response index from the live partitions.
    #[must_use]
    pub fn build_index(&self) -> ResponseIndex {
        let live: Vec<QueueEntry> = QueueStatus::LIVE.into_iter().flat_map(|s| self.load(s)).collect();
        ResponseIndex::from_entries(&live)
    }
}
