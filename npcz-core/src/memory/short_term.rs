//! Short-term memory: what is on a resident's mind right now.
//!
//! Entries start at full strength, fade by a fixed rate each generation
//! cycle and are reinforced when the persona's posts get attention.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::types::clamp_unit;

/// Where a short-term entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    /// The persona's own post.
    OwnPost,
    /// A reply or reaction received.
    Feedback,
    /// Something seen on the timeline.
    Timeline,
    /// Seeded from the profile.
    Seed,
}

/// One short-term memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortTermEntry {
    /// What is remembered.
    pub content: String,
    /// Strength in [0, 1].
    pub strength: f64,
    /// When it entered memory.
    pub created_at: DateTime<Utc>,
    /// Origin.
    pub source: MemorySource,
}

/// Capacity-bounded list of fading entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortTermMemory {
    entries: Vec<ShortTermEntry>,
}

impl ShortTermMemory {
    /// All entries.
    #[must_use]
    pub fn entries(&self) -> &[ShortTermEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subtract `rate` from every entry and drop those that reach zero.
    pub fn decay(&mut self, rate: f64) {
        for entry in &mut self.entries {
            entry.strength -= rate;
        }
        self.entries.retain(|e| e.strength > 0.0);
    }

    /// Insert at full strength, then evict the weakest beyond `capacity`.
    pub fn add(
        &mut self,
        content: impl Into<String>,
        source: MemorySource,
        now: DateTime<Utc>,
        capacity: usize,
    ) {
        self.entries.push(ShortTermEntry {
            content: content.into(),
            strength: 1.0,
            created_at: now,
            source,
        });
        self.entries.sort_by_key(|e| Reverse(OrderedFloat(e.strength)));
        self.entries.truncate(capacity);
    }

    /// Boost every entry whose content contains `keyword` (case-insensitive).
    ///
    /// The boost is scaled by `0.5 + sensitivity`, so a neutral persona gets
    /// exactly `boost`. Returns whether any entry actually gained strength.
    pub fn reinforce(&mut self, keyword: &str, boost: f64, sensitivity: f64) -> bool {
        let needle = keyword.to_lowercase();
        if needle.is_empty() {
            return false;
        }
        let scaled = boost * (0.5 + clamp_unit(sensitivity));
        let mut reinforced = false;
        for entry in &mut self.entries {
            if entry.content.to_lowercase().contains(&needle) {
                let before = entry.strength;
                entry.strength = (entry.strength + scaled).min(1.0);
                reinforced |= entry.strength > before;
            }
        }
        reinforced
    }

    /// Remove and return every entry at or above `threshold`.
    pub fn take_at_least(&mut self, threshold: f64) -> Vec<ShortTermEntry> {
        let (promoted, remaining) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.strength >= threshold);
        self.entries = remaining;
        promoted
    }

    /// Contents of up to `limit` entries at or above `threshold`, strongest first.
    #[must_use]
    pub fn strongest(&self, threshold: f64, limit: usize) -> Vec<&str> {
        let mut strong: Vec<&ShortTermEntry> =
            self.entries.iter().filter(|e| e.strength >= threshold).collect();
        strong.sort_by_key(|e| Reverse(OrderedFloat(e.strength)));
        strong.into_iter().take(limit).map(|e| e.content.as_str()).collect()
    }

    /// Clamp strengths after loading a document that may hold stray values.
    pub fn normalize(&mut self) {
        for entry in &mut self.entries {
            entry.strength = clamp_unit(entry.strength);
        }
        self.entries.retain(|e| e.strength > 0.0);
    }

    /// Insert an entry at a given strength without applying the capacity cap.
    pub fn push_with_strength(
        &mut self,
        content: impl Into<String>,
        strength: f64,
        source: MemorySource,
        now: DateTime<Utc>,
    ) {
        self.entries.push(ShortTermEntry {
            content: content.into(),
            strength: clamp_unit(strength),
            created_at: now,
            source,
        });
    }
}
