//! Long-term memory: a biography that never fades, plus acquired knowledge.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::types::clamp_unit;

/// Biography facts seeded from the profile. Never decays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreMemory {
    /// Occupation.
    #[serde(default)]
    pub occupation: String,
    /// Experience lines.
    #[serde(default)]
    pub experience: Vec<String>,
}

/// Something the persona learned along the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquiredMemory {
    /// What is remembered.
    pub content: String,
    /// When it was acquired.
    pub acquired_at: DateTime<Utc>,
    /// Importance in [0, 1]; the least important is evicted first.
    pub importance: f64,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Core plus acquired long-term memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LongTermMemory {
    /// Biography.
    #[serde(default)]
    pub core: CoreMemory,
    /// Acquired knowledge, most important first.
    #[serde(default)]
    pub acquired: Vec<AcquiredMemory>,
}

impl LongTermMemory {
    /// Record an acquired memory and evict the least important beyond `capacity`.
    pub fn promote(
        &mut self,
        content: impl Into<String>,
        importance: f64,
        tags: Vec<String>,
        now: DateTime<Utc>,
        capacity: usize,
    ) {
        self.acquired.push(AcquiredMemory {
            content: content.into(),
            acquired_at: now,
            importance: clamp_unit(importance),
            tags,
        });
        self.acquired.sort_by_key(|m| Reverse(OrderedFloat(m.importance)));
        self.acquired.truncate(capacity);
    }

    /// Acquired memories carrying `tag`.
    pub fn tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a AcquiredMemory> + 'a {
        self.acquired.iter().filter(move |m| m.tags.iter().any(|t| t == tag))
    }
}
