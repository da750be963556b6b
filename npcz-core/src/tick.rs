//! Round-robin tick cursor over the sorted roster.

use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted cursor, stored as `tick_state.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickState {
    /// Roster index the next tick starts at.
    #[serde(default)]
    pub next_index: usize,
    /// When the last tick ran.
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    /// Ticks run so far.
    #[serde(default)]
    pub total_ticks: u64,
}

impl TickState {
    /// Claim the next batch of a roster of `roster` personas.
    ///
    /// Returns `[start, end)`. The cursor restarts at 0 if the roster shrank
    /// below it, and wraps to 0 once the end of the roster is reached.
    pub fn advance(&mut self, batch: usize, roster: usize, now: DateTime<Utc>) -> Range<usize> {
        let start = if self.next_index >= roster { 0 } else { self.next_index };
        let end = (start + batch).min(roster);
        self.next_index = if end < roster { end } else { 0 };
        self.total_ticks += 1;
        self.last_run_at = Some(now);
        start..end
    }
}
