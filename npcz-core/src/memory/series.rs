//! Multi-part post series.
//!
//! While active, `current_index < total_planned` always holds. Completion is
//! the only path from active back to inactive.

use serde::{Deserialize, Serialize};

/// State of the persona's current series, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesState {
    /// Whether a series is running.
    #[serde(default)]
    pub active: bool,
    /// Series theme.
    #[serde(default)]
    pub theme: String,
    /// Parts posted so far.
    #[serde(default)]
    pub current_index: u32,
    /// Parts planned.
    #[serde(default)]
    pub total_planned: u32,
    /// Posted parts, in order.
    #[serde(default)]
    pub posts: Vec<String>,
}

/// Result of posting one part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesProgress {
    /// No series is running; nothing changed.
    Inactive,
    /// A part was recorded and more remain.
    Advanced {
        /// Parts posted so far.
        index: u32,
        /// Parts planned.
        total: u32,
    },
    /// The final part was recorded and the series reset.
    Completed {
        /// Theme of the finished series.
        theme: String,
        /// Every part, in order.
        posts: Vec<String>,
    },
}

impl SeriesState {
    /// Start a new series. Returns false if one is already running or `total` is zero.
    pub fn start(&mut self, theme: impl Into<String>, total: u32) -> bool {
        if self.active || total == 0 {
            return false;
        }
        *self = Self {
            active: true,
            theme: theme.into(),
            current_index: 0,
            total_planned: total,
            posts: Vec::new(),
        };
        true
    }

    /// Record one posted part.
    pub fn advance(&mut self, content: impl Into<String>) -> SeriesProgress {
        if !self.active {
            return SeriesProgress::Inactive;
        }
        self.posts.push(content.into());
        self.current_index += 1;
        if self.current_index >= self.total_planned {
            let finished = std::mem::take(self);
            return SeriesProgress::Completed {
                theme: finished.theme,
                posts: finished.posts,
            };
        }
        SeriesProgress::Advanced {
            index: self.current_index,
            total: self.total_planned,
        }
    }

    /// 1-based number of the next part to write.
    #[must_use]
    pub fn next_part(&self) -> u32 {
        self.current_index + 1
    }
}
