//! Persona memory model and the [`PersonaMemory`] aggregate.
//!
//! Three layers make a persona's interests drift over time:
//!
//! - **Short-term** entries fade every generation cycle and are reinforced
//!   when the persona's posts receive replies or reactions.
//! - **Long-term** memory holds biography (core) and knowledge acquired by
//!   promotion from short-term or by finishing a series.
//! - **Series** state tracks a multi-part run of posts on one theme.

pub mod long_term;
pub mod series;
pub mod short_term;

pub use long_term::{AcquiredMemory, CoreMemory, LongTermMemory};
pub use series::{SeriesProgress, SeriesState};
pub use short_term::{MemorySource, ShortTermEntry, ShortTermMemory};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MemorySettings;
use crate::persona::PersonaProfile;
use crate::types::{InteractionKind, PersonaId};

/// Tokens at the start of a post that are matched against short-term memory.
const FEEDBACK_TOKENS: usize = 5;
/// Tokens shorter than this are too generic to match on.
const MIN_TOKEN_CHARS: usize = 2;
/// Leading characters of a post matched as a whole.
const FEEDBACK_PREFIX_CHARS: usize = 20;

/// Everything a persona remembers, stored as `memory.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaMemory {
    /// Owner.
    pub id: PersonaId,
    /// Fading entries.
    #[serde(default)]
    pub short_term: ShortTermMemory,
    /// Core and acquired memory.
    #[serde(default)]
    pub long_term: LongTermMemory,
    /// Current series.
    #[serde(default)]
    pub series: SeriesState,
    /// Texts of the most recent posts, oldest first.
    #[serde(default)]
    pub recent_posts: Vec<String>,
    /// Last modification.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PersonaMemory {
    /// Empty memory.
    #[must_use]
    pub fn new(id: PersonaId) -> Self {
        Self {
            id,
            short_term: ShortTermMemory::default(),
            long_term: LongTermMemory::default(),
            series: SeriesState::default(),
            recent_posts: Vec::new(),
            updated_at: None,
        }
    }

    /// Memory seeded with the profile's biography as core long-term memory.
    #[must_use]
    pub fn seeded(profile: &PersonaProfile) -> Self {
        let mut memory = Self::new(profile.id);
        memory.long_term.core = CoreMemory {
            occupation: profile.background.occupation.clone(),
            experience: profile.background.experience.clone(),
        };
        memory
    }

    // -----------------------------------------------------------------------
    // Short-term
    // -----------------------------------------------------------------------

    /// Fade every short-term entry by `rate`, dropping exhausted ones.
    pub fn decay_short_term(&mut self, rate: f64) {
        self.short_term.decay(rate);
    }

    /// Remember something new at full strength.
    pub fn add_short_term(
        &mut self,
        content: impl Into<String>,
        source: MemorySource,
        now: DateTime<Utc>,
        settings: &MemorySettings,
    ) {
        self.short_term.add(content, source, now, settings.max_short_term);
        self.updated_at = Some(now);
    }

    /// Boost entries containing `keyword`. Returns whether anything changed.
    pub fn reinforce_short_term(&mut self, keyword: &str, boost: f64, sensitivity: f64) -> bool {
        self.short_term.reinforce(keyword, boost, sensitivity)
    }

    /// Reinforce memory after `post` received a reply or reaction.
    ///
    /// The post's leading tokens and its opening characters are matched
    /// against short-term entries. Returns whether anything was reinforced.
    pub fn reinforce_from_feedback(
        &mut self,
        post: &str,
        kind: InteractionKind,
        sensitivity: f64,
        settings: &MemorySettings,
    ) -> bool {
        let boost = match kind {
            InteractionKind::Reply => settings.reply_boost,
            InteractionKind::Reaction => settings.reaction_boost,
        };
        let mut reinforced = false;
        for token in post
            .split_whitespace()
            .take(FEEDBACK_TOKENS)
            .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        {
            reinforced |= self.short_term.reinforce(token, boost, sensitivity);
        }
        let prefix: String = post.chars().take(FEEDBACK_PREFIX_CHARS).collect();
        reinforced |= self.short_term.reinforce(&prefix, boost, sensitivity);
        reinforced
    }

    /// Move every entry at or above `threshold` into acquired long-term memory.
    ///
    /// Returns the promoted contents.
    pub fn check_and_promote(
        &mut self,
        threshold: f64,
        now: DateTime<Utc>,
        settings: &MemorySettings,
    ) -> Vec<String> {
        let promoted = self.short_term.take_at_least(threshold);
        let mut contents = Vec::with_capacity(promoted.len());
        for entry in promoted {
            self.long_term.promote(
                entry.content.clone(),
                settings.promoted_importance,
                Vec::new(),
                now,
                settings.max_long_term,
            );
            contents.push(entry.content);
        }
        if !contents.is_empty() {
            self.updated_at = Some(now);
        }
        contents
    }

    /// Record an acquired long-term memory directly.
    pub fn promote_to_long_term(
        &mut self,
        content: impl Into<String>,
        importance: f64,
        tags: Vec<String>,
        now: DateTime<Utc>,
        settings: &MemorySettings,
    ) {
        self.long_term
            .promote(content, importance, tags, now, settings.max_long_term);
        self.updated_at = Some(now);
    }

    /// Short-term contents strong enough to steer topic choice.
    #[must_use]
    pub fn active_interests(&self, settings: &MemorySettings) -> Vec<&str> {
        self.short_term
            .strongest(settings.active_interest_threshold, settings.max_active_interests)
    }

    // -----------------------------------------------------------------------
    // Series
    // -----------------------------------------------------------------------

    /// Begin a series. Returns false if one is running or `total` is zero.
    pub fn start_series(&mut self, theme: impl Into<String>, total: u32) -> bool {
        self.series.start(theme, total)
    }

    /// Record one part of the running series.
    ///
    /// Finishing the series stores exactly one long-term memory tagged with
    /// the theme.
    pub fn advance_series(
        &mut self,
        content: impl Into<String>,
        now: DateTime<Utc>,
        settings: &MemorySettings,
    ) -> SeriesProgress {
        let progress = self.series.advance(content);
        if let SeriesProgress::Completed { theme, posts } = &progress {
            self.promote_to_long_term(
                format!("completed a {}-part series on {theme}", posts.len()),
                settings.series_importance,
                vec![theme.clone()],
                now,
                settings,
            );
        }
        progress
    }

    // -----------------------------------------------------------------------
    // Generation cycle
    // -----------------------------------------------------------------------

    /// Apply the per-generation memory cycle for a freshly generated post:
    /// decay, remember the post, track it as recent, advance any series.
    pub fn record_generated_post(
        &mut self,
        content: &str,
        now: DateTime<Utc>,
        settings: &MemorySettings,
    ) -> SeriesProgress {
        self.decay_short_term(settings.decay_rate);
        self.add_short_term(content, MemorySource::OwnPost, now, settings);
        self.recent_posts.push(content.to_string());
        if self.recent_posts.len() > settings.max_recent_posts {
            let excess = self.recent_posts.len() - settings.max_recent_posts;
            self.recent_posts.drain(..excess);
        }
        self.advance_series(content, now, settings)
    }

    /// Clamp any stray values after loading.
    pub fn normalize(&mut self) {
        self.short_term.normalize();
        if self.series.active && self.series.current_index >= self.series.total_planned {
            self.series = SeriesState::default();
        }
    }
}
