//! Persona runtime state: the mutable JSON document updated every turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AffinitySettings;
use crate::types::{InteractionKind, PersonaId, clamp_signed, clamp_unit};

/// One published post in the persona's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Text as published.
    pub content: String,
    /// Publish time.
    pub posted_at: DateTime<Utc>,
    /// Id assigned by the network.
    #[serde(default)]
    pub remote_id: Option<String>,
}

/// Mutable per-persona state, stored as `state.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaState {
    /// Owner.
    pub id: PersonaId,
    /// Epoch seconds of the last publish (0 = never).
    #[serde(default)]
    pub last_post_time: i64,
    /// Epoch seconds before which the persona should not post (0 = unset).
    #[serde(default)]
    pub next_post_time: i64,
    /// Posts published so far.
    #[serde(default)]
    pub total_posts: u64,
    /// Text of the last publish.
    #[serde(default)]
    pub last_post_content: Option<String>,
    /// Network id of the last publish.
    #[serde(default)]
    pub last_remote_id: Option<String>,
    /// Bounded history of published posts, oldest first.
    #[serde(default)]
    pub post_history: Vec<PostRecord>,
    /// Interests picked up over time.
    #[serde(default)]
    pub discovered_topics: Vec<String>,
    /// Mood in [-1, 1].
    #[serde(default)]
    pub mood: f64,
    /// Energy in [0, 1].
    #[serde(default = "neutral")]
    pub energy: f64,
    /// Focus in [0, 1].
    #[serde(default = "neutral")]
    pub focus: f64,
    /// Motivation in [0, 1].
    #[serde(default = "neutral")]
    pub motivation: f64,
    /// Fatigue in [0, 1].
    #[serde(default)]
    pub fatigue: f64,
    /// Mental health in [0, 1].
    #[serde(default = "neutral")]
    pub mental_health: f64,
}

fn neutral() -> f64 {
    0.5
}

impl PersonaState {
    /// Fresh state for a persona that has never run.
    #[must_use]
    pub fn new(id: PersonaId) -> Self {
        Self {
            id,
            last_post_time: 0,
            next_post_time: 0,
            total_posts: 0,
            last_post_content: None,
            last_remote_id: None,
            post_history: Vec::new(),
            discovered_topics: Vec::new(),
            mood: 0.0,
            energy: 0.5,
            focus: 0.5,
            motivation: 0.5,
            fatigue: 0.0,
            mental_health: 0.5,
        }
    }

    /// Clamp every scalar into its domain. Applied after every load.
    pub fn normalize(&mut self) {
        self.mood = clamp_signed(self.mood);
        self.energy = clamp_unit(self.energy);
        self.focus = clamp_unit(self.focus);
        self.motivation = clamp_unit(self.motivation);
        self.fatigue = clamp_unit(self.fatigue);
        self.mental_health = clamp_unit(self.mental_health);
    }

    /// Shift mood, clamped to [-1, 1].
    pub fn adjust_mood(&mut self, delta: f64) {
        self.mood = clamp_signed(self.mood + delta);
    }

    /// Record a publish and schedule the next one.
    pub fn record_post(
        &mut self,
        content: &str,
        remote_id: Option<String>,
        now: DateTime<Utc>,
        next_post_time: i64,
        history_cap: usize,
    ) {
        self.last_post_time = now.timestamp();
        self.next_post_time = next_post_time;
        self.total_posts += 1;
        self.last_post_content = Some(content.to_string());
        self.last_remote_id.clone_from(&remote_id);
        self.post_history.push(PostRecord {
            content: content.to_string(),
            posted_at: now,
            remote_id,
        });
        if self.post_history.len() > history_cap {
            let excess = self.post_history.len() - history_cap;
            self.post_history.drain(..excess);
        }
        self.fatigue = clamp_unit(self.fatigue + 0.05);
    }

    /// The most recent `n` posts, newest last.
    #[must_use]
    pub fn recent_history(&self, n: usize) -> &[PostRecord] {
        let start = self.post_history.len().saturating_sub(n);
        &self.post_history[start..]
    }

    /// Add a discovered topic unless already known. Returns whether it was new.
    pub fn discover_topic(&mut self, topic: &str) -> bool {
        if self.discovered_topics.iter().any(|t| t == topic) {
            return false;
        }
        self.discovered_topics.push(topic.to_string());
        true
    }

    /// Effect of a post receiving a reply or reaction.
    pub fn apply_feedback(&mut self, kind: InteractionKind, settings: &AffinitySettings) {
        let (mood, lift) = match kind {
            InteractionKind::Reply => (settings.mood_reply, 0.05),
            InteractionKind::Reaction => (settings.mood_reaction, 0.02),
        };
        self.adjust_mood(mood);
        self.motivation = clamp_unit(self.motivation + lift);
        self.energy = clamp_unit(self.energy + lift / 2.0);
    }

    /// Effect of a post going unanswered.
    pub fn apply_ignored(&mut self, settings: &AffinitySettings) {
        self.adjust_mood(settings.mood_ignored);
    }
}
