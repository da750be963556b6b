//! Persona profile: the immutable-per-load YAML description of a resident.

use std::collections::BTreeMap;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::{NpczError, Result};
use crate::types::{Chronotype, PersonaId, PersonalityTraits};

/// Full persona profile as stored in `profile.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaProfile {
    /// Resident id.
    pub id: PersonaId,
    /// Display name.
    pub name: String,
    /// Personality summary used for prompts and reaction temperament.
    #[serde(default)]
    pub personality: Personality,
    /// Topics and keywords the persona cares about.
    #[serde(default)]
    pub interests: Interests,
    /// Posting cadence and formatting.
    pub behavior: Behavior,
    /// Baseline social tendencies.
    #[serde(default)]
    pub social: SocialTendencies,
    /// Biography; seeds core long-term memory.
    #[serde(default)]
    pub background: Background,
    /// Detailed personality scalars.
    #[serde(default)]
    pub traits: PersonalityTraits,
    /// Backend personas (e.g. the reviewer) never post.
    #[serde(default = "default_true")]
    pub posts: bool,
}

/// Personality summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Personality {
    /// Free-text type, e.g. "cheerful and curious".
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Free-text trait labels.
    #[serde(default)]
    pub traits: Vec<String>,
    /// Emotional range on a 0–10 scale.
    #[serde(default = "default_emotional_range")]
    pub emotional_range: u8,
}

/// What the persona posts and reacts about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interests {
    /// Main topics.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Keywords used for matching outside posts.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Things the persona likes.
    #[serde(default)]
    pub likes: Vec<String>,
    /// Things the persona avoids.
    #[serde(default)]
    pub dislikes: Vec<String>,
    /// Values the persona holds.
    #[serde(default)]
    pub values: Vec<String>,
}

/// Posting cadence and formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Behavior {
    /// Average posts per day, 1..=100.
    pub post_frequency: u32,
    /// Relative spread of the posting interval, in [0, 1].
    #[serde(default = "default_variance")]
    pub post_frequency_variance: f64,
    /// Local hours (0..=23) in which the persona may post.
    pub active_hours: Vec<u32>,
    /// Weekdays on which the persona may post; empty means every day.
    #[serde(default)]
    pub active_days: Vec<Weekday>,
    /// Daily rhythm.
    #[serde(default)]
    pub chronotype: Chronotype,
    /// Per-hour activation weights in [0, 1].
    #[serde(default)]
    pub hourly_weight: BTreeMap<u32, f64>,
    /// Shortest acceptable post, in characters.
    #[serde(default = "default_length_min")]
    pub post_length_min: usize,
    /// Longest acceptable post, in characters.
    #[serde(default = "default_length_max")]
    pub post_length_max: usize,
    /// Markdown allowed in posts.
    #[serde(default)]
    pub use_markdown: bool,
    /// Code blocks allowed in posts.
    #[serde(default)]
    pub use_code_blocks: bool,
}

/// Baseline social tendencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialTendencies {
    /// Chance of replying to an unrelated post.
    #[serde(default = "default_reply_probability")]
    pub reply_probability: f64,
    /// Chance of reacting to a matching outside post.
    #[serde(default = "default_reaction_probability")]
    pub reaction_probability: f64,
}

impl Default for SocialTendencies {
    fn default() -> Self {
        Self {
            reply_probability: default_reply_probability(),
            reaction_probability: default_reaction_probability(),
        }
    }
}

/// Biography.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Background {
    /// Occupation.
    #[serde(default)]
    pub occupation: String,
    /// Experience lines.
    #[serde(default)]
    pub experience: Vec<String>,
    /// Hobbies.
    #[serde(default)]
    pub hobbies: Vec<String>,
}

fn default_true() -> bool {
    true
}
fn default_emotional_range() -> u8 {
    5
}
fn default_variance() -> f64 {
    0.3
}
fn default_length_min() -> usize {
    20
}
fn default_length_max() -> usize {
    280
}
fn default_reply_probability() -> f64 {
    0.1
}
fn default_reaction_probability() -> f64 {
    0.3
}

impl PersonaProfile {
    /// Parse and validate a profile document.
    ///
    /// # Errors
    /// Returns `NpczError::InvalidProfile` when the document does not parse or
    /// fails [`PersonaProfile::validate`].
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut profile: Self = serde_yaml::from_str(yaml).map_err(|e| NpczError::InvalidProfile {
            persona: "<unparsed>".into(),
            reason: e.to_string(),
        })?;
        profile.validate()?;
        profile.traits = profile.traits.clamped();
        Ok(profile)
    }

    /// Check field ranges.
    ///
    /// # Errors
    /// Returns `NpczError::InvalidProfile` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| {
            Err(NpczError::InvalidProfile {
                persona: self.id.to_string(),
                reason,
            })
        };
        let b = &self.behavior;

        if self.name.trim().is_empty() {
            return fail("name is empty".into());
        }
        if !(1..=100).contains(&b.post_frequency) {
            return fail(format!("post_frequency must be 1..=100, got {}", b.post_frequency));
        }
        if !(0.0..=1.0).contains(&b.post_frequency_variance) {
            return fail(format!(
                "post_frequency_variance must be within [0, 1], got {}",
                b.post_frequency_variance
            ));
        }
        if b.active_hours.is_empty() {
            return fail("active_hours is empty".into());
        }
        if let Some(h) = b.active_hours.iter().find(|h| **h > 23) {
            return fail(format!("active hour out of range: {h}"));
        }
        if b.post_length_min >= b.post_length_max {
            return fail(format!(
                "post_length_max ({}) must exceed post_length_min ({})",
                b.post_length_max, b.post_length_min
            ));
        }
        if let Some((h, w)) = b
            .hourly_weight
            .iter()
            .find(|(h, w)| **h > 23 || !(0.0..=1.0).contains(*w))
        {
            return fail(format!("hourly_weight {h} -> {w} out of range"));
        }
        if self.personality.emotional_range > 10 {
            return fail("emotional_range must be 0..=10".into());
        }
        Ok(())
    }

    /// Whether the persona may act at this weekday and local hour.
    #[must_use]
    pub fn is_active_at(&self, weekday: Weekday, hour: u32) -> bool {
        let days = &self.behavior.active_days;
        (days.is_empty() || days.contains(&weekday)) && self.behavior.active_hours.contains(&hour)
    }

    /// Configured weight for an hour, if any.
    #[must_use]
    pub fn hour_weight(&self, hour: u32) -> Option<f64> {
        self.behavior.hourly_weight.get(&hour).copied()
    }

    /// Everything the persona could post about: topics plus hobbies.
    #[must_use]
    pub fn topic_candidates(&self) -> Vec<&str> {
        self.interests
            .topics
            .iter()
            .chain(self.background.hobbies.iter())
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A minimal valid profile for tests.
    pub fn profile(id: u32) -> PersonaProfile {
        PersonaProfile {
            id: PersonaId(id),
            name: format!("Persona {id}"),
            personality: Personality::default(),
            interests: Interests {
                topics: vec!["rust".into(), "coffee".into()],
                keywords: vec!["compiler".into()],
                ..Interests::default()
            },
            behavior: Behavior {
                post_frequency: 3,
                post_frequency_variance: 0.0,
                active_hours: (0..24).collect(),
                active_days: Vec::new(),
                chronotype: Chronotype::Intermediate,
                hourly_weight: BTreeMap::new(),
                post_length_min: 10,
                post_length_max: 200,
                use_markdown: false,
                use_code_blocks: false,
            },
            social: SocialTendencies::default(),
            background: Background::default(),
            traits: PersonalityTraits::default(),
            posts: true,
        }
    }
}
