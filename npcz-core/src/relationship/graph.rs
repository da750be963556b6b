//! Relationship graph: groups, typed pairs, and watchers of outside accounts.
//!
//! Loaded from `relationships/{groups,pairs,watchers}.yaml`. The graph is
//! read-only at runtime; mutable per-persona numbers live in
//! [`AffinityRecord`](super::AffinityRecord).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NpczError, Result};
use crate::types::PersonaId;

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// A set of residents who interact as a circle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Group id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Members.
    pub members: Vec<PersonaId>,
    /// Interaction tuning for members.
    #[serde(default)]
    pub interaction: GroupInteraction,
}

/// How members of a group engage with each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInteraction {
    /// Base reply probability between members.
    #[serde(default = "default_group_reply")]
    pub reply_probability: f64,
    /// Base reaction probability between members.
    #[serde(default = "default_group_reaction")]
    pub reaction_probability: f64,
    /// Shared topics.
    #[serde(default)]
    pub topics: Vec<String>,
}

impl Default for GroupInteraction {
    fn default() -> Self {
        Self {
            reply_probability: default_group_reply(),
            reaction_probability: default_group_reaction(),
            topics: Vec::new(),
        }
    }
}

fn default_group_reply() -> f64 {
    0.15
}
fn default_group_reaction() -> f64 {
    0.3
}

// ---------------------------------------------------------------------------
// Pairs
// ---------------------------------------------------------------------------

/// Kind of a one-to-one relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairKind {
    /// Close friends.
    CloseFriends,
    /// Romantic couple.
    Couple,
    /// Siblings.
    Siblings,
    /// Friendly rivals.
    Rivals,
    /// Uncomfortable acquaintances; never engage.
    Awkward,
    /// Mentor and mentee.
    Mentor,
}

impl PairKind {
    /// Starting affinity for a freshly seeded pair, if the kind implies one.
    #[must_use]
    pub fn seed_affinity(self) -> Option<f64> {
        match self {
            Self::CloseFriends => Some(0.5),
            Self::Couple => Some(0.8),
            Self::Siblings => Some(0.6),
            Self::Rivals => Some(0.2),
            Self::Awkward => Some(-0.3),
            Self::Mentor => None,
        }
    }
}

impl fmt::Display for PairKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CloseFriends => "close friends",
            Self::Couple => "couple",
            Self::Siblings => "siblings",
            Self::Rivals => "rivals",
            Self::Awkward => "awkward",
            Self::Mentor => "mentor",
        };
        f.write_str(label)
    }
}

/// A typed relationship between exactly two residents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pair {
    /// Pair id.
    pub id: String,
    /// Relationship kind.
    #[serde(rename = "type")]
    pub kind: PairKind,
    /// The two residents.
    pub members: [PersonaId; 2],
    /// Interaction tuning.
    #[serde(default)]
    pub interaction: PairInteraction,
}

/// How the two residents of a pair engage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairInteraction {
    /// Reply probability; overrides group values upward.
    #[serde(default = "default_pair_reply")]
    pub reply_probability: f64,
    /// Conversational tone hint for prompts.
    #[serde(default = "default_tone")]
    pub tone: String,
    /// Shared topics.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Never engage with each other.
    #[serde(default)]
    pub avoid: bool,
}

impl Default for PairInteraction {
    fn default() -> Self {
        Self {
            reply_probability: default_pair_reply(),
            tone: default_tone(),
            topics: Vec::new(),
            avoid: false,
        }
    }
}

fn default_pair_reply() -> f64 {
    0.2
}
fn default_tone() -> String {
    "friendly".to_string()
}

impl Pair {
    /// Whether `id` is one of the two members.
    #[must_use]
    pub fn involves(&self, id: PersonaId) -> bool {
        self.members.contains(&id)
    }

    /// The other member, if `id` is in this pair.
    #[must_use]
    pub fn partner_of(&self, id: PersonaId) -> Option<PersonaId> {
        match self.members {
            [a, b] if a == id => Some(b),
            [a, b] if b == id => Some(a),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Watchers
// ---------------------------------------------------------------------------

/// A resident that follows one outside account and reacts to its posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watcher {
    /// The watching resident.
    pub resident: PersonaId,
    /// The watched account.
    pub target: WatchTarget,
    /// Reaction tuning.
    #[serde(default)]
    pub behavior: WatchBehavior,
    /// Personality quirks fed into prompts.
    #[serde(default)]
    pub quirks: Vec<String>,
}

/// The outside account a watcher follows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchTarget {
    /// Public key.
    pub pubkey: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
}

/// How a watcher responds to the target's posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchBehavior {
    /// Minutes between timeline checks.
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: u32,
    /// Chance of responding to any given post.
    #[serde(default = "default_watch_reaction")]
    pub reaction_probability: f64,
    /// Weighted response styles.
    #[serde(default)]
    pub reactions: Vec<WatchReaction>,
}

impl Default for WatchBehavior {
    fn default() -> Self {
        Self {
            check_interval_minutes: default_check_interval(),
            reaction_probability: default_watch_reaction(),
            reactions: Vec::new(),
        }
    }
}

fn default_check_interval() -> u32 {
    60
}
fn default_watch_reaction() -> f64 {
    0.3
}

/// Style of a watcher's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchStyle {
    /// A standalone post about the target, not addressed to them.
    Mumble,
    /// A direct reply.
    Comment,
    /// A reaction symbol.
    Support,
}

/// One weighted response style with example lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchReaction {
    /// Style.
    #[serde(rename = "type")]
    pub style: WatchStyle,
    /// Relative weight.
    #[serde(default = "default_watch_reaction")]
    pub probability: f64,
    /// Example lines for prompts.
    #[serde(default)]
    pub examples: Vec<String>,
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// All relationship documents together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipGraph {
    /// Groups.
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Pairs.
    #[serde(default)]
    pub pairs: Vec<Pair>,
    /// Watchers.
    #[serde(default)]
    pub watchers: Vec<Watcher>,
}

impl RelationshipGraph {
    /// Reject structurally impossible documents.
    ///
    /// # Errors
    /// Returns `NpczError::Config` for self-pairs or out-of-range probabilities.
    pub fn validate(&self) -> Result<()> {
        for pair in &self.pairs {
            if pair.members[0] == pair.members[1] {
                return Err(NpczError::Config(format!("pair {} relates a persona to itself", pair.id)));
            }
            if !(0.0..=1.0).contains(&pair.interaction.reply_probability) {
                return Err(NpczError::Config(format!("pair {} reply_probability out of range", pair.id)));
            }
        }
        for group in &self.groups {
            let i = &group.interaction;
            if !(0.0..=1.0).contains(&i.reply_probability) || !(0.0..=1.0).contains(&i.reaction_probability) {
                return Err(NpczError::Config(format!("group {} probabilities out of range", group.id)));
            }
        }
        Ok(())
    }

    /// Groups `id` belongs to.
    pub fn groups_for(&self, id: PersonaId) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(move |g| g.members.contains(&id))
    }

    /// Pairs `id` is part of.
    pub fn pairs_for(&self, id: PersonaId) -> impl Iterator<Item = &Pair> {
        self.pairs.iter().filter(move |p| p.involves(id))
    }

    /// The pair linking `a` and `b`, if any.
    #[must_use]
    pub fn pair_between(&self, a: PersonaId, b: PersonaId) -> Option<&Pair> {
        self.pairs.iter().find(|p| p.involves(a) && p.partner_of(a) == Some(b))
    }

    /// Every resident sharing a group or pair with `id`, excluding `id`.
    #[must_use]
    pub fn related_members(&self, id: PersonaId) -> BTreeSet<PersonaId> {
        let mut related: BTreeSet<PersonaId> = self
            .groups_for(id)
            .flat_map(|g| g.members.iter().copied())
            .collect();
        related.extend(self.pairs_for(id).filter_map(|p| p.partner_of(id)));
        related.remove(&id);
        related
    }

    /// Base probability that `from` replies to `to`.
    ///
    /// Highest value over shared groups; a pair can raise it. An avoiding
    /// pair forces zero.
    #[must_use]
    pub fn reply_probability(&self, from: PersonaId, to: PersonaId) -> f64 {
        let group_max = self
            .groups_for(from)
            .filter(|g| g.members.contains(&to))
            .map(|g| g.interaction.reply_probability)
            .fold(0.0_f64, f64::max);
        match self.pair_between(from, to) {
            Some(pair) if pair.interaction.avoid => 0.0,
            Some(pair) => group_max.max(pair.interaction.reply_probability),
            None => group_max,
        }
    }

    /// Whether `from` must never engage with `to`.
    #[must_use]
    pub fn should_avoid(&self, from: PersonaId, to: PersonaId) -> bool {
        self.pair_between(from, to)
            .is_some_and(|p| p.kind == PairKind::Awkward || p.interaction.avoid)
    }

    /// Human-readable description of how `from` relates to `to`, for prompts.
    #[must_use]
    pub fn relationship_label(&self, from: PersonaId, to: PersonaId) -> Option<String> {
        if let Some(pair) = self.pair_between(from, to) {
            return Some(pair.kind.to_string());
        }
        self.groups_for(from)
            .find(|g| g.members.contains(&to))
            .map(|g| format!("fellow member of {}", if g.name.is_empty() { &g.id } else { &g.name }))
    }

    /// Tone hint for `from` talking to `to`.
    #[must_use]
    pub fn tone(&self, from: PersonaId, to: PersonaId) -> Option<&str> {
        self.pair_between(from, to).map(|p| p.interaction.tone.as_str())
    }

    /// Watch entries owned by `id`.
    pub fn watchers_for(&self, id: PersonaId) -> impl Iterator<Item = &Watcher> {
        self.watchers.iter().filter(move |w| w.resident == id)
    }
}
