//! Core types shared across every NPCZ module.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::NpczError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identity of a resident persona.
///
/// Rendered canonically as `npc001` (three-digit zero padded) in every
/// document, file name and map key. Ordering follows the numeric value, so a
/// sorted roster is processed in ascending id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersonaId(pub u32);

impl PersonaId {
    /// Canonical prefix used by the document schema.
    pub const PREFIX: &'static str = "npc";

    /// Construct from the numeric part.
    #[must_use]
    pub fn new(n: u32) -> Self {
        Self(n)
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", Self::PREFIX, self.0)
    }
}

impl FromStr for PersonaId {
    type Err = NpczError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| NpczError::Config(format!("persona id must start with 'npc': {s}")))?;
        digits
            .parse::<u32>()
            .map(Self)
            .map_err(|e| NpczError::Config(format!("bad persona id {s}: {e}")))
    }
}

impl Serialize for PersonaId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PersonaId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Author of a post: one of our residents, or an outside account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Participant {
    /// A simulated persona.
    Resident(PersonaId),
    /// An account outside the roster, identified by its public key.
    External {
        /// Public key on the social network.
        pubkey: String,
    },
}

impl Participant {
    const EXTERNAL_PREFIX: &'static str = "external:";

    /// The resident id, if this participant is a resident.
    #[must_use]
    pub fn resident(&self) -> Option<PersonaId> {
        match self {
            Self::Resident(id) => Some(*id),
            Self::External { .. } => None,
        }
    }
}

impl From<PersonaId> for Participant {
    fn from(id: PersonaId) -> Self {
        Self::Resident(id)
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resident(id) => write!(f, "{id}"),
            Self::External { pubkey } => write!(f, "{}{pubkey}", Self::EXTERNAL_PREFIX),
        }
    }
}

impl FromStr for Participant {
    type Err = NpczError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(Self::EXTERNAL_PREFIX) {
            Some(pubkey) if !pubkey.is_empty() => Ok(Self::External {
                pubkey: pubkey.to_string(),
            }),
            Some(_) => Err(NpczError::Config("external participant without pubkey".into())),
            None => s.parse().map(Self::Resident),
        }
    }
}

impl Serialize for Participant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Participant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Short random identifier: the first eight hex characters of a v4 UUID.
///
/// Used for queue entry ids and conversation thread ids.
#[must_use]
pub fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

// ---------------------------------------------------------------------------
// Behavioural enums
// ---------------------------------------------------------------------------

/// The two kinds of downstream response a post can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    /// A threaded text reply.
    Reply,
    /// A lightweight reaction symbol.
    Reaction,
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reply => f.write_str("reply"),
            Self::Reaction => f.write_str("reaction"),
        }
    }
}

/// Daily activity rhythm of a persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chronotype {
    /// Morning person: most active 05–12h.
    Lark,
    /// Night person: most active 22–05h.
    Owl,
    /// No pronounced rhythm.
    #[default]
    Intermediate,
}

// ---------------------------------------------------------------------------
// Personality
// ---------------------------------------------------------------------------

/// Detailed personality scalars, each in [0.0, 1.0].
///
/// Missing fields default to 0.5 so partially specified profiles load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalityTraits {
    /// Drive to post frequently.
    #[serde(default = "half")]
    pub activeness: f64,
    /// Tendency to explore new topics.
    #[serde(default = "half")]
    pub curiosity: f64,
    /// Tendency to engage with others.
    #[serde(default = "half")]
    pub sociability: f64,
    /// Emotional reactivity.
    #[serde(default = "half")]
    pub sensitivity: f64,
    /// Positive outlook.
    #[serde(default = "half")]
    pub optimism: f64,
    /// Inventiveness of content.
    #[serde(default = "half")]
    pub creativity: f64,
    /// Likelihood to stick with a topic.
    #[serde(default = "half")]
    pub persistence: f64,
    /// Verbosity and emoji use.
    #[serde(default = "half")]
    pub expressiveness: f64,
    /// Depth of domain knowledge.
    #[serde(default = "half")]
    pub expertise: f64,
    /// General reasoning ability.
    #[serde(default = "half")]
    pub intelligence: f64,
    /// How strongly replies and reactions reinforce memory.
    #[serde(default = "half")]
    pub feedback_sensitivity: f64,
}

fn half() -> f64 {
    0.5
}

impl Default for PersonalityTraits {
    fn default() -> Self {
        Self {
            activeness: 0.5,
            curiosity: 0.5,
            sociability: 0.5,
            sensitivity: 0.5,
            optimism: 0.5,
            creativity: 0.5,
            persistence: 0.5,
            expressiveness: 0.5,
            expertise: 0.5,
            intelligence: 0.5,
            feedback_sensitivity: 0.5,
        }
    }
}

impl PersonalityTraits {
    /// Return a copy with every scalar clamped to [0, 1].
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            activeness: clamp_unit(self.activeness),
            curiosity: clamp_unit(self.curiosity),
            sociability: clamp_unit(self.sociability),
            sensitivity: clamp_unit(self.sensitivity),
            optimism: clamp_unit(self.optimism),
            creativity: clamp_unit(self.creativity),
            persistence: clamp_unit(self.persistence),
            expressiveness: clamp_unit(self.expressiveness),
            expertise: clamp_unit(self.expertise),
            intelligence: clamp_unit(self.intelligence),
            feedback_sensitivity: clamp_unit(self.feedback_sensitivity),
        }
    }
}

// ---------------------------------------------------------------------------
// Clamping helpers
// ---------------------------------------------------------------------------

/// Clamp to [0, 1]. NaN collapses to 0.
#[must_use]
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Clamp to [-1, 1]. NaN collapses to 0.
#[must_use]
pub fn clamp_signed(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) }
}
