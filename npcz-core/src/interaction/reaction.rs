//! Reaction symbol selection and the temperament it depends on.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::persona::PersonaProfile;

/// Coarse temperament derived from a profile's personality description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Temperament {
    /// Bright, upbeat.
    Cheerful,
    /// Calm, analytical.
    Cool,
    /// Fiery, enthusiastic.
    Passionate,
    /// Quiet, reserved.
    Shy,
    /// Relaxed, unhurried.
    LaidBack,
    /// Sincere, diligent.
    Earnest,
    /// Nothing distinctive.
    Plain,
}

const TEMPERAMENT_KEYWORDS: &[(Temperament, &[&str])] = &[
    (Temperament::Cheerful, &["陽気", "明るい", "楽観", "cheerful", "upbeat", "optimistic"]),
    (Temperament::Cool, &["クール", "冷静", "論理", "cool", "calm", "logical"]),
    (Temperament::Passionate, &["熱血", "情熱", "積極", "passionate", "fiery", "energetic"]),
    (Temperament::Shy, &["内向", "静か", "控えめ", "shy", "quiet", "introvert"]),
    (Temperament::LaidBack, &["のんびり", "ゆったり", "マイペース", "laid-back", "relaxed", "easygoing"]),
    (Temperament::Earnest, &["真面目", "誠実", "堅実", "earnest", "serious", "diligent"]),
];

impl Temperament {
    /// Classify by personality type first, then by trait labels.
    #[must_use]
    pub fn classify(profile: &PersonaProfile) -> Self {
        let kind = profile.personality.kind.to_lowercase();
        if let Some(t) = Self::match_text(&kind) {
            return t;
        }
        profile
            .personality
            .traits
            .iter()
            .find_map(|t| Self::match_text(&t.to_lowercase()))
            .unwrap_or(Self::Plain)
    }

    fn match_text(text: &str) -> Option<Self> {
        TEMPERAMENT_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| text.contains(w)))
            .map(|(t, _)| *t)
    }

    /// Default reaction symbols for this temperament.
    #[must_use]
    pub fn palette(self) -> &'static [&'static str] {
        match self {
            Self::Cheerful => &["❤️", "✨", "🎉", "👍"],
            Self::Earnest => &["👍", "✅", "📝"],
            Self::Cool => &["👍", "👀"],
            Self::Passionate => &["🔥", "💪", "👊"],
            Self::LaidBack => &["☺️", "🌸", "✨"],
            Self::Shy => &["👍", "✨"],
            Self::Plain => &["👍", "❤️", "✨"],
        }
    }
}

const CONTENT_PALETTES: &[(&[&str], &[&str])] = &[
    (
        &["完成", "できた", "リリース", "公開", "finished", "released", "shipped", "launched"],
        &["🎉", "👏", "🙌", "✨"],
    ),
    (
        &["難しい", "困った", "つらい", "大変", "stuck", "struggling", "tough", "hard time"],
        &["💪", "🤔", "😢", "頑張れ"],
    ),
    (
        &["新しい", "始めた", "挑戦", "new", "started", "trying"],
        &["👀", "✨", "🔥", "💪"],
    ),
];

/// Pick a reaction symbol for `content`.
///
/// Milestone, struggle and novelty vocabulary take precedence over the
/// reactor's temperament palette.
pub fn select_reaction_symbol<R: Rng>(content: &str, temperament: Temperament, rng: &mut R) -> &'static str {
    let lowered = content.to_lowercase();
    let palette = CONTENT_PALETTES
        .iter()
        .find(|(words, _)| words.iter().any(|w| lowered.contains(w)))
        .map_or_else(|| temperament.palette(), |(_, symbols)| *symbols);
    palette.choose(rng).copied().unwrap_or("👍")
}
