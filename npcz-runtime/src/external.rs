//! Responses to accounts outside the roster.
//!
//! Two routes lead to a response. A *watcher* follows one account and
//! answers its posts in a weighted style. Any other post can draw a
//! response when it touches the resident's interests. Either way a
//! resident answers at most `tick.max_external_reactions` posts per tick.

use chrono::{DateTime, Utc};
use npcz_core::interaction::{Temperament, create_mumble_entry, create_reaction_entry, create_reply_entry};
use npcz_core::queue::{MumbleSubject, ReplyTarget, ResponseIndex};
use npcz_core::relationship::graph::WatchReaction;
use npcz_core::relationship::{WatchStyle, Watcher};
use npcz_core::{InteractionKind, Participant, PersonaId, PersonaProfile, QueueEntry, clamp_unit};
use npcz_llm::ContentRules;
use npcz_llm::prompt::PromptId;
use rand::Rng;
use tracing::{debug, warn};

use crate::engine::Engine;
use crate::error::Result;
use crate::interactions::{REPLY_MAX_CHARS, REPLY_MIN_CHARS};
use crate::timeline::ExternalPost;

/// Base response chance for an interesting outside post, before sociability.
const EXTERNAL_BASE: f64 = 0.1;
/// Reaction draw multiplier.
const EXTERNAL_REACTION_FACTOR: f64 = 2.0;
/// Reply draw multiplier.
const EXTERNAL_REPLY_FACTOR: f64 = 0.5;
/// Mumble length bounds.
const MUMBLE_MIN_CHARS: usize = 5;
const MUMBLE_MAX_CHARS: usize = 100;

/// Whether `content` mentions any of the profile's keywords, topics or likes.
#[must_use]
pub fn matches_interests(profile: &PersonaProfile, content: &str) -> bool {
    let lowered = content.to_lowercase();
    if lowered.trim().is_empty() {
        return false;
    }
    let i = &profile.interests;
    i.keywords
        .iter()
        .chain(&i.topics)
        .chain(&i.likes)
        .filter(|w| !w.trim().is_empty())
        .any(|w| lowered.contains(&w.to_lowercase()))
}

/// Decide how a resident with `sociability` responds to an interesting
/// outside post. Outside accounts get a deliberately low rate.
pub fn decide_external<R: Rng + ?Sized>(sociability: f64, rng: &mut R) -> Option<InteractionKind> {
    let base = EXTERNAL_BASE * (0.5 + clamp_unit(sociability));
    if rng.r#gen::<f64>() < base * EXTERNAL_REACTION_FACTOR {
        Some(InteractionKind::Reaction)
    } else if rng.r#gen::<f64>() < base * EXTERNAL_REPLY_FACTOR {
        Some(InteractionKind::Reply)
    } else {
        None
    }
}

/// Pick a watcher response style by weight. No configured styles means a mumble.
pub fn pick_style<R: Rng + ?Sized>(reactions: &[WatchReaction], rng: &mut R) -> WatchStyle {
    let total: f64 = reactions.iter().map(|r| r.probability.max(0.0)).sum();
    if total <= 0.0 {
        return reactions.first().map_or(WatchStyle::Mumble, |r| r.style);
    }
    let mut draw = rng.r#gen::<f64>() * total;
    for r in reactions {
        draw -= r.probability.max(0.0);
        if draw < 0.0 {
            return r.style;
        }
    }
    reactions.last().map_or(WatchStyle::Mumble, |r| r.style)
}

/// What a resident will do with one outside post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExternalAction {
    Reply,
    Reaction,
    Mumble,
}

impl From<WatchStyle> for ExternalAction {
    fn from(style: WatchStyle) -> Self {
        match style {
            WatchStyle::Mumble => Self::Mumble,
            WatchStyle::Comment => Self::Reply,
            WatchStyle::Support => Self::Reaction,
        }
    }
}

impl From<InteractionKind> for ExternalAction {
    fn from(kind: InteractionKind) -> Self {
        match kind {
            InteractionKind::Reply => Self::Reply,
            InteractionKind::Reaction => Self::Reaction,
        }
    }
}

impl Engine {
    /// Let each target resident respond to recent outside posts.
    ///
    /// Returns the number of entries enqueued.
    pub(crate) async fn process_external_reactions(
        &mut self,
        targets: &[PersonaId],
        index: &mut ResponseIndex,
        now: DateTime<Utc>,
    ) -> usize {
        let limit = self.config.tick.external_timeline_limit;
        let posts = match self.timeline.recent_posts(limit).await {
            Ok(posts) => posts,
            Err(e) => {
                warn!(error = %e, "Outside timeline unavailable; external reactions skipped");
                return 0;
            }
        };
        if posts.is_empty() {
            return 0;
        }

        let cap = self.config.tick.max_external_reactions;
        let mut created = 0;
        for &id in targets {
            let Some(profile) = self.roster.get(id).cloned() else {
                continue;
            };
            let watchers: Vec<Watcher> = self.graph.watchers_for(id).cloned().collect();
            let mut answered = 0;

            for post in &posts {
                if answered >= cap {
                    break;
                }
                if post.remote_id.is_empty() || index.already_responded(id, &post.remote_id) {
                    continue;
                }
                let action = match watchers.iter().find(|w| w.target.pubkey == post.pubkey) {
                    Some(watcher) => {
                        if self.rng.r#gen::<f64>() >= watcher.behavior.reaction_probability {
                            continue;
                        }
                        ExternalAction::from(pick_style(&watcher.behavior.reactions, &mut self.rng))
                    }
                    None => {
                        if !matches_interests(&profile, &post.content) {
                            continue;
                        }
                        match decide_external(profile.traits.sociability, &mut self.rng) {
                            Some(kind) => ExternalAction::from(kind),
                            None => continue,
                        }
                    }
                };

                let display_name = watchers
                    .iter()
                    .find(|w| w.target.pubkey == post.pubkey)
                    .map(|w| w.target.display_name.clone())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| post.display_name.clone());
                let entry = match self.external_entry(&profile, post, &display_name, action, now).await {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(persona = %id, remote = %post.remote_id, error = %e, "External response skipped");
                        continue;
                    }
                };
                if let Err(e) = self.enqueue(entry) {
                    warn!(persona = %id, error = %e, "Could not enqueue external response");
                    continue;
                }
                index.record(id, &post.remote_id);
                answered += 1;
                created += 1;
                debug!(persona = %id, remote = %post.remote_id, action = ?action, "External response queued");
            }
        }
        created
    }

    async fn external_entry(
        &mut self,
        profile: &PersonaProfile,
        post: &ExternalPost,
        display_name: &str,
        action: ExternalAction,
        now: DateTime<Utc>,
    ) -> Result<QueueEntry> {
        let target = Participant::External {
            pubkey: post.pubkey.clone(),
        };
        let personality = if profile.personality.kind.is_empty() {
            "ordinary"
        } else {
            profile.personality.kind.as_str()
        };
        match action {
            ExternalAction::Reaction => {
                let temperament = Temperament::classify(profile);
                let symbol =
                    npcz_core::interaction::select_reaction_symbol(&post.content, temperament, &mut self.rng);
                Ok(create_reaction_entry(
                    profile.id,
                    &profile.name,
                    symbol,
                    target,
                    &post.remote_id,
                    Some(post.pubkey.clone()),
                    now,
                ))
            }
            ExternalAction::Reply => {
                let history = npcz_llm::prompt::conversation_section(std::iter::empty::<(&str, &str)>());
                let prompt = PromptId::Reply.render(&[
                    ("name", profile.name.as_str()),
                    ("personality", personality),
                    ("target_content", post.content.as_str()),
                    ("history", history.as_str()),
                    ("relationship", "someone you follow"),
                    ("tone", "polite"),
                    ("closing_hint", ""),
                ]);
                let text = self
                    .compose(profile.id, prompt, ContentRules::plain(REPLY_MIN_CHARS, REPLY_MAX_CHARS))
                    .await?;
                Ok(create_reply_entry(
                    profile.id,
                    &profile.name,
                    &text,
                    ReplyTarget {
                        target,
                        remote_id: post.remote_id.clone(),
                        content: post.content.clone(),
                        pubkey: Some(post.pubkey.clone()),
                    },
                    None,
                    now,
                ))
            }
            ExternalAction::Mumble => {
                let shown_name = if display_name.is_empty() { "someone" } else { display_name };
                let prompt = PromptId::Mumble.render(&[
                    ("name", profile.name.as_str()),
                    ("personality", personality),
                    ("target_name", shown_name),
                    ("target_content", post.content.as_str()),
                ]);
                let text = self
                    .compose(profile.id, prompt, ContentRules::plain(MUMBLE_MIN_CHARS, MUMBLE_MAX_CHARS))
                    .await?;
                Ok(create_mumble_entry(
                    profile.id,
                    &profile.name,
                    &text,
                    MumbleSubject {
                        about: target,
                        display_name: display_name.to_string(),
                        original_content: post.content.clone(),
                        remote_id: Some(post.remote_id.clone()),
                    },
                    now,
                ))
            }
        }
    }
}
