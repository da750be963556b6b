//! Interaction manager: turns relationships into reply, reaction and
//! continue-conversation decisions, and builds the resulting queue entries.

pub mod reaction;

pub use reaction::{Temperament, select_reaction_symbol};

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::trace;

use crate::queue::{
    Conversation, ConversationMessage, MumbleSubject, PostPayload, QueueEntry, ReplyTarget,
};
use crate::relationship::RelationshipGraph;
use crate::types::{InteractionKind, Participant, PersonaId, clamp_unit, short_id};

/// Ignore probability per conversation depth, starting at depth 1.
const IGNORE_BY_DEPTH: [f64; 4] = [0.10, 0.30, 0.60, 0.85];
/// Ignore probability from depth 5 on, and the cap after affinity scaling.
pub const MAX_IGNORE_PROBABILITY: f64 = 0.95;
/// Affinity above which residents engage more.
const WARM_AFFINITY: f64 = 0.7;
/// Affinity below which residents engage less.
const COOL_AFFINITY: f64 = 0.3;
/// Reaction draw is this much more permissive than the reply draw.
const REACTION_FACTOR: f64 = 1.5;

/// Phrases that wrap a conversation up.
const CLOSING_PHRASES: &[&str] = &[
    "ありがとう",
    "サンキュー",
    "thx",
    "了解",
    "おk",
    "がんばって",
    "がんばる",
    "またね",
    "じゃあね",
    "うん！",
    "そうだね",
    "なるほど",
    "thanks",
    "thank you",
    "see you",
    "got it",
    "good luck",
];

/// Probability that a reply at `depth` goes unanswered.
///
/// Zero for a root post, non-decreasing with depth, capped at 0.95.
#[must_use]
pub fn calculate_ignore_probability(depth: u32) -> f64 {
    match depth {
        0 => 0.0,
        d => IGNORE_BY_DEPTH
            .get(d as usize - 1)
            .copied()
            .unwrap_or(MAX_IGNORE_PROBABILITY),
    }
}

/// Whether `content` contains a conversation-closing phrase.
#[must_use]
pub fn is_closing_message(content: &str) -> bool {
    let lowered = content.to_lowercase();
    CLOSING_PHRASES.iter().any(|p| lowered.contains(p))
}

fn affinity_scale(affinity: f64, warm: f64, cool: f64) -> f64 {
    if affinity > WARM_AFFINITY {
        warm
    } else if affinity < COOL_AFFINITY {
        cool
    } else {
        1.0
    }
}

/// Relationship-driven engagement decisions.
#[derive(Debug, Clone, Copy)]
pub struct InteractionManager<'a> {
    graph: &'a RelationshipGraph,
}

impl<'a> InteractionManager<'a> {
    /// Manager over a loaded graph.
    #[must_use]
    pub fn new(graph: &'a RelationshipGraph) -> Self {
        Self { graph }
    }

    /// The underlying graph.
    #[must_use]
    pub fn graph(&self) -> &'a RelationshipGraph {
        self.graph
    }

    /// Decide whether `from` responds to a post by `to`, and how.
    ///
    /// Self-posts and avoided pairs never get a response. The graph's reply
    /// probability is scaled by affinity and sociability; one draw decides a
    /// reply, and on failure a second, more permissive draw decides a reaction.
    pub fn should_react_to_post<R: Rng>(
        &self,
        from: PersonaId,
        to: PersonaId,
        content: &str,
        affinity: f64,
        sociability: f64,
        rng: &mut R,
    ) -> Option<InteractionKind> {
        if from == to || content.trim().is_empty() || self.graph.should_avoid(from, to) {
            return None;
        }
        let p = self.graph.reply_probability(from, to)
            * affinity_scale(affinity, 1.3, 0.7)
            * (0.5 + clamp_unit(sociability));

        let decision = if rng.r#gen::<f64>() < p {
            Some(InteractionKind::Reply)
        } else if rng.r#gen::<f64>() < p * REACTION_FACTOR {
            Some(InteractionKind::Reaction)
        } else {
            None
        };
        trace!(%from, %to, p, ?decision, "Reaction decision");
        decision
    }

    /// Decide whether `from` answers `to`'s message at `depth` in a thread.
    ///
    /// Closing phrases always end the thread. Otherwise the depth-based
    /// ignore probability is scaled by affinity and capped at 0.95.
    pub fn should_continue_conversation<R: Rng>(
        &self,
        from: PersonaId,
        to: PersonaId,
        incoming: &str,
        depth: u32,
        affinity: f64,
        rng: &mut R,
    ) -> bool {
        if from == to || is_closing_message(incoming) || self.graph.should_avoid(from, to) {
            return false;
        }
        let ignore = (calculate_ignore_probability(depth) * affinity_scale(affinity, 0.7, 1.3))
            .min(MAX_IGNORE_PROBABILITY);
        rng.r#gen::<f64>() > ignore
    }
}

// ---------------------------------------------------------------------------
// Entry builders
// ---------------------------------------------------------------------------

/// Build a reply entry.
///
/// Without prior context a new thread starts at depth 1 with the target post
/// as its root; otherwise the target is appended to the history and the
/// depth grows by one.
#[must_use]
pub fn create_reply_entry(
    author: PersonaId,
    author_name: &str,
    content: &str,
    reply_to: ReplyTarget,
    prior: Option<&Conversation>,
    now: DateTime<Utc>,
) -> QueueEntry {
    let conversation = match prior {
        None => Conversation {
            thread_id: short_id(),
            depth: 1,
            history: vec![ConversationMessage {
                author: reply_to.target.clone(),
                content: reply_to.content.clone(),
                depth: 0,
            }],
        },
        Some(prior) => {
            let mut history = prior.history.clone();
            history.push(ConversationMessage {
                author: reply_to.target.clone(),
                content: reply_to.content.clone(),
                depth: prior.depth,
            });
            Conversation {
                thread_id: prior.thread_id.clone(),
                depth: prior.depth + 1,
                history,
            }
        }
    };
    QueueEntry::new(
        author,
        author_name,
        content,
        PostPayload::Reply {
            reply_to,
            conversation: Some(conversation),
        },
        now,
    )
}

/// Build a reaction entry carrying `symbol`.
#[must_use]
pub fn create_reaction_entry(
    author: PersonaId,
    author_name: &str,
    symbol: &str,
    target: Participant,
    remote_id: &str,
    pubkey: Option<String>,
    now: DateTime<Utc>,
) -> QueueEntry {
    QueueEntry::new(
        author,
        author_name,
        symbol,
        PostPayload::Reaction {
            reply_to: ReplyTarget {
                target,
                remote_id: remote_id.to_string(),
                content: String::new(),
                pubkey,
            },
        },
        now,
    )
}

/// Build a mumble entry: a standalone remark about someone.
#[must_use]
pub fn create_mumble_entry(
    author: PersonaId,
    author_name: &str,
    content: &str,
    about: MumbleSubject,
    now: DateTime<Utc>,
) -> QueueEntry {
    QueueEntry::new(author, author_name, content, PostPayload::Mumble { about }, now)
}
