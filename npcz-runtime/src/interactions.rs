//! Resident-to-resident interactions: reactions to fresh posts and
//! reply-chain continuation.
//!
//! Only posts still inside the response window (`affinity.ignored_after_hours`)
//! are considered. Once the window closes the ignored-post pass settles them.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use npcz_core::interaction::{Temperament, create_reaction_entry, create_reply_entry, select_reaction_symbol};
use npcz_core::queue::{Conversation, PostType, ReplyTarget, ResponseIndex};
use npcz_core::relationship::apply_interaction;
use npcz_core::{InteractionKind, InteractionManager, Participant, PersonaId, QueueEntry, QueueStatus};
use npcz_llm::prompt::{self, PromptId};
use npcz_llm::validate::{self, ContentRules};
use npcz_llm::{GenerationOutcome, RetryPolicy};
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::Result;
use crate::generation::outcome_error;

/// Shortest acceptable reply.
pub const REPLY_MIN_CHARS: usize = 5;
/// Longest acceptable reply.
pub const REPLY_MAX_CHARS: usize = 140;

impl Engine {
    /// Posted entries of `kind` still inside the response window, oldest first.
    pub(crate) fn fresh_posts(&self, kind: PostType, now: DateTime<Utc>) -> Vec<QueueEntry> {
        let cutoff = now - Duration::hours(self.config.affinity.ignored_after_hours);
        let mut posts: Vec<QueueEntry> = self
            .queue
            .all(QueueStatus::Posted)
            .into_iter()
            .filter(|e| e.post_type() == kind && e.remote_id.is_some())
            .filter(|e| e.posted_at.is_some_and(|at| at >= cutoff))
            .collect();
        posts.sort_by_key(|e| e.posted_at);
        posts
    }

    /// Generate short text for `id` from a fixed prompt, without the
    /// similarity self-check.
    pub(crate) async fn compose(&self, id: PersonaId, prompt: String, rules: ContentRules) -> Result<String> {
        let generator = Arc::clone(&self.generator);
        let outcome = RetryPolicy::new(self.config.content.retry_count)
            .run(
                generator.as_ref(),
                Some(rules.max_length),
                |_| prompt.clone(),
                |raw| {
                    let cleaned = validate::clean(raw, &rules);
                    validate::validate(&cleaned, &rules)?;
                    Ok(validate::adjust_length(&cleaned, rules.max_length))
                },
            )
            .await;
        match outcome {
            GenerationOutcome::Success { content, .. } => Ok(content),
            other => Err(outcome_error(id, other)),
        }
    }

    async fn compose_reply(
        &self,
        responder: PersonaId,
        author: PersonaId,
        target_content: &str,
        conversation: Option<&Conversation>,
    ) -> Result<String> {
        let Some(profile) = self.roster.get(responder) else {
            return Err(npcz_core::NpczError::PersonaNotFound(responder).into());
        };
        let personality = if profile.personality.kind.is_empty() {
            "ordinary".to_string()
        } else {
            profile.personality.kind.clone()
        };
        let name = profile.name.clone();
        let relationship = self
            .graph
            .relationship_label(responder, author)
            .unwrap_or_else(|| "acquaintance".to_string());
        let tone = self
            .graph
            .tone(responder, author)
            .filter(|t| !t.is_empty())
            .unwrap_or("friendly")
            .to_string();
        let names: Vec<(String, String)> = conversation
            .map(|c| {
                c.history
                    .iter()
                    .map(|m| {
                        let who = m
                            .author
                            .resident()
                            .map_or_else(|| m.author.to_string(), |id| self.roster.display_name(id));
                        (who, m.content.clone())
                    })
                    .collect()
            })
            .unwrap_or_default();
        let history = prompt::conversation_section(names.iter().map(|(a, c)| (a.as_str(), c.as_str())));
        let depth = conversation.map_or(0, |c| c.depth);

        let text = PromptId::Reply.render(&[
            ("name", name.as_str()),
            ("personality", personality.as_str()),
            ("target_content", target_content),
            ("history", history.as_str()),
            ("relationship", relationship.as_str()),
            ("tone", tone.as_str()),
            ("closing_hint", prompt::closing_hint(depth)),
        ]);
        self.compose(responder, text, ContentRules::plain(REPLY_MIN_CHARS, REPLY_MAX_CHARS))
            .await
    }

    /// Apply a reply or reaction from `responder` to `author`'s post.
    ///
    /// Both affinity records move, the author's mood rises and memory of
    /// the post is reinforced and possibly promoted.
    pub(crate) fn apply_feedback(
        &self,
        author: PersonaId,
        responder: PersonaId,
        kind: InteractionKind,
        post: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let settings = &self.config.affinity;
        let mut author_record = self.store.load_affinity(author);
        let mut responder_record = self.store.load_affinity(responder);
        apply_interaction(&mut author_record, &mut responder_record, kind, settings, now);
        self.store.save_affinity(&author_record)?;
        self.store.save_affinity(&responder_record)?;

        let mut state = self.store.load_state(author);
        state.apply_feedback(kind, settings);
        self.store.save_state(&state)?;

        if let Some(profile) = self.roster.get(author) {
            let memory_settings = &self.config.memory;
            let mut memory = self.store.load_memory(profile);
            let reinforced =
                memory.reinforce_from_feedback(post, kind, profile.traits.feedback_sensitivity, memory_settings);
            let promoted = memory.check_and_promote(memory_settings.promotion_threshold, now, memory_settings);
            if reinforced || !promoted.is_empty() {
                memory.updated_at = Some(now);
                self.store.save_memory(&memory)?;
            }
            for content in &promoted {
                info!(persona = %author, memory = %content, "Promoted to long-term memory");
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reactions to standalone posts
    // -----------------------------------------------------------------------

    /// Let each target resident respond to other residents' fresh posts.
    ///
    /// Returns the number of replies and reactions enqueued.
    pub(crate) async fn process_interactions(
        &mut self,
        targets: &[PersonaId],
        index: &mut ResponseIndex,
        now: DateTime<Utc>,
    ) -> usize {
        let posts = self.fresh_posts(PostType::Normal, now);
        if posts.is_empty() {
            return 0;
        }
        let mut created = 0;
        for &responder in targets {
            let Some(profile) = self.roster.get(responder) else {
                continue;
            };
            let sociability = profile.traits.sociability;
            let temperament = Temperament::classify(profile);
            let name = profile.name.clone();
            let record = self.store.load_affinity(responder);

            for post in &posts {
                let Some(remote_id) = post.remote_id.as_deref() else {
                    continue;
                };
                if post.author == responder
                    || !self.roster.contains(post.author)
                    || index.already_responded(responder, remote_id)
                {
                    continue;
                }
                let decision = InteractionManager::new(&self.graph).should_react_to_post(
                    responder,
                    post.author,
                    &post.content,
                    record.affinity(post.author),
                    sociability,
                    &mut self.rng,
                );
                let Some(kind) = decision else {
                    continue;
                };

                let entry = match kind {
                    InteractionKind::Reply => {
                        match self.compose_reply(responder, post.author, &post.content, None).await {
                            Ok(text) => create_reply_entry(
                                responder,
                                &name,
                                &text,
                                ReplyTarget {
                                    target: Participant::Resident(post.author),
                                    remote_id: remote_id.to_string(),
                                    content: post.content.clone(),
                                    pubkey: None,
                                },
                                None,
                                now,
                            ),
                            Err(e) => {
                                warn!(persona = %responder, target = %post.author, error = %e, "Reply skipped");
                                continue;
                            }
                        }
                    }
                    InteractionKind::Reaction => {
                        let symbol = select_reaction_symbol(&post.content, temperament, &mut self.rng);
                        create_reaction_entry(
                            responder,
                            &name,
                            symbol,
                            Participant::Resident(post.author),
                            remote_id,
                            None,
                            now,
                        )
                    }
                };

                if let Err(e) = self.enqueue(entry) {
                    warn!(persona = %responder, error = %e, "Could not enqueue interaction");
                    continue;
                }
                index.record(responder, remote_id);
                created += 1;
                debug!(persona = %responder, target = %post.author, kind = %kind, "Interaction queued");
                if let Err(e) = self.apply_feedback(post.author, responder, kind, &post.content, now) {
                    warn!(persona = %post.author, error = %e, "Feedback not saved");
                }
            }
        }
        created
    }

    // -----------------------------------------------------------------------
    // Reply chains
    // -----------------------------------------------------------------------

    /// Let each target resident answer fresh replies addressed to them.
    ///
    /// Returns the number of follow-up replies enqueued.
    pub(crate) async fn process_reply_chains(
        &mut self,
        targets: &[PersonaId],
        index: &mut ResponseIndex,
        now: DateTime<Utc>,
    ) -> usize {
        let replies = self.fresh_posts(PostType::Reply, now);
        let mut created = 0;
        for incoming in &replies {
            let Some(responder) = incoming
                .reply_target()
                .and_then(|t| t.target.resident())
                .filter(|id| targets.contains(id))
            else {
                continue;
            };
            let Some(remote_id) = incoming.remote_id.as_deref() else {
                continue;
            };
            if incoming.author == responder || index.already_responded(responder, remote_id) {
                continue;
            }
            let depth = incoming.conversation().map_or(1, |c| c.depth);
            let affinity = self.store.load_affinity(responder).affinity(incoming.author);
            let answer = InteractionManager::new(&self.graph).should_continue_conversation(
                responder,
                incoming.author,
                &incoming.content,
                depth,
                affinity,
                &mut self.rng,
            );
            if !answer {
                debug!(persona = %responder, depth, "Thread left to rest");
                continue;
            }

            let text = match self
                .compose_reply(responder, incoming.author, &incoming.content, incoming.conversation())
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    warn!(persona = %responder, error = %e, "Follow-up reply skipped");
                    continue;
                }
            };
            let name = self.roster.display_name(responder);
            let entry = create_reply_entry(
                responder,
                &name,
                &text,
                ReplyTarget {
                    target: Participant::Resident(incoming.author),
                    remote_id: remote_id.to_string(),
                    content: incoming.content.clone(),
                    pubkey: None,
                },
                incoming.conversation(),
                now,
            );
            if let Err(e) = self.enqueue(entry) {
                warn!(persona = %responder, error = %e, "Could not enqueue follow-up reply");
                continue;
            }
            index.record(responder, remote_id);
            created += 1;
            debug!(persona = %responder, target = %incoming.author, depth = depth + 1, "Thread continued");
            if let Err(e) = self.apply_feedback(incoming.author, responder, InteractionKind::Reply, &incoming.content, now) {
                warn!(persona = %incoming.author, error = %e, "Feedback not saved");
            }
        }
        created
    }
}
