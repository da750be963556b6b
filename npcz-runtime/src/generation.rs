//! The generation turn: one standalone post for one persona.
//!
//! Series start → prompt → generate under the retry policy (clean, validate,
//! adjust length, similarity self-check) → memory update → enqueue.

use npcz_core::config::{ContentSettings, MemorySettings};
use npcz_core::memory::SeriesProgress;
use npcz_core::queue::PostPayload;
use npcz_core::{NpczError, PersonaId, PersonaMemory, PersonaProfile, PersonaState, QueueEntry, QueueStatus, scheduler};
use npcz_llm::prompt::{self, PromptId};
use npcz_llm::validate::{self, ContentRules, Rejection};
use npcz_llm::{GenerationOutcome, RetryPolicy};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::{Result, RuntimeError};

/// Topic used when a persona has nothing else to talk about.
const FALLBACK_TOPIC: &str = "everyday life";
/// Theme used for a series when a persona has no topics.
const FALLBACK_THEME: &str = "daily life";
/// Active interests mentioned in a post prompt.
const CONTEXT_INTERESTS: usize = 3;
/// Recent posts shown to the model as things not to repeat.
const PROMPT_HISTORY: usize = 5;

/// Formatting and length rules for a persona's standalone posts.
#[must_use]
pub fn rules_for(profile: &PersonaProfile) -> ContentRules {
    ContentRules {
        use_markdown: profile.behavior.use_markdown,
        use_code_blocks: profile.behavior.use_code_blocks,
        min_length: profile.behavior.post_length_min,
        max_length: profile.behavior.post_length_max,
    }
}

/// Pick a topic from profile topics, discovered topics and active interests.
pub fn select_topic<R: Rng>(
    profile: &PersonaProfile,
    state: &PersonaState,
    memory: &PersonaMemory,
    settings: &MemorySettings,
    rng: &mut R,
) -> String {
    let mut topics: Vec<&str> = profile.interests.topics.iter().map(String::as_str).collect();
    topics.extend(state.discovered_topics.iter().map(String::as_str));
    topics.extend(memory.active_interests(settings));
    topics.choose(rng).map_or_else(|| FALLBACK_TOPIC.to_string(), |t| (*t).to_string())
}

/// Maybe begin a series on an idle persona. Returns the theme and length.
pub fn maybe_start_series<R: Rng>(
    memory: &mut PersonaMemory,
    profile: &PersonaProfile,
    settings: &ContentSettings,
    rng: &mut R,
) -> Option<(String, u32)> {
    if memory.series.active || rng.r#gen::<f64>() >= settings.series_start_probability {
        return None;
    }
    let theme = profile
        .interests
        .topics
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| FALLBACK_THEME.to_string());
    let total = rng.gen_range(settings.series_min_parts..=settings.series_max_parts);
    memory.start_series(theme.clone(), total).then_some((theme, total))
}

fn length_hint(max_length: usize) -> &'static str {
    match max_length {
        0..=100 => "One or two short sentences.",
        101..=200 => "A few sentences.",
        _ => "Several sentences are fine.",
    }
}

fn personality_line(profile: &PersonaProfile) -> String {
    let p = &profile.personality;
    match (p.kind.is_empty(), p.traits.is_empty()) {
        (true, true) => "ordinary".to_string(),
        (false, true) => p.kind.clone(),
        (true, false) => p.traits.join(", "),
        (false, false) => format!("{} ({})", p.kind, p.traits.join(", ")),
    }
}

fn context_section(memory: &PersonaMemory, settings: &MemorySettings) -> String {
    let mut out = String::new();
    let interests: Vec<&str> = memory
        .active_interests(settings)
        .into_iter()
        .take(CONTEXT_INTERESTS)
        .collect();
    if !interests.is_empty() {
        out.push_str("\nRecently interested in: ");
        out.push_str(&interests.join(", "));
    }
    if let Some(m) = memory
        .long_term
        .acquired
        .iter()
        .max_by(|a, b| a.importance.total_cmp(&b.importance))
    {
        out.push_str("\nSomething you remember: ");
        out.push_str(&m.content);
    }
    if !memory.long_term.core.occupation.is_empty() {
        out.push_str("\nYour work: ");
        out.push_str(&memory.long_term.core.occupation);
    }
    out
}

/// Everything a post prompt needs besides the topic.
struct PromptInputs {
    name: String,
    personality: String,
    context: String,
    preferences: String,
    history: String,
    feedback: String,
    max_length: usize,
}

impl PromptInputs {
    fn post(&self, topic: &str) -> String {
        let max_length = self.max_length.to_string();
        PromptId::Post.render(&[
            ("name", self.name.as_str()),
            ("personality", self.personality.as_str()),
            ("topic", topic),
            ("context", self.context.as_str()),
            ("max_length", max_length.as_str()),
            ("length_hint", length_hint(self.max_length)),
            ("preferences", self.preferences.as_str()),
            ("history", self.history.as_str()),
            ("feedback", self.feedback.as_str()),
        ])
    }

    fn series(&self, memory: &PersonaMemory) -> String {
        let series = &memory.series;
        let part = series.next_part().to_string();
        let total = series.total_planned.to_string();
        let previous = prompt::series_section(&series.posts);
        let max_length = self.max_length.to_string();
        PromptId::SeriesPost.render(&[
            ("name", self.name.as_str()),
            ("personality", self.personality.as_str()),
            ("part", part.as_str()),
            ("total", total.as_str()),
            ("theme", series.theme.as_str()),
            ("previous", previous.as_str()),
            ("max_length", max_length.as_str()),
        ])
    }
}

/// Clean, validate, trim and self-check one raw draft.
///
/// # Errors
/// Returns the [`Rejection`] that sends the turn back for another attempt.
pub fn check_draft(
    raw: &str,
    rules: &ContentRules,
    recent: &[String],
    settings: &ContentSettings,
) -> std::result::Result<String, Rejection> {
    let cleaned = validate::clean(raw, rules);
    validate::validate(&cleaned, rules)?;
    let adjusted = validate::adjust_length(&cleaned, rules.max_length);
    if let Some(ratio) = validate::too_similar(
        &adjusted,
        recent,
        settings.history_check_count,
        settings.similarity_threshold,
    ) {
        return Err(Rejection::TooSimilar { ratio });
    }
    Ok(adjusted)
}

/// Turn a non-success outcome into the runtime error for `persona`.
pub(crate) fn outcome_error(persona: PersonaId, outcome: GenerationOutcome) -> RuntimeError {
    let (attempts, reason) = match outcome {
        GenerationOutcome::Success { attempts, .. } => (attempts, "no content".to_string()),
        GenerationOutcome::ValidationFailed { attempts, rejection } => (attempts, rejection.to_string()),
        GenerationOutcome::Exhausted { attempts, error } => (attempts, error),
    };
    RuntimeError::Generation {
        persona,
        attempts,
        reason,
    }
}

impl Engine {
    /// Generate one standalone post for `id` and enqueue it.
    ///
    /// The entry lands in PENDING, or DRY_RUN in dry-run mode. The persona's
    /// memory is updated and its next post time is rescheduled.
    ///
    /// # Errors
    /// [`RuntimeError::BacklogFull`] while the approved backlog is over its cap;
    /// [`RuntimeError::Generation`] when every attempt failed; core errors if
    /// the persona is unknown or documents cannot be written.
    pub async fn generate_for(&mut self, id: PersonaId) -> Result<QueueEntry> {
        let now = self.now();
        let cap = self.config.queue.approved_backlog_cap;
        let approved = self.queue.count(QueueStatus::Approved);
        if approved > cap {
            return Err(RuntimeError::BacklogFull { count: approved, cap });
        }

        let profile = self.roster.get(id).cloned().ok_or(NpczError::PersonaNotFound(id))?;
        let mut state = self.store.load_state(id);
        let mut memory = self.store.load_memory(&profile);

        if let Some((theme, total)) =
            maybe_start_series(&mut memory, &profile, &self.config.content, &mut self.rng)
        {
            info!(persona = %id, theme = %theme, total, "Series started");
        }

        let rejected: Vec<(String, String)> = self
            .queue
            .recent_rejected(id, self.config.queue.rejected_feedback_count)
            .into_iter()
            .map(|e| (e.content, e.review_note.unwrap_or_default()))
            .collect();
        let interests = &profile.interests;
        let inputs = PromptInputs {
            name: profile.name.clone(),
            personality: personality_line(&profile),
            context: context_section(&memory, &self.config.memory),
            preferences: prompt::preferences_section(&interests.likes, &interests.dislikes, &interests.values),
            history: prompt::history_section(&memory.recent_posts, PROMPT_HISTORY),
            feedback: prompt::rejection_section(&rejected),
            max_length: profile.behavior.post_length_max,
        };

        let rules = rules_for(&profile);
        let policy = RetryPolicy::new(self.config.content.retry_count);
        let generator = std::sync::Arc::clone(&self.generator);
        let memory_settings = self.config.memory.clone();
        let content_settings = self.config.content.clone();
        let rng = &mut self.rng;
        let outcome = policy
            .run(
                generator.as_ref(),
                Some(rules.max_length),
                |attempt| {
                    if memory.series.active {
                        inputs.series(&memory)
                    } else {
                        let topic = select_topic(&profile, &state, &memory, &memory_settings, rng);
                        debug!(persona = %id, attempt, topic = %topic, "Prompting");
                        inputs.post(&topic)
                    }
                },
                |raw| check_draft(raw, &rules, &memory.recent_posts, &content_settings),
            )
            .await;

        let content = match outcome {
            GenerationOutcome::Success { content, attempts } => {
                debug!(persona = %id, attempts, "Draft accepted");
                content
            }
            other => return Err(outcome_error(id, other)),
        };

        match memory.record_generated_post(&content, now, &self.config.memory) {
            SeriesProgress::Completed { theme, posts } => {
                info!(persona = %id, theme = %theme, parts = posts.len(), "Series completed");
            }
            SeriesProgress::Advanced { index, total } => {
                debug!(persona = %id, index, total, "Series advanced");
            }
            SeriesProgress::Inactive => {}
        }
        self.store.save_memory(&memory)?;

        state.next_post_time = scheduler::calculate_next_post_time(&profile, now.timestamp(), &mut self.rng);
        self.store.save_state(&state)?;

        let entry = QueueEntry::new(id, profile.name.as_str(), content, PostPayload::Normal, now);
        let entry = self.enqueue(entry)?;
        info!(persona = %id, entry = %entry.id, status = %entry.status, "Post generated");
        Ok(entry)
    }
}
