//! The engine: owns the store, roster and collaborators, and runs ticks.
//!
//! A tick claims the next slice of the sorted roster and walks it in
//! ascending id order:
//!
//! ```text
//! generation → interactions → reply chains → external reactions
//!            → affinity decay → ignored posts → review
//! ```
//!
//! Publishing is a separate step ([`Engine::publish_approved`]) so approved
//! entries can go out on their own schedule.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use npcz_core::queue::PostType;
use npcz_core::relationship::seed_from_graph;
use npcz_core::{
    NpczConfig, PersonaId, QueueEntry, QueueStatus, QueueStore, RelationshipGraph, Store, scheduler,
};
use npcz_llm::ContentGenerator;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, RuntimeError};
use crate::publisher::{OutgoingPost, Publisher};
use crate::roster::Roster;
use crate::timeline::{ExternalTimeline, StaticTimeline};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Counts from one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// Standalone posts generated.
    pub generated: usize,
    /// Replies and reactions between residents, reply chains included.
    pub interactions: usize,
    /// Responses to outside accounts.
    pub external: usize,
    /// Relationships cooled by the idle-decay pass.
    pub decayed: usize,
    /// Posts settled as ignored.
    pub ignored: usize,
    /// Pending entries reviewed.
    pub reviewed: usize,
}

impl fmt::Display for TickSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} generated, {} interactions, {} external, {} decayed, {} ignored, {} reviewed",
            self.generated, self.interactions, self.external, self.decayed, self.ignored, self.reviewed
        )
    }
}

/// Orchestrates the roster over a storage root.
pub struct Engine {
    pub(crate) config: NpczConfig,
    pub(crate) store: Store,
    pub(crate) queue: QueueStore,
    pub(crate) graph: RelationshipGraph,
    pub(crate) roster: Roster,
    pub(crate) generator: Arc<dyn ContentGenerator>,
    pub(crate) reviewer: Arc<dyn ContentGenerator>,
    pub(crate) publisher: Arc<dyn Publisher>,
    pub(crate) timeline: Arc<dyn ExternalTimeline>,
    pub(crate) rng: StdRng,
    clock: Clock,
}

impl Engine {
    /// Open the storage root named by `config`, load the roster and graph,
    /// and seed missing affinity values from the graph.
    ///
    /// # Errors
    /// Returns an error if `config` is out of range, the store cannot be
    /// opened, the residents cannot be listed, or the relationship graph is
    /// invalid.
    pub fn open(
        config: NpczConfig,
        generator: Arc<dyn ContentGenerator>,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self> {
        config.validate()?;
        let store = Store::open(config.storage.root.clone())?;
        let roster = Roster::load(&store)?;
        let graph = store.load_graph()?;

        for id in roster.ids() {
            let mut record = store.load_affinity(id);
            let seeded = seed_from_graph(&mut record, &graph);
            if seeded > 0 {
                debug!(persona = %id, seeded, "Seeded affinity from graph");
                if let Err(e) = store.save_affinity(&record) {
                    warn!(persona = %id, error = %e, "Could not save seeded affinity");
                }
            }
        }

        info!(
            root = %store.root().display(),
            residents = roster.len(),
            groups = graph.groups.len(),
            pairs = graph.pairs.len(),
            watchers = graph.watchers.len(),
            generator = generator.name(),
            publisher = publisher.name(),
            dry_run = config.general.dry_run,
            "Engine ready"
        );

        let queue = store.queue();
        Ok(Self {
            config,
            store,
            queue,
            graph,
            roster,
            reviewer: Arc::clone(&generator),
            generator,
            publisher,
            timeline: Arc::new(StaticTimeline::empty()),
            rng: StdRng::from_entropy(),
            clock: Arc::new(Utc::now),
        })
    }

    /// Use a separate generator for review.
    #[must_use]
    pub fn with_reviewer(mut self, reviewer: Arc<dyn ContentGenerator>) -> Self {
        self.reviewer = reviewer;
        self
    }

    /// Source of outside-account posts.
    #[must_use]
    pub fn with_timeline(mut self, timeline: Arc<dyn ExternalTimeline>) -> Self {
        self.timeline = timeline;
        self
    }

    /// Seed every random decision.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Replace the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &NpczConfig {
        &self.config
    }

    /// Loaded residents.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Queue partitions.
    #[must_use]
    pub fn queue(&self) -> &QueueStore {
        &self.queue
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub(crate) fn local(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        let offset = self
            .config
            .general
            .utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        now.with_timezone(&offset)
    }

    /// Add a freshly built entry, routed to DRY_RUN in dry-run mode.
    pub(crate) fn enqueue(&self, mut entry: QueueEntry) -> Result<QueueEntry> {
        if self.config.general.dry_run {
            entry.status = QueueStatus::DryRun;
        }
        self.queue.add(entry.clone())?;
        Ok(entry)
    }

    fn is_due(&mut self, id: PersonaId, now: DateTime<Utc>) -> bool {
        let Some(profile) = self.roster.get(id) else {
            return false;
        };
        let state = self.store.load_state(id);
        let local = self.local(now);
        scheduler::should_post_now(profile, &state, local, &self.config.scheduler, &mut self.rng)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one tick over the next `batch` slots of the roster.
    ///
    /// One slot is reserved for the reviewer, so `max(1, batch - 1)`
    /// residents are processed. A failing resident is logged and skipped.
    ///
    /// # Errors
    /// Returns an error only if the tick cursor cannot be saved.
    pub async fn tick(&mut self, batch: usize) -> Result<TickSummary> {
        let now = self.now();
        let ids = self.roster.ids();
        let mut summary = TickSummary::default();
        if ids.is_empty() {
            info!("No residents; nothing to do");
            return Ok(summary);
        }

        let residents = batch.saturating_sub(1).max(1);
        let mut cursor = self.store.load_tick_state();
        let range = cursor.advance(residents, ids.len(), now);
        self.store.save_tick_state(&cursor)?;
        let targets = ids[range.clone()].to_vec();
        info!(
            tick = cursor.total_ticks,
            start = range.start,
            end = range.end,
            roster = ids.len(),
            "Tick started"
        );

        let cap = self.config.queue.approved_backlog_cap;
        if self.queue.backlog_exceeded(cap) {
            warn!(cap, "Approved backlog over cap; generation suspended this tick");
        } else {
            for &id in &targets {
                if !self.is_due(id, now) {
                    continue;
                }
                match self.generate_for(id).await {
                    Ok(_) => summary.generated += 1,
                    Err(e) => warn!(persona = %id, error = %e, "Generation turn skipped"),
                }
            }
        }

        let mut index = self.queue.build_index();
        summary.interactions = self.process_interactions(&targets, &mut index, now).await
            + self.process_reply_chains(&targets, &mut index, now).await;
        summary.external = self.process_external_reactions(&targets, &mut index, now).await;
        summary.decayed = self.decay_distant_pass(&targets, now);
        summary.ignored = self.ignored_posts_pass(&targets, &index, now);
        summary.reviewed = self.review_pending().await;

        info!(tick = cursor.total_ticks, %summary, "Tick complete");
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Publish
    // -----------------------------------------------------------------------

    /// Publish every APPROVED entry.
    ///
    /// A failed publish leaves the entry APPROVED for the next run. Publishing
    /// and marking are not atomic: a crash in between can publish twice.
    ///
    /// # Errors
    /// Never fails as a whole; individual failures are logged.
    pub async fn publish_approved(&mut self) -> Result<usize> {
        let now = self.now();
        let mut published = 0;
        for entry in self.queue.all(QueueStatus::Approved) {
            let post = OutgoingPost::from_entry(&entry);
            let remote_id = match self.publisher.publish(post).await {
                Ok(id) => id,
                Err(source) => {
                    let err = RuntimeError::Publish {
                        entry: entry.id.clone(),
                        source,
                    };
                    warn!(entry = %entry.id, error = %err, "Entry stays approved");
                    continue;
                }
            };
            if let Err(e) = self.queue.mark_posted(&entry.id, Some(remote_id.clone()), now) {
                warn!(entry = %entry.id, remote = %remote_id, error = %e, "Published but not marked posted");
                continue;
            }
            if entry.post_type() == PostType::Normal {
                self.record_publish(&entry, &remote_id, now);
            }
            info!(entry = %entry.id, persona = %entry.author, remote = %remote_id, "Published");
            published += 1;
        }
        Ok(published)
    }

    /// Update the author's state after a standalone post went out.
    fn record_publish(&mut self, entry: &QueueEntry, remote_id: &str, now: DateTime<Utc>) {
        let Some(profile) = self.roster.get(entry.author) else {
            return;
        };
        let mut state = self.store.load_state(entry.author);
        let next = scheduler::calculate_next_post_time(profile, now.timestamp(), &mut self.rng);
        state.record_post(
            &entry.content,
            Some(remote_id.to_string()),
            now,
            next,
            self.config.content.max_history_size,
        );

        let interval = self.config.content.evolution_interval;
        if interval > 0 && state.total_posts % interval == 0 {
            let fresh: Vec<&String> = self
                .config
                .content
                .topic_pool
                .iter()
                .filter(|t| !profile.interests.topics.contains(t) && !state.discovered_topics.contains(t))
                .collect();
            if let Some(topic) = fresh.choose(&mut self.rng) {
                state.discover_topic(topic);
                info!(persona = %entry.author, topic = %topic, "Discovered a new interest");
            }
        }

        if let Err(e) = self.store.save_state(&state) {
            warn!(persona = %entry.author, error = %e, "Could not save state after publish");
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("root", &self.store.root())
            .field("residents", &self.roster.len())
            .field("generator", &self.generator.name())
            .field("publisher", &self.publisher.name())
            .finish_non_exhaustive()
    }
}
