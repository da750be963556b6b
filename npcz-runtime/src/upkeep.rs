//! Affinity upkeep run at the end of every tick: cooling idle relationships
//! and settling posts nobody answered.

use chrono::{DateTime, Duration, Utc};
use npcz_core::queue::{PostType, ResponseIndex};
use npcz_core::relationship::{decay_distant, penalize_ignored};
use npcz_core::{PersonaId, QueueStatus};
use tracing::{debug, warn};

use crate::engine::Engine;

impl Engine {
    /// Decay affinity toward graph partners the target residents have not
    /// interacted with for `affinity.decay_after_days`.
    ///
    /// Returns the number of relationships that cooled.
    pub(crate) fn decay_distant_pass(&self, targets: &[PersonaId], now: DateTime<Utc>) -> usize {
        let mut decayed = 0;
        for &id in targets {
            let mut record = self.store.load_affinity(id);
            let n = decay_distant(&mut record, &self.graph, &self.config.affinity, now);
            if n == 0 {
                continue;
            }
            if let Err(e) = self.store.save_affinity(&record) {
                warn!(persona = %id, error = %e, "Could not save decayed affinity");
                continue;
            }
            debug!(persona = %id, relationships = n, "Idle relationships cooled");
            decayed += n;
        }
        decayed
    }

    /// Settle the target residents' posts whose response window has closed.
    ///
    /// A post nobody responded to lowers its author's affinity toward every
    /// graph partner and dampens their mood. Each post is settled once.
    /// Returns the number of posts penalized.
    pub(crate) fn ignored_posts_pass(
        &self,
        targets: &[PersonaId],
        index: &ResponseIndex,
        now: DateTime<Utc>,
    ) -> usize {
        let cutoff = now - Duration::hours(self.config.affinity.ignored_after_hours);
        let due: Vec<_> = self
            .queue
            .all(QueueStatus::Posted)
            .into_iter()
            .filter(|e| e.post_type() == PostType::Normal && !e.settled && targets.contains(&e.author))
            .filter(|e| e.posted_at.is_some_and(|at| at < cutoff))
            .collect();

        let mut ignored = 0;
        for entry in due {
            let Some(remote_id) = entry.remote_id.as_deref() else {
                continue;
            };
            if !index.has_any_response(remote_id) {
                let mut record = self.store.load_affinity(entry.author);
                let partners = penalize_ignored(&mut record, &self.graph, &self.config.affinity);
                if partners > 0 {
                    let mut state = self.store.load_state(entry.author);
                    state.apply_ignored(&self.config.affinity);
                    let saved = self
                        .store
                        .save_affinity(&record)
                        .and_then(|()| self.store.save_state(&state));
                    match saved {
                        Ok(()) => {
                            debug!(persona = %entry.author, entry = %entry.id, partners, "Post went unanswered");
                            ignored += 1;
                        }
                        Err(e) => warn!(persona = %entry.author, error = %e, "Could not save ignored-post penalty"),
                    }
                }
            }
            if let Err(e) = self
                .queue
                .update_in_place(QueueStatus::Posted, &entry.id, |posted| posted.settled = true)
            {
                warn!(entry = %entry.id, error = %e, "Could not settle post");
            }
        }
        ignored
    }
}
