//! Per-persona affinity, trust and familiarity toward other residents.
//!
//! Every value is clamped silently on write: affinity to [-1, 1], trust and
//! familiarity to [0, 1].

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::graph::RelationshipGraph;
use crate::config::AffinitySettings;
use crate::types::{InteractionKind, PersonaId, clamp_signed, clamp_unit};

/// Affinity with no history.
pub const DEFAULT_AFFINITY: f64 = 0.0;
/// Trust with no history.
pub const DEFAULT_TRUST: f64 = 0.5;
/// Familiarity with no history.
pub const DEFAULT_FAMILIARITY: f64 = 0.0;
/// Affinity seeded between members of a shared group.
pub const GROUP_SEED_AFFINITY: f64 = 0.3;

/// How one persona feels about everyone else, stored as `affinity/<id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityRecord {
    /// Owner.
    pub id: PersonaId,
    /// Liking in [-1, 1].
    #[serde(default)]
    pub affinity: BTreeMap<PersonaId, f64>,
    /// Trust in [0, 1].
    #[serde(default)]
    pub trust: BTreeMap<PersonaId, f64>,
    /// Familiarity in [0, 1].
    #[serde(default)]
    pub familiarity: BTreeMap<PersonaId, f64>,
    /// Last reply or reaction exchanged.
    #[serde(default)]
    pub last_interactions: BTreeMap<PersonaId, DateTime<Utc>>,
}

impl AffinityRecord {
    /// Empty record.
    #[must_use]
    pub fn new(id: PersonaId) -> Self {
        Self {
            id,
            affinity: BTreeMap::new(),
            trust: BTreeMap::new(),
            familiarity: BTreeMap::new(),
            last_interactions: BTreeMap::new(),
        }
    }

    /// Affinity toward `target`.
    #[must_use]
    pub fn affinity(&self, target: PersonaId) -> f64 {
        self.affinity.get(&target).copied().unwrap_or(DEFAULT_AFFINITY)
    }

    /// Trust toward `target`.
    #[must_use]
    pub fn trust(&self, target: PersonaId) -> f64 {
        self.trust.get(&target).copied().unwrap_or(DEFAULT_TRUST)
    }

    /// Familiarity with `target`.
    #[must_use]
    pub fn familiarity(&self, target: PersonaId) -> f64 {
        self.familiarity.get(&target).copied().unwrap_or(DEFAULT_FAMILIARITY)
    }

    /// Last exchange with `target`.
    #[must_use]
    pub fn last_interaction(&self, target: PersonaId) -> Option<DateTime<Utc>> {
        self.last_interactions.get(&target).copied()
    }

    /// Overwrite affinity toward `target`, clamped.
    pub fn set_affinity(&mut self, target: PersonaId, value: f64) {
        self.affinity.insert(target, clamp_signed(value));
    }

    /// Shift affinity toward `target`. Returns the new value.
    pub fn update_affinity(&mut self, target: PersonaId, delta: f64) -> f64 {
        let value = clamp_signed(self.affinity(target) + delta);
        self.affinity.insert(target, value);
        value
    }

    /// Shift trust toward `target`. Returns the new value.
    pub fn update_trust(&mut self, target: PersonaId, delta: f64) -> f64 {
        let value = clamp_unit(self.trust(target) + delta);
        self.trust.insert(target, value);
        value
    }

    /// Shift familiarity with `target`. Returns the new value.
    pub fn update_familiarity(&mut self, target: PersonaId, delta: f64) -> f64 {
        let value = clamp_unit(self.familiarity(target) + delta);
        self.familiarity.insert(target, value);
        value
    }

    /// Stamp an exchange with `target`.
    pub fn record_interaction(&mut self, target: PersonaId, now: DateTime<Utc>) {
        self.last_interactions.insert(target, now);
    }

    /// Clamp every stored value after loading.
    pub fn normalize(&mut self) {
        for v in self.affinity.values_mut() {
            *v = clamp_signed(*v);
        }
        for v in self.trust.values_mut().chain(self.familiarity.values_mut()) {
            *v = clamp_unit(*v);
        }
    }
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// Apply one reply or reaction from `responder` to a post by `author`.
///
/// The author warms to the responder; familiarity grows both ways and both
/// sides record the exchange.
pub fn apply_interaction(
    author: &mut AffinityRecord,
    responder: &mut AffinityRecord,
    kind: InteractionKind,
    settings: &AffinitySettings,
    now: DateTime<Utc>,
) {
    let (delta, familiarity) = match kind {
        InteractionKind::Reply => (settings.delta_reply, settings.familiarity_reply),
        InteractionKind::Reaction => (settings.delta_reaction, settings.familiarity_reaction),
    };
    let value = author.update_affinity(responder.id, delta);
    author.update_familiarity(responder.id, familiarity);
    author.record_interaction(responder.id, now);

    responder.update_familiarity(author.id, familiarity);
    responder.record_interaction(author.id, now);

    trace!(
        author = %author.id,
        responder = %responder.id,
        kind = %kind,
        affinity = value,
        "Applied interaction"
    );
}

/// Cool off toward graph partners not interacted with for the configured
/// idle period. Partners never interacted with are left alone.
///
/// Returns the number of relationships whose affinity actually moved; a
/// value already pinned at the bound does not count.
pub fn decay_distant(
    record: &mut AffinityRecord,
    graph: &RelationshipGraph,
    settings: &AffinitySettings,
    now: DateTime<Utc>,
) -> usize {
    let cutoff = now - Duration::days(settings.decay_after_days);
    let mut decayed = 0;
    for partner in graph.related_members(record.id) {
        if record.last_interaction(partner).is_some_and(|last| last < cutoff) {
            let before = record.affinity(partner);
            let after = record.update_affinity(partner, settings.decay_weekly);
            if (after - before).abs() > f64::EPSILON {
                decayed += 1;
            }
        }
    }
    decayed
}

/// Nudge affinity toward every graph partner after a post went unanswered.
///
/// Returns the number of partners affected; zero if the author has none.
pub fn penalize_ignored(
    record: &mut AffinityRecord,
    graph: &RelationshipGraph,
    settings: &AffinitySettings,
) -> usize {
    let partners = graph.related_members(record.id);
    for partner in &partners {
        record.update_affinity(*partner, settings.delta_ignored);
    }
    partners.len()
}

/// Give graph partners their starting affinity. Existing values are kept.
///
/// Pair kinds override the group seed. Returns the number of values written.
pub fn seed_from_graph(record: &mut AffinityRecord, graph: &RelationshipGraph) -> usize {
    let mut seeded = 0;
    let mut seeds: BTreeMap<PersonaId, f64> = BTreeMap::new();
    for group in graph.groups_for(record.id) {
        for member in group.members.iter().filter(|m| **m != record.id) {
            seeds.insert(*member, GROUP_SEED_AFFINITY);
        }
    }
    for pair in graph.pairs_for(record.id) {
        if let (Some(partner), Some(seed)) = (pair.partner_of(record.id), pair.kind.seed_affinity()) {
            seeds.insert(partner, seed);
        }
    }
    for (target, seed) in seeds {
        if !record.affinity.contains_key(&target) {
            record.set_affinity(target, seed);
            seeded += 1;
        }
    }
    seeded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationship::graph::fixtures::sample;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
    }

    #[test]
    fn defaults_for_strangers() {
        let r = AffinityRecord::new(PersonaId(1));
        assert!(r.affinity(PersonaId(2)).abs() < f64::EPSILON);
        assert!((r.trust(PersonaId(2)) - 0.5).abs() < f64::EPSILON);
        assert!(r.familiarity(PersonaId(2)).abs() < f64::EPSILON);
    }

    #[test]
    fn updates_clamp() {
        let mut r = AffinityRecord::new(PersonaId(1));
        assert!((r.update_affinity(PersonaId(2), 5.0) - 1.0).abs() < f64::EPSILON);
        assert!((r.update_affinity(PersonaId(2), -9.0) + 1.0).abs() < f64::EPSILON);
        assert!((r.update_trust(PersonaId(2), 2.0) - 1.0).abs() < f64::EPSILON);
        assert!(r.update_familiarity(PersonaId(2), -2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reply_warms_author_and_familiarises_both() {
        let settings = AffinitySettings::default();
        let mut author = AffinityRecord::new(PersonaId(1));
        let mut responder = AffinityRecord::new(PersonaId(2));
        apply_interaction(&mut author, &mut responder, InteractionKind::Reply, &settings, now());
        assert!((author.affinity(PersonaId(2)) - 0.05).abs() < 1e-9);
        assert!((author.familiarity(PersonaId(2)) - 0.03).abs() < 1e-9);
        assert!((responder.familiarity(PersonaId(1)) - 0.03).abs() < 1e-9);
        assert!(responder.affinity(PersonaId(1)).abs() < f64::EPSILON);
        assert_eq!(author.last_interaction(PersonaId(2)), Some(now()));
        assert_eq!(responder.last_interaction(PersonaId(1)), Some(now()));
    }

    #[test]
    fn decay_only_touches_stale_partners() {
        let settings = AffinitySettings::default();
        let graph = sample();
        let mut r = AffinityRecord::new(PersonaId(1));
        r.set_affinity(PersonaId(2), 0.5);
        r.set_affinity(PersonaId(3), 0.5);
        r.record_interaction(PersonaId(2), now() - Duration::days(8));
        r.record_interaction(PersonaId(3), now() - Duration::days(2));
        assert_eq!(decay_distant(&mut r, &graph, &settings, now()), 1);
        assert!((r.affinity(PersonaId(2)) - 0.48).abs() < 1e-9);
        assert!((r.affinity(PersonaId(3)) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn decay_at_the_floor_is_not_counted() {
        let settings = AffinitySettings::default();
        let graph = sample();
        let mut r = AffinityRecord::new(PersonaId(1));
        r.set_affinity(PersonaId(2), -1.0);
        r.set_affinity(PersonaId(3), 0.2);
        r.record_interaction(PersonaId(2), now() - Duration::days(30));
        r.record_interaction(PersonaId(3), now() - Duration::days(30));
        assert_eq!(decay_distant(&mut r, &graph, &settings, now()), 1);
        assert!((r.affinity(PersonaId(2)) + 1.0).abs() < f64::EPSILON);
        assert!((r.affinity(PersonaId(3)) - 0.18).abs() < 1e-9);
    }

    #[test]
    fn ignored_post_hits_every_partner() {
        let settings = AffinitySettings::default();
        let graph = sample();
        let mut r = AffinityRecord::new(PersonaId(1));
        assert_eq!(penalize_ignored(&mut r, &graph, &settings), 2);
        assert!((r.affinity(PersonaId(2)) + 0.01).abs() < 1e-9);
        let mut loner = AffinityRecord::new(PersonaId(42));
        assert_eq!(penalize_ignored(&mut loner, &graph, &settings), 0);
    }

    #[test]
    fn seeding_prefers_pair_kind_and_keeps_existing() {
        let graph = sample();
        let mut r = AffinityRecord::new(PersonaId(1));
        r.set_affinity(PersonaId(3), 0.9);
        assert_eq!(seed_from_graph(&mut r, &graph), 1);
        assert!((r.affinity(PersonaId(2)) - 0.5).abs() < f64::EPSILON);
        assert!((r.affinity(PersonaId(3)) - 0.9).abs() < f64::EPSILON);

        let mut r3 = AffinityRecord::new(PersonaId(3));
        seed_from_graph(&mut r3, &graph);
        assert!((r3.affinity(PersonaId(1)) + 0.3).abs() < f64::EPSILON);
        assert!((r3.affinity(PersonaId(2)) - 0.3).abs() < f64::EPSILON);
    }
}
