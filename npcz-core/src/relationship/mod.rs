//! Relationships between residents: the static graph and per-persona affinity.

pub mod affinity;
pub mod graph;

pub use affinity::{AffinityRecord, apply_interaction, decay_distant, penalize_ignored, seed_from_graph};
pub use graph::{Group, Pair, PairKind, RelationshipGraph, WatchStyle, Watcher};
