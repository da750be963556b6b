//! # NPCZ Core Library
//!
//! Deterministic core of the resident simulation: who posts when, what each
//! resident remembers, how residents feel about each other, and the review
//! queue every candidate post passes through.
//!
//! - **Scheduler**: activation probability and next-post timing
//! - **Memory**: short-term decay and reinforcement, long-term promotion, series
//! - **Relationship**: static groups and pairs plus evolving affinity
//! - **Interaction**: reply, reaction and conversation-continuation decisions
//! - **Queue**: PENDING → APPROVED/REJECTED → POSTED, with duplicate guards
//! - **Tick**: round-robin cursor over the roster
//!
//! Nothing in this crate performs network I/O. All randomness is injected
//! through [`rand::Rng`] so callers can seed it.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod interaction;
pub mod memory;
pub mod persistence;
pub mod persona;
pub mod queue;
pub mod relationship;
pub mod scheduler;
pub mod tick;
pub mod types;

pub use config::NpczConfig;
pub use error::{NpczError, Result};
pub use interaction::InteractionManager;
pub use memory::PersonaMemory;
pub use persistence::Store;
pub use persona::{PersonaProfile, PersonaState};
pub use queue::{PostPayload, QueueEntry, QueueStatus, QueueStore};
pub use relationship::{AffinityRecord, RelationshipGraph};
pub use tick::TickState;
pub use types::*;
