//! # npcz-runtime: orchestration for NPCZ
//!
//! Ties the deterministic core (`npcz-core`) to the content layer
//! (`npcz-llm`) and the outside world (publisher, outside timeline).
//!
//! ## Tick
//!
//! ```text
//! ┌──────────────────────── Engine::tick(batch) ────────────────────────┐
//! │  cursor → roster slice (ascending ids, one slot kept for review)    │
//! │                                                                     │
//! │  generation ─► interactions ─► reply chains ─► external reactions   │
//! │       │                                                 │           │
//! │       ▼                                                 ▼           │
//! │   QueueStore ◄──────────── PENDING / DRY_RUN ───────────┘           │
//! │       │                                                             │
//! │  affinity decay ─► ignored posts ─► review (APPROVED / REJECTED)    │
//! └─────────────────────────────────────────────────────────────────────┘
//!           Engine::publish_approved() ─► Publisher ─► POSTED
//! ```
//!
//! ## Modules
//!
//! - `engine`: the [`Engine`], tick loop and publishing
//! - `generation`: one standalone post per turn, with retries
//! - `interactions`: replies and reactions between residents
//! - `external`: responses to outside accounts (watchers, interests)
//! - `upkeep`: affinity decay and ignored-post settlement
//! - `review`: automatic and manual review
//! - `publisher`, `timeline`: collaborator seams

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod error;
pub mod external;
pub mod generation;
pub mod interactions;
pub mod publisher;
pub mod review;
pub mod roster;
pub mod timeline;
mod upkeep;

pub use engine::{Engine, TickSummary};
pub use error::{Result, RuntimeError};
pub use publisher::{DryRunPublisher, OutgoingPost, PublishError, Publisher};
pub use review::Decision;
pub use roster::Roster;
pub use timeline::{ExternalPost, ExternalTimeline, StaticTimeline};
