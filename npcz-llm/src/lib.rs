//! # npcz-llm: content generation layer for NPCZ
//!
//! Everything between a persona and its text:
//!   - **Generators**: the [`ContentGenerator`] seam, an Ollama client and a
//!     scripted double for tests and offline runs
//!   - **Prompts**: post, series, reply, mumble and review templates
//!   - **Validation**: cleaning, rule checks, length adjustment, similarity
//!   - **Retry**: a bounded generate-and-check loop
//!   - **Review**: turning a reviewer's answer into a verdict
//!
//! # Pipeline
//!
//! ```text
//! prompt ─► generate ─► clean ─► validate ─► adjust length ─► similarity
//!    ▲                                                            │
//!    └──────────────────── retry on rejection ◄───────────────────┘
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod generator;
pub mod prompt;
pub mod retry;
pub mod review;
pub mod validate;

pub use client::{OllamaGenerator, OllamaSettings};
pub use error::LlmError;
pub use generator::{ContentGenerator, ScriptedGenerator};
pub use retry::{GenerationOutcome, RetryPolicy};
pub use review::{ReviewVerdict, parse_review};
pub use validate::{ContentRules, Rejection};
