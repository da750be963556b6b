//! Review: moving PENDING entries to APPROVED or REJECTED.
//!
//! The automatic reviewer asks a generator whether a post contains forbidden
//! content. Reactions carry a single symbol and are approved without asking.

use std::str::FromStr;
use std::sync::Arc;

use npcz_core::queue::PostType;
use npcz_core::{QueueEntry, QueueStatus};
use npcz_llm::prompt::PromptId;
use npcz_llm::{ReviewVerdict, parse_review};
use tracing::{info, warn};

use crate::engine::Engine;
use crate::error::{Result, RuntimeError};

/// Note left on automatically approved entries.
const AUTO_APPROVED: &str = "auto-review: ok";

/// A reviewer's decision on one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Move to APPROVED.
    Approve,
    /// Move to REJECTED.
    Reject,
}

impl FromStr for Decision {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" | "ok" => Ok(Self::Approve),
            "reject" | "rejected" | "ng" => Ok(Self::Reject),
            _ => Err(RuntimeError::UnknownDecision(s.to_string())),
        }
    }
}

impl Engine {
    /// Record a manual review decision on a PENDING entry.
    ///
    /// # Errors
    /// [`RuntimeError::UnknownDecision`] for anything but approve/reject;
    /// core errors if the entry is unknown or not PENDING.
    pub fn review(&mut self, entry_id: &str, decision: &str, note: Option<String>) -> Result<QueueEntry> {
        let decision: Decision = decision.parse()?;
        let now = self.now();
        let entry = match decision {
            Decision::Approve => self.queue.approve(entry_id, note, now)?,
            Decision::Reject => self.queue.reject(entry_id, note, now)?,
        };
        info!(entry = %entry.id, persona = %entry.author, status = %entry.status, "Reviewed");
        Ok(entry)
    }

    /// Ask the reviewer about one entry.
    async fn verdict_for(&self, entry: &QueueEntry) -> Result<ReviewVerdict> {
        if entry.post_type() == PostType::Reaction {
            return Ok(ReviewVerdict::Approve);
        }
        let reviewer = Arc::clone(&self.reviewer);
        let prompt = PromptId::Review.render(&[("content", entry.content.as_str())]);
        let answer = reviewer.generate(&prompt, None).await?;
        Ok(parse_review(&answer))
    }

    /// Review every PENDING entry with the automatic reviewer.
    ///
    /// An entry whose review call fails stays PENDING for the next tick.
    /// Returns the number of entries reviewed.
    pub(crate) async fn review_pending(&mut self) -> usize {
        let now = self.now();
        let mut reviewed = 0;
        for entry in self.queue.all(QueueStatus::Pending) {
            let verdict = match self.verdict_for(&entry).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!(entry = %entry.id, error = %e, "Review deferred");
                    continue;
                }
            };
            let result = match &verdict {
                ReviewVerdict::Approve => self.queue.approve(&entry.id, Some(AUTO_APPROVED.into()), now),
                ReviewVerdict::Reject(reason) => self.queue.reject(&entry.id, Some(reason.clone()), now),
            };
            match result {
                Ok(updated) => {
                    info!(entry = %updated.id, persona = %updated.author, status = %updated.status, "Auto-reviewed");
                    reviewed += 1;
                }
                Err(e) => warn!(entry = %entry.id, error = %e, "Could not record review"),
            }
        }
        reviewed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_parse_loosely() {
        assert_eq!("Approve".parse::<Decision>().expect("ok"), Decision::Approve);
        assert_eq!(" reject ".parse::<Decision>().expect("ok"), Decision::Reject);
        assert!(matches!(
            "maybe".parse::<Decision>(),
            Err(RuntimeError::UnknownDecision(d)) if d == "maybe"
        ));
    }
}
