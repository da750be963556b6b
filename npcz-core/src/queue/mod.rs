//! Queue pipeline: every candidate post and its review/publish lifecycle.
//!
//! ```text
//! generate ──► PENDING ──review──► APPROVED ──publish──► POSTED
//!     │            └─────review──► REJECTED
//!     └─(dry run)► DRY_RUN
//! ```
//!
//! REJECTED, POSTED and DRY_RUN are terminal. Each status is persisted as its
//! own JSON partition by [`QueueStore`].

pub mod index;
pub mod store;

pub use index::ResponseIndex;
pub use store::QueueStore;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Participant, PersonaId, short_id};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Awaiting review.
    Pending,
    /// Approved, awaiting publish.
    Approved,
    /// Rejected by review.
    Rejected,
    /// Published.
    Posted,
    /// Generated in dry-run mode; never published.
    DryRun,
}

impl QueueStatus {
    /// Every status, in partition order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::Posted,
        Self::DryRun,
    ];

    /// Statuses whose entries count as an existing response to a post.
    pub const LIVE: [Self; 3] = [Self::Pending, Self::Approved, Self::Posted];

    /// Partition identifier, also the file stem.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Posted => "posted",
            Self::DryRun => "dry_run",
        }
    }

    /// Whether the pipeline allows moving from `self` to `to`.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Approved | Self::Rejected) | (Self::Approved, Self::Posted)
        )
    }

    /// No transition leaves this status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Posted | Self::DryRun)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Coarse post kind, derived from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostType {
    /// Standalone post.
    Normal,
    /// Threaded reply.
    Reply,
    /// Reaction symbol.
    Reaction,
    /// Standalone remark about someone.
    Mumble,
    /// Quote of another post.
    Quote,
}

/// The post being replied to, reacted to or quoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    /// Author of the target post.
    pub target: Participant,
    /// Network id of the target post.
    pub remote_id: String,
    /// Snapshot of the target's text.
    #[serde(default)]
    pub content: String,
    /// Public key of the target's author, when known.
    #[serde(default)]
    pub pubkey: Option<String>,
}

/// One message in a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Who wrote it.
    pub author: Participant,
    /// What was said.
    pub content: String,
    /// Position in the thread, root is 0.
    pub depth: u32,
}

/// A reply chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Thread id shared by every reply in the chain.
    pub thread_id: String,
    /// Depth of the reply carrying this context.
    pub depth: u32,
    /// Earlier messages, root first.
    #[serde(default)]
    pub history: Vec<ConversationMessage>,
}

/// Who or what a mumble is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MumbleSubject {
    /// Subject of the remark.
    pub about: Participant,
    /// Display name of the subject.
    #[serde(default)]
    pub display_name: String,
    /// Text that prompted the remark.
    #[serde(default)]
    pub original_content: String,
    /// Network id of the post that prompted it.
    #[serde(default)]
    pub remote_id: Option<String>,
}

/// Type-specific part of a queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "post_type", rename_all = "snake_case")]
pub enum PostPayload {
    /// Standalone post.
    Normal,
    /// Threaded reply.
    Reply {
        /// Post being replied to.
        reply_to: ReplyTarget,
        /// Thread context.
        #[serde(default)]
        conversation: Option<Conversation>,
    },
    /// Reaction symbol on a post.
    Reaction {
        /// Post being reacted to.
        reply_to: ReplyTarget,
    },
    /// Standalone remark about someone.
    Mumble {
        /// Subject.
        about: MumbleSubject,
    },
    /// Quote of another post.
    Quote {
        /// Post being quoted.
        reply_to: ReplyTarget,
    },
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One candidate post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Eight hex characters.
    pub id: String,
    /// Authoring resident.
    pub author: PersonaId,
    /// Author display name.
    #[serde(default)]
    pub author_name: String,
    /// Text (or reaction symbol).
    pub content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Lifecycle status.
    pub status: QueueStatus,
    /// Type-specific data.
    #[serde(flatten)]
    pub payload: PostPayload,
    /// Review time.
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Review note.
    #[serde(default)]
    pub review_note: Option<String>,
    /// Publish time.
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
    /// Network id assigned on publish.
    #[serde(default)]
    pub remote_id: Option<String>,
    /// The unanswered-post pass has already looked at this entry.
    #[serde(default)]
    pub settled: bool,
}

impl QueueEntry {
    /// New PENDING entry with a fresh id.
    #[must_use]
    pub fn new(
        author: PersonaId,
        author_name: impl Into<String>,
        content: impl Into<String>,
        payload: PostPayload,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: short_id(),
            author,
            author_name: author_name.into(),
            content: content.into(),
            created_at: now,
            status: QueueStatus::Pending,
            payload,
            reviewed_at: None,
            review_note: None,
            posted_at: None,
            remote_id: None,
            settled: false,
        }
    }

    /// Coarse kind.
    #[must_use]
    pub fn post_type(&self) -> PostType {
        match self.payload {
            PostPayload::Normal => PostType::Normal,
            PostPayload::Reply { .. } => PostType::Reply,
            PostPayload::Reaction { .. } => PostType::Reaction,
            PostPayload::Mumble { .. } => PostType::Mumble,
            PostPayload::Quote { .. } => PostType::Quote,
        }
    }

    /// The post this entry responds to, if any.
    #[must_use]
    pub fn reply_target(&self) -> Option<&ReplyTarget> {
        match &self.payload {
            PostPayload::Reply { reply_to, .. }
            | PostPayload::Reaction { reply_to }
            | PostPayload::Quote { reply_to } => Some(reply_to),
            PostPayload::Normal | PostPayload::Mumble { .. } => None,
        }
    }

    /// Network id of the post this entry responds to or remarks on.
    #[must_use]
    pub fn responded_remote_id(&self) -> Option<&str> {
        match &self.payload {
            PostPayload::Mumble { about } => about.remote_id.as_deref(),
            _ => self.reply_target().map(|t| t.remote_id.as_str()),
        }
    }

    /// Thread context of a reply.
    #[must_use]
    pub fn conversation(&self) -> Option<&Conversation> {
        match &self.payload {
            PostPayload::Reply { conversation, .. } => conversation.as_ref(),
            _ => None,
        }
    }
}
