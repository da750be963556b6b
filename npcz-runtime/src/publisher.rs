//! Publishing collaborator: hands approved entries to the social network.
//!
//! The engine never speaks the network protocol itself. It turns a queue
//! entry into an [`OutgoingPost`] and asks a [`Publisher`] for the remote id.

use async_trait::async_trait;
use npcz_core::queue::PostPayload;
use npcz_core::{PersonaId, QueueEntry};
use parking_lot::Mutex;
use thiserror::Error;

/// Failure reported by a publisher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The network refused the post.
    #[error("Rejected by network: {0}")]
    Rejected(String),

    /// The network could not be reached.
    #[error("Network unavailable: {0}")]
    Unavailable(String),
}

/// Shape of a post on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingPost {
    /// A standalone text post (normal posts, mumbles and quotes).
    Standalone {
        /// Authoring resident.
        author: PersonaId,
        /// Text.
        content: String,
        /// Remote id of a quoted post.
        quote: Option<String>,
    },
    /// A threaded reply.
    Reply {
        /// Authoring resident.
        author: PersonaId,
        /// Text.
        content: String,
        /// Remote id of the post replied to.
        parent: String,
        /// Public key of the parent's author, when known.
        parent_pubkey: Option<String>,
    },
    /// A lightweight reaction symbol.
    Reaction {
        /// Reacting resident.
        author: PersonaId,
        /// Reaction symbol.
        symbol: String,
        /// Remote id of the post reacted to.
        target: String,
        /// Public key of the target's author, when known.
        target_pubkey: Option<String>,
    },
}

impl OutgoingPost {
    /// Wire shape for a queue entry.
    #[must_use]
    pub fn from_entry(entry: &QueueEntry) -> Self {
        match &entry.payload {
            PostPayload::Normal | PostPayload::Mumble { .. } => Self::Standalone {
                author: entry.author,
                content: entry.content.clone(),
                quote: None,
            },
            PostPayload::Quote { reply_to } => Self::Standalone {
                author: entry.author,
                content: entry.content.clone(),
                quote: Some(reply_to.remote_id.clone()),
            },
            PostPayload::Reply { reply_to, .. } => Self::Reply {
                author: entry.author,
                content: entry.content.clone(),
                parent: reply_to.remote_id.clone(),
                parent_pubkey: reply_to.pubkey.clone(),
            },
            PostPayload::Reaction { reply_to } => Self::Reaction {
                author: entry.author,
                symbol: entry.content.clone(),
                target: reply_to.remote_id.clone(),
                target_pubkey: reply_to.pubkey.clone(),
            },
        }
    }

    /// Authoring resident.
    #[must_use]
    pub fn author(&self) -> PersonaId {
        match self {
            Self::Standalone { author, .. } | Self::Reply { author, .. } | Self::Reaction { author, .. } => {
                *author
            }
        }
    }
}

/// Something that can put a post on the network.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publisher name, for logs.
    fn name(&self) -> &str;

    /// Publish and return the network's id for the new post.
    async fn publish(&self, post: OutgoingPost) -> Result<String, PublishError>;
}

/// Publisher that records posts and hands out synthetic ids.
#[derive(Debug, Default)]
pub struct DryRunPublisher {
    published: Mutex<Vec<OutgoingPost>>,
}

impl DryRunPublisher {
    /// Empty publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order.
    #[must_use]
    pub fn published(&self) -> Vec<OutgoingPost> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl Publisher for DryRunPublisher {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn publish(&self, post: OutgoingPost) -> Result<String, PublishError> {
        let mut published = self.published.lock();
        published.push(post);
        Ok(format!("dryrun-{:08x}", published.len()))
    }
}
