//! Outside-account posts fed to the external-reaction pass.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::publisher::PublishError;

/// One post by an account outside the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalPost {
    /// Network id.
    pub remote_id: String,
    /// Author's public key.
    pub pubkey: String,
    /// Author's display name, when known.
    #[serde(default)]
    pub display_name: String,
    /// Text.
    pub content: String,
}

/// Source of recent outside-account posts.
#[async_trait]
pub trait ExternalTimeline: Send + Sync {
    /// Up to `limit` recent posts, newest first.
    async fn recent_posts(&self, limit: usize) -> Result<Vec<ExternalPost>, PublishError>;
}

/// Fixed list of posts, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticTimeline {
    posts: Vec<ExternalPost>,
}

impl StaticTimeline {
    /// Timeline serving `posts`.
    #[must_use]
    pub fn new(posts: Vec<ExternalPost>) -> Self {
        Self { posts }
    }

    /// Timeline with nothing on it.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExternalTimeline for StaticTimeline {
    async fn recent_posts(&self, limit: usize) -> Result<Vec<ExternalPost>, PublishError> {
        Ok(self.posts.iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_timeline_honours_limit() {
        let post = |i: u32| ExternalPost {
            remote_id: format!("ev{i}"),
            pubkey: "pk".into(),
            display_name: String::new(),
            content: "hi".into(),
        };
        let timeline = StaticTimeline::new((0..5).map(post).collect());
        assert_eq!(timeline.recent_posts(3).await.expect("posts").len(), 3);
        assert!(StaticTimeline::empty().recent_posts(3).await.expect("posts").is_empty());
    }
}
