/// Follow service - idempotent follow graph mutations
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::metrics::FOLLOW_MUTATIONS_TOTAL;
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    SelfFollow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Removed,
    NotFollowing,
}

#[derive(Clone)]
pub struct FollowService {
    store: Store,
}

impl FollowService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn target(&self, username: &str) -> Result<User> {
        self.store
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))
    }

    /// Follow `username`; following yourself is a no-op
    pub async fn follow(&self, viewer_id: i64, username: &str) -> Result<(User, FollowOutcome)> {
        let author = self.target(username).await?;

        let outcome = if author.id == viewer_id {
            FollowOutcome::SelfFollow
        } else if self.store.follows.create_follow(viewer_id, author.id).await? {
            FollowOutcome::Created
        } else {
            FollowOutcome::AlreadyFollowing
        };

        let label = match outcome {
            FollowOutcome::Created => "created",
            FollowOutcome::AlreadyFollowing => "noop",
            FollowOutcome::SelfFollow => "self",
        };
        FOLLOW_MUTATIONS_TOTAL
            .with_label_values(&["follow", label])
            .inc();
        tracing::info!(viewer_id, author_id = author.id, outcome = label, "Follow");

        Ok((author, outcome))
    }

    pub async fn unfollow(&self, viewer_id: i64, username: &str) -> Result<(User, UnfollowOutcome)> {
        let author = self.target(username).await?;

        let outcome = if self.store.follows.delete_follow(viewer_id, author.id).await? {
            UnfollowOutcome::Removed
        } else {
            UnfollowOutcome::NotFollowing
        };

        let label = match outcome {
            UnfollowOutcome::Removed => "removed",
            UnfollowOutcome::NotFollowing => "noop",
        };
        FOLLOW_MUTATIONS_TOTAL
            .with_label_values(&["unfollow", label])
            .inc();
        tracing::info!(viewer_id, author_id = author.id, outcome = label, "Unfollow");

        Ok((author, outcome))
    }
}
