//! Storage layer.
//!
//! Each aggregate has a repository trait with a Postgres implementation and an
//! in-memory one. Handlers only see [`Store`], which bundles the trait objects.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::PgPool;

use crate::models::{
    Comment, CommentView, Group, NewGroup, NewPost, Post, PostChanges, PostView, User,
};

pub mod comment_repo;
pub mod follow_repo;
pub mod group_repo;
pub mod memory;
pub mod pool;
pub mod post_repo;
pub mod user_repo;

pub use memory::MemoryStore;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Which posts a feed is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(i64),
    /// Posts by every author the given user follows
    FollowedBy(i64),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, username: &str) -> Result<User>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create_group(&self, group: NewGroup) -> Result<Group>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Group>>;

    /// All groups ordered by title, used for form choices
    async fn list_groups(&self) -> Result<Vec<Group>>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, post: NewPost) -> Result<Post>;

    /// Apply edits; `None` when the post no longer exists
    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Option<Post>>;

    /// Delete a post with its comments, returns whether a row was removed
    async fn delete_post(&self, id: i64) -> Result<bool>;

    async fn find_post(&self, id: i64) -> Result<Option<PostView>>;

    async fn count_posts(&self, filter: PostFilter) -> Result<usize>;

    /// Newest first, ties broken by id descending
    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostView>>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment>;

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>>;

    async fn delete_comment(&self, id: i64) -> Result<bool>;

    /// Oldest first
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentView>>;
}

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Returns false when the edge already existed
    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Returns false when there was no edge to remove
    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool>;

    async fn count_followers(&self, author_id: i64) -> Result<i64>;

    async fn count_following(&self, user_id: i64) -> Result<i64>;
}

/// Repository bundle shared by all workers
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pool: Option<PgPool>,
}

impl Store {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(user_repo::PgUserRepository::new(pool.clone())),
            groups: Arc::new(group_repo::PgGroupRepository::new(pool.clone())),
            posts: Arc::new(post_repo::PgPostRepository::new(pool.clone())),
            comments: Arc::new(comment_repo::PgCommentRepository::new(pool.clone())),
            follows: Arc::new(follow_repo::PgFollowRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::new()))
    }

    /// Share one memory store between every repository slot
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            groups: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            follows: store,
            pool: None,
        }
    }

    /// Readiness probe for the backing database
    pub async fn ping(&self) -> Result<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
