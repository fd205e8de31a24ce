//! In-memory repositories.
//!
//! Backs `STORAGE_BACKEND=memory` and the HTTP tests. Foreign-key behavior
//! mirrors the schema: deleting a post removes its comments, deleting nothing
//! else is supported.

use std::collections::{BTreeMap, HashSet};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    CommentRepository, FollowRepository, GroupRepository, PostFilter, PostRepository,
    UserRepository,
};
use crate::models::{
    Comment, CommentView, Group, ImageChange, NewGroup, NewPost, Post, PostChanges, PostView,
    User,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    /// (user_id, author_id)
    follows: HashSet<(i64, i64)>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn post_view(&self, post: &Post) -> Option<PostView> {
        let author = self.users.get(&post.author_id)?;
        let group = post.group_id.and_then(|id| self.groups.get(&id));

        Some(PostView {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            image: post.image.clone(),
            author_id: post.author_id,
            author: author.username.clone(),
            group_id: group.map(|g| g.id),
            group_slug: group.map(|g| g.slug.clone()),
            group_title: group.map(|g| g.title.clone()),
        })
    }

    fn matches(&self, post: &Post, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self.follows.contains(&(user_id, post.author_id)),
        }
    }

    fn filtered(&self, filter: PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .values()
            .filter(|post| self.matches(post, filter))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, username: &str) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == username) {
            bail!("username '{}' is already taken", username);
        }

        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|g| g.slug == group.slug) {
            bail!("group slug '{}' is already taken", group.slug);
        }

        let group = Group {
            id: tables.next_id(),
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Group>> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&post.author_id) {
            bail!("author {} does not exist", post.author_id);
        }
        if let Some(group_id) = post.group_id {
            if !tables.groups.contains_key(&group_id) {
                bail!("group {} does not exist", group_id);
            }
        }

        let post = Post {
            id: tables.next_id(),
            text: post.text,
            pub_date: Utc::now(),
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let mut tables = self.tables.write().await;
        let Some(post) = tables.posts.get_mut(&id) else {
            return Ok(None);
        };

        post.text = changes.text;
        post.group_id = changes.group_id;
        match changes.image {
            ImageChange::Keep => {}
            ImageChange::Replace(path) => post.image = Some(path),
            ImageChange::Clear => post.image = None,
        }
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, comment| comment.post_id != id);
        Ok(true)
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostView>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).and_then(|post| tables.post_view(post)))
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<usize> {
        Ok(self.tables.read().await.filtered(filter).len())
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .filtered(filter)
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|post| tables.post_view(post))
            .collect())
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&post_id) {
            bail!("post {} does not exist", post_id);
        }

        let comment = Comment {
            id: tables.next_id(),
            post_id,
            author_id,
            text: text.to_string(),
            created: Utc::now(),
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn delete_comment(&self, id: i64) -> Result<bool> {
        Ok(self.tables.write().await.comments.remove(&id).is_some())
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentView>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<CommentView> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .filter_map(|c| {
                let author = tables.users.get(&c.author_id)?;
                Some(CommentView {
                    id: c.id,
                    post_id: c.post_id,
                    author_id: c.author_id,
                    author: author.username.clone(),
                    text: c.text.clone(),
                    created: c.created,
                })
            })
            .collect();
        comments.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        Ok(comments)
    }
}

#[async_trait]
impl FollowRepository for MemoryStore {
    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        if user_id == author_id {
            bail!("user {} cannot follow themselves", user_id);
        }
        Ok(self.tables.write().await.follows.insert((user_id, author_id)))
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        Ok(self
            .tables
            .write()
            .await
            .follows
            .remove(&(user_id, author_id)))
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        Ok(self
            .tables
            .read()
            .await
            .follows
            .contains(&(user_id, author_id)))
    }

    async fn count_followers(&self, author_id: i64) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables.follows.iter().filter(|(_, a)| *a == author_id).count() as i64)
    }

    async fn count_following(&self, user_id: i64) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables.follows.iter().filter(|(u, _)| *u == user_id).count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed() -> (MemoryStore, User, User, Group) {
        let store = MemoryStore::new();
        let alice = store.create_user("alice").await.unwrap();
        let bob = store.create_user("bob").await.unwrap();
        let group = store
            .create_group(NewGroup {
                title: "Cats".into(),
                slug: "cats".into(),
                description: String::new(),
            })
            .await
            .unwrap();
        (store, alice, bob, group)
    }

    fn new_post(author: &User, group: Option<&Group>, text: &str) -> NewPost {
        NewPost {
            text: text.into(),
            author_id: author.id,
            group_id: group.map(|g| g.id),
            image: None,
        }
    }

    #[tokio::test]
    async fn feeds_are_newest_first_and_filtered() {
        let (store, alice, bob, group) = seed().await;
        let first = store.create_post(new_post(&alice, Some(&group), "first")).await.unwrap();
        let second = store.create_post(new_post(&bob, None, "second")).await.unwrap();

        let all = store.list_posts(PostFilter::All, 10, 0).await.unwrap();
        assert_eq!(all.iter().map(|p| p.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        let grouped = store.list_posts(PostFilter::Group(group.id), 10, 0).await.unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].group_slug.as_deref(), Some("cats"));

        assert_eq!(store.count_posts(PostFilter::Author(bob.id)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn deleting_a_post_drops_its_comments() {
        let (store, alice, bob, _) = seed().await;
        let post = store.create_post(new_post(&alice, None, "hello")).await.unwrap();
        let comment = store.create_comment(post.id, bob.id, "hi").await.unwrap();

        assert!(store.delete_post(post.id).await.unwrap());
        assert!(store.find_comment(comment.id).await.unwrap().is_none());
        assert!(!store.delete_post(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn follow_edges_are_unique_and_never_reflexive() {
        let (store, alice, bob, _) = seed().await;
        assert!(store.create_follow(alice.id, bob.id).await.unwrap());
        assert!(!store.create_follow(alice.id, bob.id).await.unwrap());
        assert_eq!(store.count_followers(bob.id).await.unwrap(), 1);
        assert!(store.create_follow(alice.id, alice.id).await.is_err());

        store.create_post(new_post(&bob, None, "by bob")).await.unwrap();
        store.create_post(new_post(&alice, None, "by alice")).await.unwrap();
        let followed = store.list_posts(PostFilter::FollowedBy(alice.id), 10, 0).await.unwrap();
        assert_eq!(followed.len(), 1);
        assert_eq!(followed[0].author, "bob");
        assert!(store.list_posts(PostFilter::FollowedBy(bob.id), 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn edits_keep_or_replace_image() {
        let (store, alice, _, _) = seed().await;
        let mut post = new_post(&alice, None, "pic");
        post.image = Some("posts/a.gif".into());
        let post = store.create_post(post).await.unwrap();

        let kept = store
            .update_post(
                post.id,
                PostChanges {
                    text: "edited".into(),
                    group_id: None,
                    image: ImageChange::Keep,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.image.as_deref(), Some("posts/a.gif"));

        let cleared = store
            .update_post(
                post.id,
                PostChanges {
                    text: "edited".into(),
                    group_id: None,
                    image: ImageChange::Clear,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(cleared.image.is_none());
    }
}
