/// Comment service - adding and removing comments on posts
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::forms::CommentForm;
use crate::metrics::CONTENT_WRITES_TOTAL;
use crate::models::Comment;

#[derive(Clone)]
pub struct CommentService {
    store: Store,
}

impl CommentService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Add a comment; an invalid form creates nothing and yields `None`
    pub async fn add(
        &self,
        author_id: i64,
        post_id: i64,
        mut form: CommentForm,
    ) -> Result<Option<Comment>> {
        if self.store.posts.find_post(post_id).await?.is_none() {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }

        let errors = form.validate_fields();
        if !errors.is_empty() {
            tracing::debug!(post_id, ?errors, "Comment form rejected");
            return Ok(None);
        }

        let comment = self
            .store
            .comments
            .create_comment(post_id, author_id, &form.text)
            .await?;

        CONTENT_WRITES_TOTAL
            .with_label_values(&["comment_created"])
            .inc();
        tracing::info!(post_id, comment_id = comment.id, "Comment added");
        Ok(Some(comment))
    }

    /// Delete a comment written by `user_id`; returns whether it was removed
    pub async fn delete(&self, user_id: i64, post_id: i64, comment_id: i64) -> Result<bool> {
        let comment = self
            .store
            .comments
            .find_comment(comment_id)
            .await?
            .filter(|c| c.post_id == post_id)
            .ok_or_else(|| AppError::NotFound(format!("comment {}", comment_id)))?;

        if comment.author_id != user_id {
            return Ok(false);
        }

        let removed = self.store.comments.delete_comment(comment.id).await?;
        if removed {
            CONTENT_WRITES_TOTAL
                .with_label_values(&["comment_deleted"])
                .inc();
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPost;

    #[tokio::test]
    async fn comments_need_text_and_an_existing_post() {
        let store = Store::in_memory();
        let leo = store.users.create_user("leo").await.unwrap();
        let post = store
            .posts
            .create_post(NewPost {
                text: "hello".into(),
                author_id: leo.id,
                group_id: None,
                image: None,
            })
            .await
            .unwrap();
        let service = CommentService::new(store.clone());

        let blank = CommentForm { text: "  ".into() };
        assert!(service.add(leo.id, post.id, blank).await.unwrap().is_none());

        let ok = CommentForm {
            text: "first!".into(),
        };
        let comment = service.add(leo.id, post.id, ok.clone()).await.unwrap().unwrap();
        assert_eq!(comment.text, "first!");
        assert_eq!(store.comments.list_for_post(post.id).await.unwrap().len(), 1);

        assert!(matches!(
            service.add(leo.id, post.id + 100, ok).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn only_comment_author_can_delete() {
        let store = Store::in_memory();
        let leo = store.users.create_user("leo").await.unwrap();
        let mia = store.users.create_user("mia").await.unwrap();
        let post = store
            .posts
            .create_post(NewPost {
                text: "hello".into(),
                author_id: leo.id,
                group_id: None,
                image: None,
            })
            .await
            .unwrap();
        let comment = store
            .comments
            .create_comment(post.id, mia.id, "hi")
            .await
            .unwrap();
        let service = CommentService::new(store);

        assert!(!service.delete(leo.id, post.id, comment.id).await.unwrap());
        assert!(service.delete(mia.id, post.id, comment.id).await.unwrap());
        assert!(matches!(
            service.delete(mia.id, post.id, comment.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
