/// Post service - creation, editing, deletion and the detail view
use std::sync::Arc;

use crate::db::{PostFilter, Store};
use crate::error::{AppError, Result};
use crate::forms::{PostFormContext, PostFormData, INVALID_CHOICE};
use crate::media::{MediaError, MediaStorage};
use crate::metrics::CONTENT_WRITES_TOTAL;
use crate::models::{CommentView, ImageChange, NewPost, Post, PostChanges, PostView};

/// Result of a form submission that passed the access checks
#[derive(Debug)]
pub enum Submission<T> {
    Saved(T),
    Invalid(PostFormContext),
}

#[derive(Debug)]
pub enum EditOutcome {
    Saved(Post),
    Invalid(PostFormContext),
    NotAuthor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotAuthor,
}

#[derive(Debug)]
pub struct PostDetail {
    pub post: PostView,
    /// Number of posts by the same author
    pub posts_count: usize,
    pub comments: Vec<CommentView>,
}

/// A form that passed validation, image not yet stored
struct CleanPost {
    text: String,
    group_id: Option<i64>,
}

#[derive(Clone)]
pub struct PostService {
    store: Store,
    media: Arc<MediaStorage>,
}

impl PostService {
    pub fn new(store: Store, media: Arc<MediaStorage>) -> Self {
        Self { store, media }
    }

    pub async fn get_post(&self, id: i64) -> Result<PostView> {
        self.store
            .posts
            .find_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", id)))
    }

    pub async fn detail(&self, id: i64) -> Result<PostDetail> {
        let post = self.get_post(id).await?;
        let posts_count = self
            .store
            .posts
            .count_posts(PostFilter::Author(post.author_id))
            .await?;
        let comments = self.store.comments.list_for_post(id).await?;

        Ok(PostDetail {
            post,
            posts_count,
            comments,
        })
    }

    pub async fn empty_form(&self) -> Result<PostFormContext> {
        let groups = self.store.groups.list_groups().await?;
        Ok(PostFormContext::empty(&groups))
    }

    /// Form for editing; `None` when the viewer is not the author
    pub async fn edit_form(&self, editor_id: i64, id: i64) -> Result<Option<PostFormContext>> {
        let post = self.get_post(id).await?;
        if post.author_id != editor_id {
            return Ok(None);
        }

        let groups = self.store.groups.list_groups().await?;
        Ok(Some(PostFormContext::for_post(&post, &groups)))
    }

    async fn clean(
        &self,
        form: &mut PostFormData,
        current_image: Option<String>,
    ) -> Result<std::result::Result<CleanPost, PostFormContext>> {
        let mut errors = form.validate_fields();

        let group_id = match form.group_id() {
            Ok(Some(id)) => match self.store.groups.find_by_id(id).await? {
                Some(group) => Some(group.id),
                None => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            },
            Ok(None) => None,
            Err(message) => {
                errors.add("group", message);
                None
            }
        };

        if let Some(upload) = &form.image {
            let checked = if upload.truncated {
                Err(MediaError::TooLarge(
                    upload.size,
                    self.media.max_upload_bytes(),
                ))
            } else {
                self.media.validate_image(&upload.data)
            };
            match checked {
                Ok(_) => {}
                Err(e) if e.is_client_error() => errors.add("image", e.to_string()),
                Err(e) => return Err(e.into()),
            }
        }

        if errors.is_empty() {
            return Ok(Ok(CleanPost {
                text: form.text.clone(),
                group_id,
            }));
        }

        tracing::debug!(?errors, "Post form rejected");
        let groups = self.store.groups.list_groups().await?;
        Ok(Err(PostFormContext::bound(form, current_image, &groups, errors)))
    }

    async fn store_upload(&self, form: &PostFormData) -> Result<Option<String>> {
        match &form.image {
            Some(upload) => Ok(Some(
                self.media
                    .save_post_image(&upload.filename, &upload.data)
                    .await?,
            )),
            None => Ok(None),
        }
    }

    pub async fn create(&self, author_id: i64, mut form: PostFormData) -> Result<Submission<Post>> {
        let clean = match self.clean(&mut form, None).await? {
            Ok(clean) => clean,
            Err(context) => return Ok(Submission::Invalid(context)),
        };

        let image = self.store_upload(&form).await?;
        let post = self
            .store
            .posts
            .create_post(NewPost {
                text: clean.text,
                author_id,
                group_id: clean.group_id,
                image,
            })
            .await?;

        CONTENT_WRITES_TOTAL
            .with_label_values(&["post_created"])
            .inc();
        tracing::info!(post_id = post.id, author_id, "Post created");
        Ok(Submission::Saved(post))
    }

    pub async fn update(&self, editor_id: i64, id: i64, mut form: PostFormData) -> Result<EditOutcome> {
        let existing = self.get_post(id).await?;
        if existing.author_id != editor_id {
            tracing::info!(post_id = id, editor_id, "Rejected edit by non-author");
            return Ok(EditOutcome::NotAuthor);
        }

        let clean = match self.clean(&mut form, existing.image.clone()).await? {
            Ok(clean) => clean,
            Err(context) => return Ok(EditOutcome::Invalid(context)),
        };

        let image = match self.store_upload(&form).await? {
            Some(path) => ImageChange::Replace(path),
            None if form.clear_image => ImageChange::Clear,
            None => ImageChange::Keep,
        };

        let post = self
            .store
            .posts
            .update_post(
                id,
                PostChanges {
                    text: clean.text,
                    group_id: clean.group_id,
                    image,
                },
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", id)))?;

        CONTENT_WRITES_TOTAL.with_label_values(&["post_edited"]).inc();
        tracing::info!(post_id = id, "Post edited");
        Ok(EditOutcome::Saved(post))
    }

    /// Delete a post; returns the author's username for the redirect
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(PostView, DeleteOutcome)> {
        let post = self.get_post(id).await?;
        if post.author_id != user_id {
            return Ok((post, DeleteOutcome::NotAuthor));
        }

        self.store.posts.delete_post(id).await?;
        CONTENT_WRITES_TOTAL
            .with_label_values(&["post_deleted"])
            .inc();
        tracing::info!(post_id = id, "Post deleted");
        Ok((post, DeleteOutcome::Deleted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{UploadedFile, REQUIRED};
    use crate::models::NewGroup;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    fn service(dir: &tempfile::TempDir) -> (Store, PostService) {
        let store = Store::in_memory();
        let media = Arc::new(MediaStorage::new(dir.path(), 1024 * 1024));
        (store.clone(), PostService::new(store, media))
    }

    fn form(text: &str) -> PostFormData {
        PostFormData {
            text: text.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_stores_image_without_group() {
        let dir = tempfile::tempdir().unwrap();
        let (store, service) = service(&dir);
        let leo = store.users.create_user("leo").await.unwrap();

        let mut data = form("Тестовый текст");
        data.image = Some(UploadedFile {
            filename: "small.gif".into(),
            data: SMALL_GIF.to_vec(),
            size: SMALL_GIF.len(),
            truncated: false,
        });

        let Submission::Saved(post) = service.create(leo.id, data).await.unwrap() else {
            panic!("valid form rejected");
        };
        assert_eq!(post.author_id, leo.id);
        assert_eq!(post.group_id, None);
        assert_eq!(post.image.as_deref(), Some("posts/small.gif"));
    }

    #[tokio::test]
    async fn invalid_create_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (store, service) = service(&dir);
        let leo = store.users.create_user("leo").await.unwrap();

        let mut data = form("  ");
        data.group = Some("999".into());
        data.image = Some(UploadedFile {
            filename: "notes.txt".into(),
            data: b"not an image".to_vec(),
            size: 12,
            truncated: false,
        });

        let Submission::Invalid(context) = service.create(leo.id, data).await.unwrap() else {
            panic!("invalid form accepted");
        };
        assert_eq!(context.errors.get("text"), Some(&[REQUIRED.to_string()][..]));
        assert!(context.errors.get("group").is_some());
        assert!(context.errors.get("image").is_some());
        assert_eq!(store.posts.count_posts(PostFilter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn oversized_upload_reports_streamed_size() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::in_memory();
        let media = Arc::new(MediaStorage::new(dir.path(), 16));
        let service = PostService::new(store.clone(), media);
        let leo = store.users.create_user("leo").await.unwrap();

        let mut data = form("Big picture");
        data.image = Some(UploadedFile {
            filename: "big.gif".into(),
            data: SMALL_GIF[..16].to_vec(),
            size: 4096,
            truncated: true,
        });

        let Submission::Invalid(context) = service.create(leo.id, data).await.unwrap() else {
            panic!("oversized upload accepted");
        };
        let image_errors = context.errors.get("image").unwrap();
        assert!(image_errors[0].contains("4096 bytes (max: 16 bytes)"), "{:?}", image_errors);
        assert_eq!(store.posts.count_posts(PostFilter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn only_the_author_can_edit_or_delete() {
        let dir = tempfile::tempdir().unwrap();
        let (store, service) = service(&dir);
        let leo = store.users.create_user("leo").await.unwrap();
        let mia = store.users.create_user("mia").await.unwrap();
        let group = store
            .groups
            .create_group(NewGroup {
                title: "Cats".into(),
                slug: "cats".into(),
                description: String::new(),
            })
            .await
            .unwrap();

        let Submission::Saved(post) = service.create(leo.id, form("original")).await.unwrap() else {
            panic!("valid form rejected");
        };

        let outcome = service.update(mia.id, post.id, form("hijacked")).await.unwrap();
        assert!(matches!(outcome, EditOutcome::NotAuthor));
        assert_eq!(service.get_post(post.id).await.unwrap().text, "original");
        assert!(service.edit_form(mia.id, post.id).await.unwrap().is_none());

        let mut edit = form("edited");
        edit.group = Some(group.id.to_string());
        assert!(matches!(
            service.update(leo.id, post.id, edit).await.unwrap(),
            EditOutcome::Saved(_)
        ));
        let edited = service.get_post(post.id).await.unwrap();
        assert_eq!(edited.text, "edited");
        assert_eq!(edited.group_slug.as_deref(), Some("cats"));

        assert_eq!(
            service.delete(mia.id, post.id).await.unwrap().1,
            DeleteOutcome::NotAuthor
        );
        assert_eq!(
            service.delete(leo.id, post.id).await.unwrap().1,
            DeleteOutcome::Deleted
        );
        assert!(matches!(service.get_post(post.id).await, Err(AppError::NotFound(_))));
    }
}
