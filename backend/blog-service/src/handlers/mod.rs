//! HTTP handlers.
//!
//! Pages render as JSON documents whose keys mirror the template context of
//! each view (`page_obj`, `group`, `author`, `post`, `form`, ...).

use actix_web::{HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::media::MediaStorage;
use crate::models::{CommentView, PostView, DISPLAY_TEXT_LEN};

pub mod comments;
pub mod feed;
pub mod follow;
pub mod health;
pub mod media;
pub mod posts;

/// Fallback for unmatched paths
pub async fn not_found(req: HttpRequest) -> actix_web::Result<HttpResponse> {
    Err(AppError::NotFound(format!("no route for {}", req.path())).into())
}

/// First `page` query parameter; malformed query strings count as absent
pub(crate) fn page_param(req: &HttpRequest) -> Option<String> {
    actix_web::web::Query::<Vec<(String, String)>>::from_query(req.query_string())
        .ok()?
        .into_inner()
        .into_iter()
        .find(|(key, _)| key == "page")
        .map(|(_, value)| value)
}

#[derive(Debug, Serialize)]
pub struct GroupRef {
    pub slug: String,
    pub title: String,
}

/// A post as rendered in feeds and on the detail page
#[derive(Debug, Serialize)]
pub struct PostItem {
    pub id: i64,
    pub text: String,
    /// First characters of the text, used as the page title
    pub display: String,
    pub pub_date: DateTime<Utc>,
    pub author: String,
    pub author_id: i64,
    pub group: Option<GroupRef>,
    pub image: Option<String>,
    pub image_url: Option<String>,
}

impl From<PostView> for PostItem {
    fn from(post: PostView) -> Self {
        let group = match (post.group_slug, post.group_title) {
            (Some(slug), Some(title)) => Some(GroupRef { slug, title }),
            _ => None,
        };

        Self {
            id: post.id,
            display: post.text.chars().take(DISPLAY_TEXT_LEN).collect(),
            text: post.text,
            pub_date: post.pub_date,
            author: post.author,
            author_id: post.author_id,
            group,
            image_url: post.image.as_deref().map(MediaStorage::url),
            image: post.image,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentItem {
    pub id: i64,
    pub author: String,
    pub text: String,
    pub created: DateTime<Utc>,
}

impl From<CommentView> for CommentItem {
    fn from(comment: CommentView) -> Self {
        Self {
            id: comment.id,
            author: comment.author,
            text: comment.text,
            created: comment.created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn page_param_is_lenient() {
        let req = TestRequest::get().uri("/?page=2").to_http_request();
        assert_eq!(page_param(&req).as_deref(), Some("2"));

        let req = TestRequest::get().uri("/?page=2&page=5").to_http_request();
        assert_eq!(page_param(&req).as_deref(), Some("2"));

        let req = TestRequest::get().uri("/?other=1").to_http_request();
        assert_eq!(page_param(&req), None);
    }

    #[test]
    fn post_item_flattens_group_and_image() {
        let item = PostItem::from(PostView {
            id: 3,
            text: "A post long enough to be truncated".into(),
            pub_date: Utc::now(),
            image: Some("posts/small.gif".into()),
            author_id: 1,
            author: "leo".into(),
            group_id: Some(2),
            group_slug: Some("cats".into()),
            group_title: Some("Cats".into()),
        });

        assert_eq!(item.display, "A post long eno");
        assert_eq!(item.image_url.as_deref(), Some("/media/posts/small.gif"));
        assert_eq!(item.group.map(|g| g.slug).as_deref(), Some("cats"));
    }
}
