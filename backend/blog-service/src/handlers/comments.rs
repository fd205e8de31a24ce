use actix_web::{web, HttpResponse};

use crate::app::AppState;
use crate::error::Result;
use crate::forms::CommentForm;
use crate::middleware::CurrentUser;
use crate::routes::{post_detail_url, redirect};

#[derive(Debug, serde::Deserialize)]
pub struct CommentPath {
    pub post_id: i64,
    pub comment_id: i64,
}

/// POST /posts/{post_id}/comment/
///
/// Redirects back to the post whether or not the comment was valid. A body
/// that is not a urlencoded form counts as an empty submission.
pub async fn add_comment(
    state: web::Data<AppState>,
    user: CurrentUser,
    post_id: web::Path<i64>,
    form: Option<web::Form<CommentForm>>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let form = form.map(web::Form::into_inner).unwrap_or_default();
    state.comments.add(user.0.id, post_id, form).await?;
    Ok(redirect(post_detail_url(post_id)))
}

/// POST /posts/{post_id}/comments/{comment_id}/delete/
pub async fn delete_comment(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<CommentPath>,
) -> Result<HttpResponse> {
    state
        .comments
        .delete(user.0.id, path.post_id, path.comment_id)
        .await?;
    Ok(redirect(post_detail_url(path.post_id)))
}
