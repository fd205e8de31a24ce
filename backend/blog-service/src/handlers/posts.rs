use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde_json::json;

use super::{CommentItem, PostItem};
use crate::app::AppState;
use crate::error::Result;
use crate::forms::{CommentFormContext, PostFormContext, PostFormData};
use crate::middleware::CurrentUser;
use crate::routes::{post_detail_url, profile_url, redirect};
use crate::services::{DeleteOutcome, EditOutcome, Submission};

fn form_page(form: &PostFormContext, is_edit: bool, post_id: Option<i64>) -> serde_json::Value {
    json!({
        "form": form,
        "is_edit": is_edit,
        "post_id": post_id,
    })
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let detail = state.posts.detail(post_id.into_inner()).await?;
    let comments: Vec<CommentItem> = detail.comments.into_iter().map(CommentItem::from).collect();

    Ok(HttpResponse::Ok().json(json!({
        "post": PostItem::from(detail.post),
        "posts_count": detail.posts_count,
        "form": CommentFormContext::default(),
        "comments": comments,
    })))
}

/// GET /create/
pub async fn create_form(state: web::Data<AppState>, _user: CurrentUser) -> Result<HttpResponse> {
    let form = state.posts.empty_form().await?;
    Ok(HttpResponse::Ok().json(form_page(&form, false, None)))
}

/// POST /create/
pub async fn create_post(
    state: web::Data<AppState>,
    user: CurrentUser,
    payload: Multipart,
) -> Result<HttpResponse> {
    let data =
        PostFormData::from_multipart(payload, state.config.media.max_upload_bytes).await?;

    match state.posts.create(user.0.id, data).await? {
        Submission::Saved(_) => Ok(redirect(profile_url(&user.0.username))),
        Submission::Invalid(form) => {
            Ok(HttpResponse::BadRequest().json(form_page(&form, false, None)))
        }
    }
}

/// GET /posts/{post_id}/edit/
pub async fn edit_form(
    state: web::Data<AppState>,
    user: CurrentUser,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    match state.posts.edit_form(user.0.id, post_id).await? {
        Some(form) => Ok(HttpResponse::Ok().json(form_page(&form, true, Some(post_id)))),
        None => Ok(redirect(post_detail_url(post_id))),
    }
}

/// POST /posts/{post_id}/edit/
pub async fn edit_post(
    state: web::Data<AppState>,
    user: CurrentUser,
    post_id: web::Path<i64>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    // unknown post and non-author are decided before the body is read
    let post = state.posts.get_post(post_id).await?;
    if post.author_id != user.0.id {
        return Ok(redirect(post_detail_url(post_id)));
    }

    let data =
        PostFormData::from_multipart(payload, state.config.media.max_upload_bytes).await?;

    match state.posts.update(user.0.id, post_id, data).await? {
        EditOutcome::Saved(_) | EditOutcome::NotAuthor => Ok(redirect(post_detail_url(post_id))),
        EditOutcome::Invalid(form) => {
            Ok(HttpResponse::BadRequest().json(form_page(&form, true, Some(post_id))))
        }
    }
}

/// POST /posts/{post_id}/delete/
pub async fn delete_post(
    state: web::Data<AppState>,
    user: CurrentUser,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    match state.posts.delete(user.0.id, post_id).await? {
        (post, DeleteOutcome::Deleted) => Ok(redirect(profile_url(&post.author))),
        (_, DeleteOutcome::NotAuthor) => Ok(redirect(post_detail_url(post_id))),
    }
}
