use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use super::{page_param, PostItem};
use crate::app::AppState;
use crate::error::Result;
use crate::middleware::{CurrentUser, Viewer};

/// GET / - every post, newest first
pub async fn index(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let page = state.feed.global(page_param(&req).as_deref()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "page_obj": page.map(PostItem::from),
    })))
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    slug: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let (group, page) = state.feed.group(&slug, page_param(&req).as_deref()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "group": group,
        "page_obj": page.map(PostItem::from),
    })))
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    username: web::Path<String>,
    viewer: Viewer,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let profile = state
        .feed
        .profile(&username, viewer.id(), page_param(&req).as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "author": {
            "id": profile.author.id,
            "username": profile.author.username,
        },
        "page_obj": profile.page.map(PostItem::from),
        "posts_count": profile.posts_count,
        "followers_count": profile.followers_count,
        "following_count": profile.following_count,
        "following": profile.following,
    })))
}

/// GET /follow/ - posts by followed authors
pub async fn follow_index(
    state: web::Data<AppState>,
    user: CurrentUser,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let page = state
        .feed
        .followed(user.0.id, page_param(&req).as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "page_obj": page.map(PostItem::from),
    })))
}
