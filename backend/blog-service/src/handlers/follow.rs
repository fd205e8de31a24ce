use actix_web::{web, HttpResponse};

use crate::app::AppState;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::routes::{profile_url, redirect};

/// POST /profile/{username}/follow/
pub async fn profile_follow(
    state: web::Data<AppState>,
    user: CurrentUser,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let (author, _) = state.follows.follow(user.0.id, &username).await?;
    Ok(redirect(profile_url(&author.username)))
}

/// POST /profile/{username}/unfollow/
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    user: CurrentUser,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let (author, _) = state.follows.unfollow(user.0.id, &username).await?;
    Ok(redirect(profile_url(&author.username)))
}
