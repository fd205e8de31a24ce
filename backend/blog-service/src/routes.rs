//! Route table and URL helpers.

use actix_web::{http::header, web, HttpResponse};

use crate::handlers::{comments, feed, follow, health, media, posts};
use crate::metrics::serve_metrics;
use crate::middleware::CachePage;

pub fn configure(cfg: &mut web::ServiceConfig, index_cache: CachePage) {
    cfg.service(
        web::resource("/")
            .wrap(index_cache)
            .route(web::get().to(feed::index))
            .route(web::head().to(feed::index)),
    )
    .service(web::resource("/group/{slug}/").route(web::get().to(feed::group_posts)))
    .service(web::resource("/profile/{username}/").route(web::get().to(feed::profile)))
    .service(
        web::resource("/profile/{username}/follow/")
            .route(web::post().to(follow::profile_follow)),
    )
    .service(
        web::resource("/profile/{username}/unfollow/")
            .route(web::post().to(follow::profile_unfollow)),
    )
    .service(web::resource("/follow/").route(web::get().to(feed::follow_index)))
    .service(
        web::resource("/create/")
            .route(web::get().to(posts::create_form))
            .route(web::post().to(posts::create_post)),
    )
    .service(web::resource("/posts/{post_id}/").route(web::get().to(posts::post_detail)))
    .service(
        web::resource("/posts/{post_id}/edit/")
            .route(web::get().to(posts::edit_form))
            .route(web::post().to(posts::edit_post)),
    )
    .service(web::resource("/posts/{post_id}/delete/").route(web::post().to(posts::delete_post)))
    .service(
        web::resource("/posts/{post_id}/comment/").route(web::post().to(comments::add_comment)),
    )
    .service(
        web::resource("/posts/{post_id}/comments/{comment_id}/delete/")
            .route(web::post().to(comments::delete_comment)),
    )
    .service(web::resource("/media/{path:.*}").route(web::get().to(media::serve_media)))
    .route("/health", web::get().to(health::health))
    .route("/health/ready", web::get().to(health::readiness))
    .route("/health/live", web::get().to(health::liveness))
    .route("/metrics", web::get().to(serve_metrics));
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub fn post_detail_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

/// 302 to `location`
pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_match_route_table() {
        assert_eq!(profile_url("leo"), "/profile/leo/");
        assert_eq!(profile_url("a b"), "/profile/a%20b/");
        assert_eq!(post_detail_url(12), "/posts/12/");
    }

    #[test]
    fn redirect_sets_location() {
        let resp = redirect("/profile/leo/");
        assert_eq!(resp.status(), actix_web::http::StatusCode::FOUND);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/profile/leo/");
    }
}
