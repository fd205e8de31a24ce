//! Shared application state and the actix `App` factory.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web, App,
};
use page_cache::SharedPageCache;

use crate::config::Config;
use crate::db::Store;
use crate::handlers;
use crate::media::MediaStorage;
use crate::middleware::{Authentication, CachePage};
use crate::routes;
use crate::services::{CommentService, FeedService, FollowService, PostService};

/// State shared by every worker
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
    pub page_cache: SharedPageCache,
    pub media: Arc<MediaStorage>,
    pub feed: FeedService,
    pub posts: PostService,
    pub comments: CommentService,
    pub follows: FollowService,
}

impl AppState {
    pub fn new(config: Config, store: Store, page_cache: SharedPageCache) -> Self {
        let media = Arc::new(MediaStorage::new(
            config.media.root.clone(),
            config.media.max_upload_bytes,
        ));

        Self {
            feed: FeedService::new(store.clone(), config.feed.page_size),
            posts: PostService::new(store.clone(), media.clone()),
            comments: CommentService::new(store.clone()),
            follows: FollowService::new(store.clone()),
            config: Arc::new(config),
            store,
            page_cache,
            media,
        }
    }
}

/// Build the application with every route, used by `main` and the HTTP tests
pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let authentication = Authentication::new(&state.config.auth.jwt_secret);
    let index_cache = CachePage::new(
        state.page_cache.clone(),
        state.config.cache.index_key_prefix.clone(),
        Duration::from_secs(state.config.cache.index_ttl_secs),
    );

    App::new()
        .app_data(web::Data::new(state))
        .wrap(authentication)
        .configure(|cfg| routes::configure(cfg, index_cache))
        .default_service(web::to(handlers::not_found))
}
