/// Feed service - builds paginated, newest-first post listings
use std::time::Instant;

use crate::db::{PostFilter, Store};
use crate::error::{AppError, Result};
use crate::metrics::{FEED_QUERY_DURATION_SECONDS, FEED_REQUEST_TOTAL};
use crate::models::{Group, PostView, User};
use crate::pagination::{Page, Paginator};

/// Profile page data: the author's posts plus follow counters
#[derive(Debug)]
pub struct ProfileFeed {
    pub author: User,
    pub page: Page<PostView>,
    pub posts_count: usize,
    pub followers_count: i64,
    pub following_count: i64,
    pub following: bool,
}

#[derive(Clone)]
pub struct FeedService {
    store: Store,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(store: Store, page_size: usize) -> Self {
        Self {
            store,
            paginator: Paginator::new(page_size),
        }
    }

    async fn page(
        &self,
        feed: &'static str,
        filter: PostFilter,
        raw_page: Option<&str>,
    ) -> Result<Page<PostView>> {
        FEED_REQUEST_TOTAL.with_label_values(&[feed]).inc();
        let started = Instant::now();

        let count = self.store.posts.count_posts(filter).await?;
        let window = self.paginator.window(count, raw_page);
        let posts = self
            .store
            .posts
            .list_posts(filter, window.limit, window.offset)
            .await?;

        FEED_QUERY_DURATION_SECONDS
            .with_label_values(&[feed])
            .observe(started.elapsed().as_secs_f64());
        tracing::debug!(
            feed,
            page = window.number,
            num_pages = window.num_pages,
            count,
            "Loaded feed page"
        );

        Ok(Page::new(window, posts))
    }

    /// Every post, newest first
    pub async fn global(&self, raw_page: Option<&str>) -> Result<Page<PostView>> {
        self.page("index", PostFilter::All, raw_page).await
    }

    pub async fn group(&self, slug: &str, raw_page: Option<&str>) -> Result<(Group, Page<PostView>)> {
        let group = self
            .store
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("group '{}'", slug)))?;

        let page = self.page("group", PostFilter::Group(group.id), raw_page).await?;
        Ok((group, page))
    }

    /// `following` is false for anonymous viewers and for the author themselves
    pub async fn profile(
        &self,
        username: &str,
        viewer_id: Option<i64>,
        raw_page: Option<&str>,
    ) -> Result<ProfileFeed> {
        let author = self
            .store
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))?;

        let page = self
            .page("profile", PostFilter::Author(author.id), raw_page)
            .await?;
        let followers_count = self.store.follows.count_followers(author.id).await?;
        let following_count = self.store.follows.count_following(author.id).await?;
        let following = match viewer_id {
            Some(viewer_id) if viewer_id != author.id => {
                self.store.follows.is_following(viewer_id, author.id).await?
            }
            _ => false,
        };

        Ok(ProfileFeed {
            posts_count: page.count,
            author,
            page,
            followers_count,
            following_count,
            following,
        })
    }

    /// Posts by the authors `user_id` follows
    pub async fn followed(&self, user_id: i64, raw_page: Option<&str>) -> Result<Page<PostView>> {
        self.page("follow", PostFilter::FollowedBy(user_id), raw_page)
            .await
    }
}
