//! Prometheus metrics for blog-service.
//!
//! Collectors are registered in the default registry on first use and exposed
//! on `/metrics`.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Feed page renders segmented by feed (index, group, profile, follow).
    pub static ref FEED_REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_feed_request_total",
        "Total feed pages rendered segmented by feed",
        &["feed"]
    )
    .expect("failed to register blog_feed_request_total");

    /// Time spent loading one feed page from storage.
    pub static ref FEED_QUERY_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "blog_feed_query_duration_seconds",
        "Feed storage query duration segmented by feed",
        &["feed"]
    )
    .expect("failed to register blog_feed_query_duration_seconds");

    /// Page cache events (hit/miss/store/bypass/error).
    pub static ref PAGE_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "blog_page_cache_events_total",
        "Page cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register blog_page_cache_events_total");

    /// Follow graph mutations segmented by action and outcome.
    pub static ref FOLLOW_MUTATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_follow_mutations_total",
        "Follow and unfollow requests segmented by outcome",
        &["action", "outcome"]
    )
    .expect("failed to register blog_follow_mutations_total");

    /// Content writes (post_created, post_edited, post_deleted, comment_created, comment_deleted).
    pub static ref CONTENT_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_content_writes_total",
        "Successful content writes segmented by kind",
        &["kind"]
    )
    .expect("failed to register blog_content_writes_total");
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
