//! Whole-response cache for a single route.
//!
//! Wraps a resource so that successful `GET`/`HEAD` responses are stored in
//! the page cache for a fixed TTL and replayed verbatim until they expire.
//! Cache backend failures are logged and the request is served uncached.

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;

use actix_web::{
    body::{self, BoxBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        header::{self, HeaderValue},
        Method, StatusCode,
    },
    Error, HttpResponse,
};
use futures::future::{ready, Ready};
use page_cache::{CachedPage, PageKey, SharedPageCache};

use crate::metrics::PAGE_CACHE_EVENTS;

#[derive(Clone)]
pub struct CachePage {
    cache: SharedPageCache,
    key: PageKey,
    ttl: Duration,
}

impl CachePage {
    pub fn new(cache: SharedPageCache, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cache,
            key: PageKey::new(prefix),
            ttl,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CachePage
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = CachePageService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CachePageService {
            service: Rc::new(service),
            config: self.clone(),
        }))
    }
}

pub struct CachePageService<S> {
    service: Rc<S>,
    config: CachePage,
}

fn cache_control(ttl: Duration) -> HeaderValue {
    HeaderValue::from_str(&format!("max-age={}", ttl.as_secs()))
        .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
}

fn replay(page: CachedPage, ttl: Duration) -> HttpResponse {
    let status = StatusCode::from_u16(page.status).unwrap_or(StatusCode::OK);
    let mut builder = HttpResponse::build(status);
    if let Some(content_type) = page.content_type {
        builder.insert_header((header::CONTENT_TYPE, content_type));
    }
    builder
        .insert_header((header::CACHE_CONTROL, cache_control(ttl)))
        .body(page.body)
}

impl<S, B> Service<ServiceRequest> for CachePageService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let CachePage { cache, key, ttl } = self.config.clone();

        Box::pin(async move {
            let method = req.method().clone();
            if method != Method::GET && method != Method::HEAD {
                PAGE_CACHE_EVENTS.with_label_values(&["bypass"]).inc();
                return service.call(req).await.map(|res| res.map_into_boxed_body());
            }

            let path_and_query = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| req.path().to_string());
            let cache_key = key.for_request(method.as_str(), &path_and_query);

            match cache.get(&cache_key).await {
                Ok(Some(page)) => {
                    PAGE_CACHE_EVENTS.with_label_values(&["hit"]).inc();
                    tracing::debug!(key = %cache_key, "Page cache hit");
                    let (http_req, _payload) = req.into_parts();
                    return Ok(ServiceResponse::new(http_req, replay(page, ttl)));
                }
                Ok(None) => {
                    PAGE_CACHE_EVENTS.with_label_values(&["miss"]).inc();
                }
                Err(e) => {
                    PAGE_CACHE_EVENTS.with_label_values(&["error"]).inc();
                    tracing::warn!(key = %cache_key, error = %e, "Page cache read failed");
                }
            }

            let res = service.call(req).await?;
            if res.status() != StatusCode::OK {
                return Ok(res.map_into_boxed_body());
            }

            let (http_req, response) = res.into_parts();
            let (mut head, body) = response.into_parts();
            let bytes = body::to_bytes(body).await.map_err(|e| {
                let e: Box<dyn std::error::Error> = e.into();
                actix_web::error::ErrorInternalServerError(e.to_string())
            })?;

            let content_type = head
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let page = CachedPage::new(head.status().as_u16(), content_type, bytes.to_vec());

            match cache.set(&cache_key, &page, ttl).await {
                Ok(()) => {
                    PAGE_CACHE_EVENTS.with_label_values(&["store"]).inc();
                }
                Err(e) => {
                    PAGE_CACHE_EVENTS.with_label_values(&["error"]).inc();
                    tracing::warn!(key = %cache_key, error = %e, "Page cache write failed");
                }
            }

            head.headers_mut()
                .insert(header::CACHE_CONTROL, cache_control(ttl));
            let response = head.set_body(BoxBody::new(bytes));
            Ok(ServiceResponse::new(http_req, response))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};
    use page_cache::MemoryPageCache;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn counter(hits: web::Data<AtomicUsize>) -> HttpResponse {
        let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
        HttpResponse::Ok().body(format!("render {}", n))
    }

    fn cache() -> SharedPageCache {
        Arc::new(MemoryPageCache::new())
    }

    #[actix_web::test]
    async fn second_read_is_served_from_cache() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AtomicUsize::new(0)))
                .service(
                    web::resource("/")
                        .wrap(CachePage::new(cache(), "index_page", Duration::from_secs(20)))
                        .route(web::get().to(counter)),
                ),
        )
        .await;

        let first = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(
            first.headers().get(header::CACHE_CONTROL).unwrap(),
            "max-age=20"
        );
        assert_eq!(test::read_body(first).await, "render 1");

        let second = test::TestRequest::get().uri("/").to_request();
        assert_eq!(test::call_and_read_body(&app, second).await, "render 1");

        let other_page = test::TestRequest::get().uri("/?page=2").to_request();
        assert_eq!(test::call_and_read_body(&app, other_page).await, "render 2");
    }

    #[actix_web::test]
    async fn error_responses_are_not_stored() {
        async fn missing(hits: web::Data<AtomicUsize>) -> HttpResponse {
            hits.fetch_add(1, Ordering::SeqCst);
            HttpResponse::NotFound().finish()
        }

        let hits = web::Data::new(AtomicUsize::new(0));
        let app = test::init_service(
            App::new().app_data(hits.clone()).service(
                web::resource("/")
                    .wrap(CachePage::new(cache(), "index_page", Duration::from_secs(20)))
                    .route(web::get().to(missing)),
            ),
        )
        .await;

        for _ in 0..2 {
            let resp =
                test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
