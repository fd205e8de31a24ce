use std::time::Instant;

use actix_web::{web, HttpResponse};
use serde::Serialize;
use serde_json::json;

use crate::app::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    latency_ms: u64,
}

impl ComponentCheck {
    fn from_result<E: std::fmt::Display>(
        name: &str,
        result: std::result::Result<(), E>,
        started: Instant,
    ) -> Self {
        let latency_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(()) => Self {
                status: ComponentStatus::Healthy,
                message: format!("{} reachable", name),
                latency_ms,
            },
            Err(e) => Self {
                status: ComponentStatus::Unhealthy,
                message: format!("{} check failed: {}", name, e),
                latency_ms,
            },
        }
    }

    fn is_healthy(&self) -> bool {
        matches!(self.status, ComponentStatus::Healthy)
    }
}

/// GET /health
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match state.store.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "service": "blog-service",
            "version": env!("CARGO_PKG_VERSION"),
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(json!({
            "status": "unhealthy",
            "error": format!("storage check failed: {:#}", e),
            "service": "blog-service",
        })),
    }
}

/// GET /health/ready - storage and page cache
pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    let started = Instant::now();
    let storage = ComponentCheck::from_result("storage", state.store.ping().await, started);

    let started = Instant::now();
    let cache = ComponentCheck::from_result("page_cache", state.page_cache.ping().await, started);

    // an unavailable cache degrades latency but never correctness
    let ready = storage.is_healthy();
    if !cache.is_healthy() {
        tracing::warn!(detail = %cache.message, "Page cache not reachable");
    }

    let body = json!({
        "ready": ready,
        "checks": {
            "storage": storage,
            "page_cache": cache,
        },
    });

    if ready {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

/// GET /health/live
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "alive": true }))
}
