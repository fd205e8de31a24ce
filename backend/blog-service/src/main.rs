use std::io;
use std::sync::Arc;

use actix_web::HttpServer;
use blog_service::config::{Config, StorageBackend};
use blog_service::db::{pool, Store};
use blog_service::middleware::issue_token;
use blog_service::{build_app, AppState};
use page_cache::{MemoryPageCache, RedisPageCache, SharedPageCache};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").map_or(false, |v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn other_error(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::Other, message)
}

async fn build_store(config: &Config) -> io::Result<Store> {
    match config.storage {
        StorageBackend::Postgres => {
            let db_pool = pool::create_pool(&config.database)
                .await
                .map_err(|e| other_error(format!("Failed to create database pool: {}", e)))?;
            pool::migrate(&db_pool)
                .await
                .map_err(|e| other_error(format!("Failed to run migrations: {}", e)))?;
            tracing::info!("Connected to PostgreSQL");
            Ok(Store::postgres(db_pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Store::in_memory())
        }
    }
}

async fn build_page_cache(config: &Config) -> io::Result<SharedPageCache> {
    match &config.cache.redis_url {
        Some(url) => {
            let cache = RedisPageCache::connect(url)
                .await
                .map_err(|e| other_error(format!("Failed to connect to Redis: {}", e)))?;
            tracing::info!("Page cache backed by Redis");
            Ok(Arc::new(cache))
        }
        None => {
            tracing::info!("Page cache backed by process memory");
            Ok(Arc::new(MemoryPageCache::new()))
        }
    }
}

/// `blog-service token <username>`: print a token for an existing user
async fn print_token(config: Config, username: &str) -> io::Result<()> {
    let store = build_store(&config).await?;
    let user = store
        .users
        .find_by_username(username)
        .await
        .map_err(|e| other_error(format!("{:#}", e)))?
        .ok_or_else(|| other_error(format!("user '{}' not found", username)))?;

    let token = issue_token(&config.auth.jwt_secret, &user, config.auth.token_ttl_secs)
        .map_err(|e| other_error(format!("Failed to sign token: {}", e)))?;
    println!("{}", token);
    Ok(())
}

/// Blog Service
///
/// Serves the public feeds, profiles and post pages plus the authenticated
/// write endpoints (posts, comments, follows).
///
/// # Subcommands
///
/// - `healthcheck`: probe `/health/live` on the local port, for container healthchecks
/// - `token <username>`: print a signed access token for a user
#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    {
        let mut args = std::env::args();
        let _bin = args.next();
        match args.next().as_deref() {
            Some("healthcheck") => {
                let url = format!("http://127.0.0.1:{}/health/live", config.app.port);
                return match reqwest::Client::new().get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => Ok(()),
                    Ok(resp) => {
                        eprintln!("healthcheck HTTP status: {}", resp.status());
                        Err(other_error("healthcheck failed".into()))
                    }
                    Err(e) => {
                        eprintln!("healthcheck HTTP error: {}", e);
                        Err(other_error("healthcheck error".into()))
                    }
                };
            }
            Some("token") => {
                let username = args
                    .next()
                    .ok_or_else(|| other_error("usage: blog-service token <username>".into()))?;
                return print_token(config, &username).await;
            }
            _ => {}
        }
    }

    init_tracing();

    tracing::info!("Starting blog-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let store = build_store(&config).await?;
    let page_cache = build_page_cache(&config).await?;

    tokio::fs::create_dir_all(&config.media.root).await?;

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let workers = config.app.workers;
    let state = AppState::new(config, store, page_cache);

    tracing::info!("Starting HTTP server at {}", bind_address);

    let server = HttpServer::new(move || {
        build_app(state.clone()).wrap(tracing_actix_web::TracingLogger::default())
    })
    .workers(workers)
    .bind(&bind_address)?
    .run();

    let handle = server.handle();
    tokio::select! {
        result = server => {
            if let Err(e) = &result {
                tracing::error!("HTTP server error: {}", e);
            }
            result
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, stopping HTTP server");
            handle.stop(true).await;
            Ok(())
        }
    }
}
