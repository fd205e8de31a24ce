/// Configuration management for Blog Service
///
/// All settings come from environment variables (optionally seeded from a
/// `.env` file by the binary); every field has a development default.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

const DEV_JWT_SECRET: &str = "dev-only-insecure-secret";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Which repository implementation backs the service
    pub storage: StorageBackend,
    /// Page cache configuration
    pub cache: CacheConfig,
    /// Token validation and login redirects
    pub auth: AuthConfig,
    /// Uploaded image storage
    pub media: MediaConfig,
    /// Feed pagination
    pub feed: FeedConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
    /// actix worker count
    pub workers: usize,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
    /// Seconds allowed for the start-up `SELECT 1`
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown STORAGE_BACKEND '{}'", other)),
        }
    }
}

/// Page cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis URL; the in-memory cache is used when unset
    pub redis_url: Option<String>,
    /// Lifetime of a cached home feed page
    pub index_ttl_secs: u64,
    /// Static key prefix of the home feed entries
    pub index_key_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity service
    pub jwt_secret: String,
    /// Where anonymous users are sent for protected routes
    pub login_url: String,
    /// Lifetime of tokens minted by the `token` subcommand
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory holding uploaded files
    pub root: PathBuf,
    /// Upload size limit in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Posts per page
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app: AppConfig {
                env: "development".to_string(),
                host: "0.0.0.0".to_string(),
                port: 8000,
                workers: 4,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/yatube".to_string(),
                max_connections: 10,
                min_connections: 2,
                acquire_timeout_secs: 10,
                connect_timeout_secs: 5,
            },
            storage: StorageBackend::Postgres,
            cache: CacheConfig {
                redis_url: None,
                index_ttl_secs: 20,
                index_key_prefix: "index_page".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                login_url: "/auth/login/".to_string(),
                token_ttl_secs: 14 * 24 * 60 * 60,
            },
            media: MediaConfig {
                root: PathBuf::from("media"),
                max_upload_bytes: 5 * 1024 * 1024,
            },
            feed: FeedConfig { page_size: 10 },
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Config::default();
        let app_env = std::env::var("APP_ENV").unwrap_or(defaults.app.env);
        let production = app_env.eq_ignore_ascii_case("production");

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(value) if production && value == DEV_JWT_SECRET => {
                return Err("JWT_SECRET cannot use the development default in production".into())
            }
            Ok(value) if value.trim().is_empty() => {
                return Err("JWT_SECRET must not be empty".into())
            }
            Ok(value) => value,
            Err(_) if production => return Err("JWT_SECRET must be set in production".into()),
            Err(_) => defaults.auth.jwt_secret,
        };

        let storage = match std::env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.storage,
        };

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("BLOG_SERVICE_HOST").unwrap_or(defaults.app.host),
                port: parse_env_or_default("BLOG_SERVICE_PORT", defaults.app.port)?,
                workers: parse_env_or_default("BLOG_SERVICE_WORKERS", defaults.app.workers)?,
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: parse_env_or_default(
                    "DATABASE_MAX_CONNECTIONS",
                    defaults.database.max_connections,
                )?,
                min_connections: parse_env_or_default(
                    "DATABASE_MIN_CONNECTIONS",
                    defaults.database.min_connections,
                )?,
                acquire_timeout_secs: parse_env_or_default(
                    "DATABASE_ACQUIRE_TIMEOUT_SECS",
                    defaults.database.acquire_timeout_secs,
                )?,
                connect_timeout_secs: parse_env_or_default(
                    "DATABASE_CONNECT_TIMEOUT_SECS",
                    defaults.database.connect_timeout_secs,
                )?,
            },
            storage,
            cache: CacheConfig {
                redis_url: std::env::var("REDIS_URL")
                    .ok()
                    .filter(|url| !url.trim().is_empty()),
                index_ttl_secs: parse_env_or_default(
                    "INDEX_CACHE_TTL_SECS",
                    defaults.cache.index_ttl_secs,
                )?,
                index_key_prefix: std::env::var("INDEX_CACHE_KEY_PREFIX")
                    .unwrap_or(defaults.cache.index_key_prefix),
            },
            auth: AuthConfig {
                jwt_secret,
                login_url: std::env::var("LOGIN_URL").unwrap_or(defaults.auth.login_url),
                token_ttl_secs: parse_env_or_default(
                    "TOKEN_TTL_SECS",
                    defaults.auth.token_ttl_secs,
                )?,
            },
            media: MediaConfig {
                root: std::env::var("MEDIA_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.media.root),
                max_upload_bytes: parse_env_or_default(
                    "MEDIA_MAX_UPLOAD_BYTES",
                    defaults.media.max_upload_bytes,
                )?,
            },
            feed: FeedConfig {
                page_size: match parse_env_or_default("FEED_PAGE_SIZE", defaults.feed.page_size)? {
                    0 => return Err("FEED_PAGE_SIZE must be positive".into()),
                    size => size,
                },
            },
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
