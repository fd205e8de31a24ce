//! Blog Service Library
//!
//! A community blogging service: users publish short text posts with an
//! optional image, file them under groups, comment on each other's posts and
//! follow authors to get a personal feed.
//!
//! # Modules
//!
//! - `app`: shared state and the actix `App` factory
//! - `config`: configuration management
//! - `db`: repository traits with Postgres and in-memory backends
//! - `error`: error types and HTTP mapping
//! - `forms`: form parsing and validation
//! - `handlers`: HTTP request handlers
//! - `media`: uploaded image storage
//! - `metrics`: Prometheus collectors
//! - `middleware`: token authentication and the page cache
//! - `models`: data structures for users, groups, posts, comments, follows
//! - `pagination`: page slicing for feeds
//! - `routes`: route table and URL helpers
//! - `services`: business logic layer

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod media;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod services;

pub use app::{build_app, AppState};
pub use config::Config;
pub use error::{AppError, Result};
