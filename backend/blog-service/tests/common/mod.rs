#![allow(dead_code)]

use std::sync::Arc;

use actix_web::http::header;
use blog_service::config::{Config, StorageBackend};
use blog_service::db::Store;
use blog_service::middleware::issue_token;
use blog_service::models::{Group, NewGroup, NewPost, Post, User};
use blog_service::AppState;
use page_cache::MemoryPageCache;
use tempfile::TempDir;

pub const SECRET: &str = "integration-test-secret";

pub const BOUNDARY: &str = "yatube-test-boundary";

pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x00,
    0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

/// In-memory application plus direct access to its store
pub struct TestEnv {
    pub state: AppState,
    pub store: Store,
    pub media_dir: TempDir,
}

pub fn test_config(media_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage = StorageBackend::Memory;
    config.auth.jwt_secret = SECRET.to_string();
    config.media.root = media_dir.path().to_path_buf();
    config
}

pub fn test_env() -> TestEnv {
    test_env_with(|_| {})
}

/// Like [`test_env`] with a hook to adjust the configuration first
pub fn test_env_with(adjust: impl FnOnce(&mut Config)) -> TestEnv {
    let media_dir = tempfile::tempdir().expect("media dir");
    let store = Store::in_memory();
    let mut config = test_config(&media_dir);
    adjust(&mut config);
    let state = AppState::new(
        config,
        store.clone(),
        Arc::new(MemoryPageCache::new()),
    );

    TestEnv {
        state,
        store,
        media_dir,
    }
}

impl TestEnv {
    pub async fn user(&self, username: &str) -> User {
        self.store
            .users
            .create_user(username)
            .await
            .expect("create user")
    }

    pub async fn group(&self, title: &str, slug: &str) -> Group {
        self.store
            .groups
            .create_group(NewGroup {
                title: title.to_string(),
                slug: slug.to_string(),
                description: "Test description".to_string(),
            })
            .await
            .expect("create group")
    }

    pub async fn post(&self, author: &User, group: Option<&Group>, text: &str) -> Post {
        self.store
            .posts
            .create_post(NewPost {
                text: text.to_string(),
                author_id: author.id,
                group_id: group.map(|g| g.id),
                image: None,
            })
            .await
            .expect("create post")
    }
}

/// `Authorization` header for `user`
pub fn bearer(user: &User) -> (header::HeaderName, String) {
    let token = issue_token(SECRET, user, 3600).expect("sign token");
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

/// Build a `multipart/form-data` body; `file` is (filename, content type, bytes)
pub fn multipart_body(
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, data)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

pub fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
