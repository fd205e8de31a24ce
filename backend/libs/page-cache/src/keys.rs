//! Page cache key schema
//!
//! Key format: v{VERSION}:page:{prefix}:{METHOD}:{sha256(path?query)}

use sha2::{Digest, Sha256};

/// Cache schema version - increment when changing key formats
pub const CACHE_VERSION: u32 = 1;

/// Key builder bound to one view's static prefix
#[derive(Debug, Clone)]
pub struct PageKey {
    prefix: String,
}

impl PageKey {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Key for one request; the URL is hashed so arbitrary query strings stay bounded
    pub fn for_request(&self, method: &str, path_and_query: &str) -> String {
        let digest = Sha256::digest(path_and_query.as_bytes());
        format!(
            "v{}:page:{}:{}:{}",
            CACHE_VERSION,
            self.prefix,
            method.to_ascii_uppercase(),
            hex::encode(digest)
        )
    }
}
