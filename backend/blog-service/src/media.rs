//! Uploaded image storage on the local filesystem.
//!
//! Files live under `<root>/posts/` and are referenced by their path relative
//! to the root (`posts/small.gif`), which is what the `image` column stores.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use image::GenericImageView;
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Directory under the media root holding post images
pub const POST_IMAGE_DIR: &str = "posts";

const SUFFIX_LEN: usize = 7;
const MAX_NAME_ATTEMPTS: usize = 16;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    InvalidImage(#[from] image::ImageError),

    #[error("File size exceeds limit: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Errors caused by the uploaded file itself rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, MediaError::InvalidImage(_) | MediaError::TooLarge(..))
    }
}

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    max_upload_bytes: usize,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, max_upload_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Check that `data` decodes as an image, returning its dimensions
    pub fn validate_image(&self, data: &[u8]) -> Result<(u32, u32), MediaError> {
        if data.len() > self.max_upload_bytes {
            return Err(MediaError::TooLarge(data.len(), self.max_upload_bytes));
        }

        let img = image::load_from_memory(data)?;
        Ok(img.dimensions())
    }

    /// Validate and store an uploaded image, returning its relative path
    ///
    /// An existing file is never overwritten; a random suffix is added to the
    /// stem until the name is free.
    pub async fn save_post_image(&self, filename: &str, data: &[u8]) -> Result<String, MediaError> {
        self.validate_image(data)?;

        let dir = self.root.join(POST_IMAGE_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let name = sanitize_filename(filename);
        let mut candidate = name.clone();
        for _ in 0..MAX_NAME_ATTEMPTS {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(&candidate))
                .await
            {
                Ok(mut file) => {
                    file.write_all(data).await?;
                    file.flush().await?;
                    let relative = format!("{}/{}", POST_IMAGE_DIR, candidate);
                    tracing::debug!(path = %relative, bytes = data.len(), "Stored post image");
                    return Ok(relative);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    candidate = with_random_suffix(&name);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(MediaError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free file name for '{}'", name),
        )))
    }

    /// Map a relative media path onto the filesystem, refusing traversal
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        if relative.is_empty()
            || !path
                .components()
                .all(|component| matches!(component, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(path))
    }

    /// Public URL of a stored file
    pub fn url(relative: &str) -> String {
        format!("/media/{}", relative)
    }
}

/// Keep the final path segment and replace anything unsafe with `_`
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

fn with_random_suffix(name: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", name, suffix),
    }
}
