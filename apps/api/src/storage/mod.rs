//! Blob storage for uploaded letters.
//!
//! Stores are only ever asked to write fresh, unique names, so concurrent
//! uploads never touch the same object.

pub mod local;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::AsyncRead;
use uuid::Uuid;

pub use local::LocalBlobStore;
pub use s3::S3BlobStore;

pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` under `name` and returns the path to hand back to `open`.
    async fn put(&self, name: &str, bytes: Bytes) -> Result<String, BlobError>;

    async fn open(&self, path: &str) -> Result<BlobReader, BlobError>;
}

/// Longest single path component most filesystems accept.
const MAX_BLOB_NAME_BYTES: usize = 255;
/// Extensions longer than this are treated as part of the stem.
const MAX_EXTENSION_BYTES: usize = 16;

/// `<uuid>-<file name>`; the file name must already be sanitized.
/// Long names are shortened to fit one path component, keeping the extension.
pub fn blob_name(file_name: &str) -> String {
    let prefix = Uuid::new_v4().to_string();
    let budget = MAX_BLOB_NAME_BYTES - prefix.len() - 1;
    format!("{prefix}-{}", fit_name(file_name, budget))
}

fn fit_name(file_name: &str, budget: usize) -> String {
    if file_name.len() <= budget {
        return file_name.to_string();
    }
    let (stem, extension) = match file_name.rfind('.') {
        Some(dot) if file_name.len() - dot <= MAX_EXTENSION_BYTES => file_name.split_at(dot),
        _ => (file_name, ""),
    };
    let mut cut = budget - extension.len();
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    // a trailing dot would form ".." with the extension
    format!("{}{extension}", stem[..cut].trim_end_matches('.'))
}

/// Rejects keys that could resolve outside the store.
fn check_key(key: &str) -> Result<(), BlobError> {
    if key.is_empty() || key.contains(|c: char| c == '/' || c == '\\') || key.contains("..") {
        return Err(BlobError::InvalidPath(key.to_string()));
    }
    Ok(())
}
