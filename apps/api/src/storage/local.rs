use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::{check_key, BlobError, BlobReader, BlobStore};

/// Keeps blobs as files in one directory.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, name: &str, bytes: Bytes) -> Result<String, BlobError> {
        check_key(name)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(name), &bytes).await?;
        debug!(name, size = bytes.len(), "Stored blob on local disk");
        Ok(name.to_string())
    }

    async fn open(&self, path: &str) -> Result<BlobReader, BlobError> {
        check_key(path)?;
        match tokio::fs::File::open(self.root.join(path)).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(path.to_string()))
            }
            Err(e) => Err(BlobError::Io(e)),
        }
    }
}
