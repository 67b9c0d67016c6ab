use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::debug;

use super::{check_key, BlobError, BlobReader, BlobStore};

const KEY_PREFIX: &str = "reference-letters/";

/// S3-compatible store (AWS or MinIO).
pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, name: &str, bytes: Bytes) -> Result<String, BlobError> {
        check_key(name)?;
        let key = format!("{KEY_PREFIX}{name}");
        let content_type = mime_guess::from_path(name)
            .first_or_octet_stream()
            .to_string();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| BlobError::Backend(format!("failed to upload {key}: {e}")))?;

        debug!(key = %key, bucket = %self.bucket, "Stored blob in S3");
        Ok(key)
    }

    async fn open(&self, path: &str) -> Result<BlobReader, BlobError> {
        let name = path
            .strip_prefix(KEY_PREFIX)
            .ok_or_else(|| BlobError::InvalidPath(path.to_string()))?;
        check_key(name)?;

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    BlobError::NotFound(path.to_string())
                } else {
                    BlobError::Backend(format!("failed to download {path}: {service_error}"))
                }
            })?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| BlobError::Backend(format!("failed to read {path}: {e}")))?
            .into_bytes();

        Ok(Box::new(std::io::Cursor::new(body)))
    }
}
