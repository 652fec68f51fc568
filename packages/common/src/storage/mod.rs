//! Content-addressed blob storage for uploaded files (story files, avatars).
//!
//! Uploads are stored by SHA-256 content hash, so re-uploading identical
//! content costs nothing and entity rows only carry the hash plus display
//! metadata (filename, content type, size).

mod filesystem;
mod hash;

use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

pub use filesystem::FilesystemBlobStore;
pub use hash::ContentHash;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Errors that can occur during blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),
    /// An I/O error occurred.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The provided content hash is invalid.
    #[error("invalid content hash: {0}")]
    InvalidHash(String),
    /// The blob exceeds the configured size limit.
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
}

/// Content-addressed blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return the content hash.
    async fn put(&self, data: &[u8]) -> Result<ContentHash, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(reader).await
    }

    /// Store data from an async reader and return the content hash.
    async fn put_stream(&self, reader: BoxReader) -> Result<ContentHash, StorageError>;

    /// Retrieve all bytes for a blob by its content hash.
    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(hash).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// Delete a blob by its content hash.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError>;
}
