use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::hash::ContentHash;
use super::{BlobStore, BoxReader, StorageError};

/// Filesystem-backed content-addressed blob store.
///
/// Blobs live under `{root}/{first 2 hex chars}/{remaining 62 hex chars}`.
/// Writes go through a temp file in `{root}/.tmp` and are renamed into
/// place, so concurrent uploads of the same content cannot corrupt a blob.
pub struct FilesystemBlobStore {
    root: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create the store, ensuring the root and temp directories exist.
    pub async fn new(root: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self { root, max_size })
    }

    fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        let (shard, rest) = hash.shard_parts();
        self.root.join(shard).join(rest)
    }

    fn temp_path(&self) -> PathBuf {
        self.root.join(".tmp").join(uuid::Uuid::new_v4().to_string())
    }

    async fn promote_temp(
        &self,
        temp_path: &PathBuf,
        hash: ContentHash,
    ) -> Result<ContentHash, StorageError> {
        let blob_path = self.blob_path(&hash);

        if blob_path.exists() {
            let _ = fs::remove_file(temp_path).await;
            return Ok(hash);
        }

        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(temp_path, &blob_path).await {
            let _ = fs::remove_file(temp_path).await;
            return Err(e.into());
        }

        Ok(hash)
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put_stream(&self, mut reader: BoxReader) -> Result<ContentHash, StorageError> {
        let temp_path = self.temp_path();
        let mut hasher = Sha256::new();
        let mut total_bytes: u64 = 0;

        let mut buf = vec![0u8; 64 * 1024];
        let mut temp_file = fs::File::create(&temp_path).await?;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                drop(temp_file);
                let _ = fs::remove_file(&temp_path).await;
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            hasher.update(&buf[..n]);
            temp_file.write_all(&buf[..n]).await?;
        }

        temp_file.flush().await?;
        drop(temp_file);

        let hash = ContentHash::from_bytes(hasher.finalize().into());
        self.promote_temp(&temp_path, hash).await
    }

    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.blob_path(hash)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(hash.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        Ok(fs::try_exists(&self.blob_path(hash)).await?)
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        match fs::remove_file(self.blob_path(hash)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
