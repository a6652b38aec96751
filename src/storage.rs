//! Product image files on local disk, served under `/product-images`.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

pub const BUCKET: &str = "product-images";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid image path")]
    InvalidPath,

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ImageStorage {
    root: PathBuf,
    public_base: String,
}

impl ImageStorage {
    pub fn new(root: impl Into<PathBuf>, public_base: impl AsRef<str>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.as_ref().trim_end_matches('/').to_string(),
        }
    }

    /// Directory that holds the bucket, mounted as a static file service.
    pub fn bucket_dir(&self) -> PathBuf {
        self.root.join(BUCKET)
    }

    /// `<product_id>/<unix_millis>.<ext>`
    pub fn key_for(product_id: Uuid, extension: &str) -> String {
        let ext = extension
            .trim_start_matches('.')
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let ext = if ext.is_empty() { "bin".to_string() } else { ext };
        format!("{product_id}/{}.{ext}", Utc::now().timestamp_millis())
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{BUCKET}/{key}", self.public_base)
    }

    /// Storage key from a public URL: whatever follows `/product-images/`.
    pub fn key_from_url(url: &str) -> Option<&str> {
        let marker = format!("/{BUCKET}/");
        let idx = url.find(&marker)?;
        let key = &url[idx + marker.len()..];
        (!key.is_empty()).then_some(key)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidPath);
        }
        Ok(self.bucket_dir().join(relative))
    }

    pub async fn save(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key, size = bytes.len(), "image stored");
        Ok(self.public_url(key))
    }

    /// Removing a file that is already gone is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(key, "image file already missing");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_and_url_round_trip() {
        let storage = ImageStorage::new("/tmp/unused", "http://localhost:3000/");
        let product_id = Uuid::new_v4();
        let key = ImageStorage::key_for(product_id, ".JPG");

        assert!(key.starts_with(&format!("{product_id}/")));
        assert!(key.ends_with(".jpg"));

        let url = storage.public_url(&key);
        assert!(url.starts_with("http://localhost:3000/product-images/"));
        assert_eq!(ImageStorage::key_from_url(&url), Some(key.as_str()));
    }

    #[test]
    fn url_without_bucket_has_no_key() {
        assert_eq!(ImageStorage::key_from_url("https://cdn.example/a.jpg"), None);
        assert_eq!(
            ImageStorage::key_from_url("http://h/product-images/"),
            None
        );
    }

    #[tokio::test]
    async fn save_then_delete() {
        let root = std::env::temp_dir().join(format!("hairlab-storage-{}", Uuid::new_v4()));
        let storage = ImageStorage::new(&root, "http://localhost");
        let key = ImageStorage::key_for(Uuid::new_v4(), "png");

        let url = storage.save(&key, b"png-bytes").await.unwrap();
        assert!(storage.bucket_dir().join(&key).exists());
        assert!(url.ends_with(&key));

        storage.delete(&key).await.unwrap();
        assert!(!storage.bucket_dir().join(&key).exists());
        storage.delete(&key).await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let storage = ImageStorage::new("/tmp/unused", "http://localhost");
        let err = storage.delete("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath));
    }
}
