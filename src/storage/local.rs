use async_trait::async_trait;
use bytes::Bytes;
use std::io::{Error, ErrorKind};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use super::{is_safe_key, Bucket, ObjectStore};

/// Filesystem-backed object store: `{root}/{bucket}/{key}`.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: String,
}

impl LocalObjectStore {
    /// `public_base` is the server's external URL, e.g. `http://localhost:3000`.
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, bucket: Bucket, key: &str) -> std::io::Result<PathBuf> {
        if !is_safe_key(key) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("invalid storage key: {}", key),
            ));
        }
        Ok(self.root.join(bucket.as_str()).join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, bucket: Bucket, key: &str, data: Bytes) -> std::io::Result<String> {
        let path = self.path_for(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(&data).await?;
        file.flush().await?;

        tracing::debug!(bucket = %bucket, key, size = data.len(), "Stored object");
        Ok(key.to_string())
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        format!("{}/storage/{}/{}", self.public_base, bucket.as_str(), key)
    }

    async fn read(&self, bucket: Bucket, key: &str) -> std::io::Result<Bytes> {
        let path = self.path_for(bucket, key)?;
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }

    async fn remove(&self, bucket: Bucket, keys: &[String]) -> std::io::Result<()> {
        for key in keys {
            let path = self.path_for(bucket, key)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn remove_owner(&self, bucket: Bucket, owner: &str) -> std::io::Result<()> {
        let dir = self.path_for(bucket, owner)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalObjectStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(tmp.path(), "http://localhost:3000/");
        (tmp, store)
    }

    #[tokio::test]
    async fn upload_then_read_round_trips_bytes() {
        let (_tmp, store) = store();
        let key = store
            .upload(Bucket::Photos, "u1/1.jpg", Bytes::from_static(b"jpeg"))
            .await
            .unwrap();
        assert_eq!(key, "u1/1.jpg");
        let data = store.read(Bucket::Photos, "u1/1.jpg").await.unwrap();
        assert_eq!(&data[..], b"jpeg");
    }

    #[tokio::test]
    async fn upload_refuses_to_overwrite() {
        let (_tmp, store) = store();
        store
            .upload(Bucket::Photos, "u1/1.jpg", Bytes::from_static(b"a"))
            .await
            .unwrap();
        let err = store
            .upload(Bucket::Photos, "u1/1.jpg", Bytes::from_static(b"b"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn remove_deletes_and_tolerates_missing_keys() {
        let (_tmp, store) = store();
        store
            .upload(Bucket::FoodPhotos, "u1/1.png", Bytes::from_static(b"a"))
            .await
            .unwrap();
        store
            .remove(
                Bucket::FoodPhotos,
                &["u1/1.png".to_string(), "u1/missing.png".to_string()],
            )
            .await
            .unwrap();
        let err = store.read(Bucket::FoodPhotos, "u1/1.png").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn remove_owner_clears_namespace_only() {
        let (_tmp, store) = store();
        for key in ["u1/1.jpg", "u1/2.jpg", "u2/1.jpg"] {
            store
                .upload(Bucket::Photos, key, Bytes::from_static(b"x"))
                .await
                .unwrap();
        }
        store.remove_owner(Bucket::Photos, "u1").await.unwrap();
        assert!(store.read(Bucket::Photos, "u1/2.jpg").await.is_err());
        assert!(store.read(Bucket::Photos, "u2/1.jpg").await.is_ok());
        // Second call finds nothing to do
        store.remove_owner(Bucket::Photos, "u1").await.unwrap();
    }

    #[tokio::test]
    async fn traversal_keys_are_refused() {
        let (_tmp, store) = store();
        let err = store.read(Bucket::Photos, "../secret").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn public_url_has_no_double_slash() {
        let (_tmp, store) = store();
        assert_eq!(
            store.public_url(Bucket::Photos, "u1/1.jpg"),
            "http://localhost:3000/storage/photos/u1/1.jpg"
        );
    }
}
