mod local;

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::path::Path;

pub use self::local::LocalObjectStore;

/// Named namespaces for stored files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Photos,
    FoodPhotos,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Photos => "photos",
            Bucket::FoodPhotos => "food-photos",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "photos" => Some(Bucket::Photos),
            "food-photos" => Some(Bucket::FoodPhotos),
            _ => None,
        }
    }

    pub const ALL: [Bucket; 2] = [Bucket::Photos, Bucket::FoodPhotos];
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object storage contract. Keys are `/`-separated relative paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`. Fails with `AlreadyExists` rather than
    /// overwriting an existing object.
    async fn upload(&self, bucket: Bucket, key: &str, data: Bytes) -> std::io::Result<String>;

    /// Public retrieval URL for a key. Pure; does not check existence.
    fn public_url(&self, bucket: Bucket, key: &str) -> String;

    async fn read(&self, bucket: Bucket, key: &str) -> std::io::Result<Bytes>;

    /// Remove keys. Missing keys are not an error.
    async fn remove(&self, bucket: Bucket, keys: &[String]) -> std::io::Result<()>;

    /// Remove every key under `{owner}/`.
    async fn remove_owner(&self, bucket: Bucket, owner: &str) -> std::io::Result<()>;
}

/// Build the `{owner}/{timestamp}.{ext}` key for an upload.
pub fn object_key(owner: &str, millis: i64, file_name: &str) -> String {
    format!("{}/{}.{}", owner, millis, extension(file_name))
}

/// Lowercased final extension of a file name, `bin` when it has none.
pub fn extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

/// Recover the storage key from a persisted public URL.
/// Returns `None` when the URL does not point into `bucket`.
pub fn key_from_url(bucket: Bucket, url: &str) -> Option<String> {
    let marker = format!("/{}/", bucket.as_str());
    let (_, rest) = url.split_once(marker.as_str())?;
    let key = rest.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Keys must stay inside their bucket.
pub fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..")
}
