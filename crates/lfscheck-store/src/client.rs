//! Store clients.
//!
//! [`LfsStore`] is the seam the checker and remediation engine work against.
//! [`CloudStore`] implements it over any `object_store` backend, resolving
//! object keys through a [`KeyLayout`] and bounding every call with a
//! timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lfscheck_config::{StoreConfig, StoreProvider};
use lfscheck_core::{KeyLayout, Oid, RepoReference};
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as StorePath;
use object_store::{ClientOptions, ObjectStore, PutPayload};

use crate::error::StoreError;

/// Existence, download and upload of LFS objects.
pub trait LfsStore: Send + Sync + 'static {
    /// Short name used in logs and errors (`source`, `target`).
    fn name(&self) -> &str;

    /// Whether the object is present. A missing object is `Ok(false)`.
    fn exists(
        &self,
        repo: &RepoReference,
        oid: &Oid,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Full object content.
    fn get(
        &self,
        repo: &RepoReference,
        oid: &Oid,
    ) -> impl Future<Output = Result<Vec<u8>, StoreError>> + Send;

    /// Write the object. Writing an existing key overwrites it with the same
    /// content, so uploads are idempotent.
    fn put(
        &self,
        repo: &RepoReference,
        oid: &Oid,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// An `object_store` backend plus key layout.
#[derive(Debug, Clone)]
pub struct CloudStore {
    name: String,
    inner: Arc<dyn ObjectStore>,
    prefix: String,
    layout: KeyLayout,
    timeout: Duration,
}

impl CloudStore {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        inner: Arc<dyn ObjectStore>,
        prefix: impl Into<String>,
        layout: KeyLayout,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            inner,
            prefix: prefix.into(),
            layout,
            timeout,
        }
    }

    /// Build a client from configuration. Credentials come from the
    /// environment (`AWS_*`, `GOOGLE_*`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Build`] if the backend cannot be constructed.
    pub fn from_config(
        name: &str,
        config: &StoreConfig,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let build_error = |reason: String| StoreError::Build {
            store: name.to_string(),
            reason,
        };
        let options = ClientOptions::new().with_timeout(timeout);

        let inner: Arc<dyn ObjectStore> = match config.provider {
            StoreProvider::S3 => Arc::new(
                AmazonS3Builder::from_env()
                    .with_bucket_name(&config.bucket)
                    .with_client_options(options)
                    .build()
                    .map_err(|e| build_error(e.to_string()))?,
            ),
            StoreProvider::Gcs => Arc::new(
                GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(&config.bucket)
                    .with_client_options(options)
                    .build()
                    .map_err(|e| build_error(e.to_string()))?,
            ),
            StoreProvider::Local => {
                let root = config
                    .root()
                    .ok_or_else(|| build_error("no root directory configured".to_string()))?;
                std::fs::create_dir_all(&root).map_err(|e| build_error(e.to_string()))?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(&root)
                        .map_err(|e| build_error(e.to_string()))?,
                )
            }
            StoreProvider::Memory => Arc::new(InMemory::new()),
        };

        tracing::debug!(store = name, location = %config.describe(), layout = ?config.layout, "store client ready");
        Ok(Self::new(name, inner, config.prefix.clone(), config.layout, timeout))
    }

    /// Key of `oid` in this store.
    #[must_use]
    pub fn key(&self, repo: &RepoReference, oid: &Oid) -> String {
        self.layout.key(&self.prefix, repo, oid)
    }

    /// The wrapped backend.
    #[must_use]
    pub fn inner(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.inner)
    }

    async fn bounded<T>(
        &self,
        key: &str,
        call: impl Future<Output = Result<T, object_store::Error>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| StoreError::classify(&self.name, key, e)),
            Err(_) => Err(StoreError::Timeout {
                store: self.name.clone(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

impl LfsStore for CloudStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, repo: &RepoReference, oid: &Oid) -> Result<bool, StoreError> {
        let key = self.key(repo, oid);
        let path = StorePath::from(key.as_str());
        match self.bounded(&key, self.inner.head(&path)).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get(&self, repo: &RepoReference, oid: &Oid) -> Result<Vec<u8>, StoreError> {
        let key = self.key(repo, oid);
        let path = StorePath::from(key.as_str());
        let bytes = self
            .bounded(&key, async { self.inner.get(&path).await?.bytes().await })
            .await?;
        Ok(bytes.to_vec())
    }

    async fn put(&self, repo: &RepoReference, oid: &Oid, data: Vec<u8>) -> Result<(), StoreError> {
        let key = self.key(repo, oid);
        let path = StorePath::from(key.as_str());
        self.bounded(&key, self.inner.put(&path, PutPayload::from(data)))
            .await?;
        tracing::debug!(store = %self.name, %key, "uploaded object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lfscheck_core::HashAlgorithm;
    use pretty_assertions::assert_eq;

    use super::*;

    fn oid(fill: char) -> Oid {
        Oid::new(HashAlgorithm::Sha256, fill.to_string().repeat(64)).unwrap()
    }

    fn memory_store(layout: KeyLayout) -> CloudStore {
        CloudStore::new(
            "target",
            Arc::new(InMemory::new()),
            "lfs",
            layout,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn put_then_exists_and_get() {
        let store = memory_store(KeyLayout::Sharded);
        let repo = RepoReference::new("o", "r");
        assert!(!store.exists(&repo, &oid('a')).await.unwrap());

        store.put(&repo, &oid('a'), b"content".to_vec()).await.unwrap();
        assert!(store.exists(&repo, &oid('a')).await.unwrap());
        assert_eq!(store.get(&repo, &oid('a')).await.unwrap(), b"content");
    }

    #[tokio::test]
    async fn objects_land_at_layout_keys() {
        let store = memory_store(KeyLayout::Sharded);
        let repo = RepoReference::new("o", "r");
        store.put(&repo, &oid('a'), vec![1]).await.unwrap();

        let expected = StorePath::from(format!("lfs/aa/aa/{}", "a".repeat(64)).as_str());
        assert!(store.inner().head(&expected).await.is_ok());
    }

    #[tokio::test]
    async fn get_of_missing_object_is_not_found() {
        let store = memory_store(KeyLayout::Flat);
        let err = store
            .get(&RepoReference::new("o", "r"), &oid('b'))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn local_provider_writes_under_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StoreConfig {
            provider: StoreProvider::Local,
            bucket: String::new(),
            root: dir.path().join("bucket").to_string_lossy().into_owned(),
            prefix: String::new(),
            layout: KeyLayout::RepoScoped,
        };
        let store = CloudStore::from_config("target", &config, Duration::from_secs(5)).unwrap();
        let repo = RepoReference::new("lsst", "afwdata");
        store.put(&repo, &oid('c'), b"xyz".to_vec()).await.unwrap();

        let on_disk = dir
            .path()
            .join("bucket")
            .join("lsst")
            .join("afwdata")
            .join("c".repeat(64));
        assert_eq!(std::fs::read(on_disk).unwrap(), b"xyz");
    }
}
