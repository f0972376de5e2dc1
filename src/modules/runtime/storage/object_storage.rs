//! Key-addressed object storage over a blob backend

use querybridge_core::{QueryError, Result};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use super::backend::BlobBackend;

/// Attempts at drawing an unused key before giving up
const MAX_KEY_ATTEMPTS: usize = 3;

/// Create/read/replace/delete of opaque blobs under random keys
pub struct ObjectStorage {
    backend: Arc<dyn BlobBackend>,
}

impl ObjectStorage {
    pub fn new(backend: Arc<dyn BlobBackend>) -> Self {
        Self { backend }
    }

    /// Store a new blob and return its freshly generated key
    pub async fn create(&self, bytes: &[u8]) -> Result<String> {
        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = generate_key();
            if self.backend.exists(&key).await? {
                continue;
            }
            self.backend.write(&key, bytes).await?;
            debug!("Created blob {} ({} bytes)", key, bytes.len());
            return Ok(key);
        }
        Err(QueryError::Storage(
            "Could not generate an unused blob key".to_string(),
        ))
    }

    /// Read the blob stored under `key`
    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.backend.read(key).await
    }

    /// Replace the content of an existing key.
    ///
    /// Not atomic: the old blob is deleted before the new one is written. If
    /// the write fails the key is left absent and the error is returned.
    pub async fn set(&self, key: &str, bytes: &[u8]) -> Result<String> {
        self.backend.remove(key).await?;
        if let Err(e) = self.backend.write(key, bytes).await {
            error!("Blob {} lost: deleted but could not be rewritten: {}", key, e);
            return Err(QueryError::Storage(format!(
                "Blob '{}' was deleted but rewriting it failed: {}",
                key, e
            )));
        }
        debug!("Replaced blob {} ({} bytes)", key, bytes.len());
        Ok(key.to_string())
    }

    /// Remove the blob stored under `key` and return the key
    pub async fn delete(&self, key: &str) -> Result<String> {
        self.backend.remove(key).await?;
        debug!("Deleted blob {}", key);
        Ok(key.to_string())
    }

    /// Get the backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }
}

/// RFC 4122 v4, never a counter
fn generate_key() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBlobBackend;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn storage() -> ObjectStorage {
        ObjectStorage::new(Arc::new(MemoryBlobBackend::new()))
    }

    /// Memory backend whose writes can be switched off
    struct FlakyBackend {
        inner: MemoryBlobBackend,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl BlobBackend for FlakyBackend {
        async fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(QueryError::Storage("disk full".to_string()));
            }
            self.inner.write(name, bytes).await
        }

        async fn read(&self, name: &str) -> Result<Vec<u8>> {
            self.inner.read(name).await
        }

        async fn remove(&self, name: &str) -> Result<()> {
            self.inner.remove(name).await
        }

        async fn exists(&self, name: &str) -> Result<bool> {
            self.inner.exists(name).await
        }

        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let storage = storage();
        let key = storage.create(b"hello").await.unwrap();
        assert_eq!(storage.get(&key).await.unwrap(), b"hello".to_vec());
        assert!(Uuid::parse_str(&key).is_ok());
    }

    #[tokio::test]
    async fn test_create_never_reuses_keys() {
        let storage = storage();
        let mut keys = HashSet::new();
        for i in 0..64u8 {
            assert!(keys.insert(storage.create(&[i]).await.unwrap()));
        }
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let result = storage().get("absent").await;
        assert!(matches!(result, Err(QueryError::BlobNotFound(_))));
    }

    #[tokio::test]
    async fn test_set_replaces_content_under_same_key() {
        let storage = storage();
        let key = storage.create(b"v1").await.unwrap();
        assert_eq!(storage.set(&key, b"v2").await.unwrap(), key);
        assert_eq!(storage.get(&key).await.unwrap(), b"v2".to_vec());
    }

    #[tokio::test]
    async fn test_set_missing_key_fails_on_delete() {
        let result = storage().set("absent", b"v").await;
        assert!(matches!(result, Err(QueryError::BlobNotFound(_))));
    }

    #[tokio::test]
    async fn test_set_write_failure_leaves_key_absent() {
        let backend = Arc::new(FlakyBackend {
            inner: MemoryBlobBackend::new(),
            fail_writes: AtomicBool::new(false),
        });
        let storage = ObjectStorage::new(backend.clone());
        let key = storage.create(b"v1").await.unwrap();

        backend.fail_writes.store(true, Ordering::SeqCst);
        let result = storage.set(&key, b"v2").await;
        assert!(matches!(result, Err(QueryError::Storage(_))));
        assert!(matches!(storage.get(&key).await, Err(QueryError::BlobNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let storage = storage();
        let key = storage.create(b"bye").await.unwrap();
        assert_eq!(storage.delete(&key).await.unwrap(), key);
        assert!(matches!(storage.delete(&key).await, Err(QueryError::BlobNotFound(_))));
    }
}
