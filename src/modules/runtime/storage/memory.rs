//! In-memory blob backend

use async_trait::async_trait;
use querybridge_core::{QueryError, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::backend::BlobBackend;

/// Blobs kept in a process-local map
pub struct MemoryBlobBackend {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobBackend {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored blobs
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

impl Default for MemoryBlobBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobBackend {
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut blobs = self.blobs.write().await;
        if blobs.contains_key(name) {
            return Err(QueryError::Storage(format!("Blob '{}' already exists", name)));
        }
        blobs.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let blobs = self.blobs.read().await;
        blobs
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::BlobNotFound(name.to_string()))
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let mut blobs = self.blobs.write().await;
        blobs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| QueryError::BlobNotFound(name.to_string()))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.blobs.read().await.contains_key(name))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_remove() {
        let backend = MemoryBlobBackend::new();
        backend.write("a", b"payload").await.unwrap();
        assert!(backend.exists("a").await.unwrap());
        assert_eq!(backend.read("a").await.unwrap(), b"payload".to_vec());

        backend.remove("a").await.unwrap();
        assert!(backend.is_empty().await);
        assert!(matches!(backend.read("a").await, Err(QueryError::BlobNotFound(_))));
        assert!(matches!(backend.remove("a").await, Err(QueryError::BlobNotFound(_))));
    }

    #[tokio::test]
    async fn test_write_refuses_existing_name() {
        let backend = MemoryBlobBackend::new();
        backend.write("a", b"1").await.unwrap();
        assert!(matches!(backend.write("a", b"2").await, Err(QueryError::Storage(_))));
        assert_eq!(backend.read("a").await.unwrap(), b"1".to_vec());
    }
}
