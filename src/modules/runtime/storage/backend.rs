//! Blob backend trait definition

use async_trait::async_trait;
use querybridge_core::Result;

/// Named-blob substrate: independent byte streams keyed by name
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Write a new blob; fails with `Storage` if `name` is taken
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Read a whole blob; fails with `BlobNotFound` if absent
    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Remove a blob; fails with `BlobNotFound` if absent
    async fn remove(&self, name: &str) -> Result<()>;

    async fn exists(&self, name: &str) -> Result<bool>;

    /// Get the backend name
    fn backend_name(&self) -> &'static str;
}
