//! GridFS blob backend

use async_trait::async_trait;
use bson::{doc, Bson};
use futures::io::{AsyncReadExt, AsyncWriteExt};
use futures::TryStreamExt;
use mongodb::error::{Error as MongoError, ErrorKind, GridFsErrorKind};
use mongodb::gridfs::GridFsBucket;
use mongodb::options::GridFsBucketOptions;
use mongodb::Database;
use querybridge_core::{QueryError, Result};

use super::backend::BlobBackend;

/// Blobs stored as GridFS files whose `_id` and filename are the blob name
pub struct GridFsBackend {
    bucket: GridFsBucket,
}

impl GridFsBackend {
    pub fn new(db: &Database, bucket_name: &str) -> Self {
        let options = GridFsBucketOptions::builder()
            .bucket_name(bucket_name.to_string())
            .build();
        Self {
            bucket: db.gridfs_bucket(options),
        }
    }
}

fn is_file_not_found(e: &MongoError) -> bool {
    // `ErrorKind::GridFs` is non-exhaustive, so match it in braced form
    matches!(
        e.kind.as_ref(),
        ErrorKind::GridFs {
            0: GridFsErrorKind::FileNotFound { .. },
            ..
        }
    )
}

fn classify(name: &str, action: &str, e: MongoError) -> QueryError {
    if is_file_not_found(&e) {
        QueryError::BlobNotFound(name.to_string())
    } else {
        QueryError::Storage(format!("GridFS {} of '{}' failed: {}", action, name, e))
    }
}

#[async_trait]
impl BlobBackend for GridFsBackend {
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut upload =
            self.bucket
                .open_upload_stream_with_id(Bson::String(name.to_string()), name, None);
        let io_error =
            |e: std::io::Error| QueryError::Storage(format!("GridFS write of '{}' failed: {}", name, e));

        if let Err(e) = upload.write_all(bytes).await {
            // Drop already-written chunks rather than leave a partial file behind
            let _ = upload.abort().await;
            return Err(io_error(e));
        }
        upload.close().await.map_err(io_error)
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let mut download = self
            .bucket
            .open_download_stream(Bson::String(name.to_string()))
            .await
            .map_err(|e| classify(name, "read", e))?;

        let mut bytes = Vec::new();
        download
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| QueryError::Storage(format!("GridFS read of '{}' failed: {}", name, e)))?;
        Ok(bytes)
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.bucket
            .delete(Bson::String(name.to_string()))
            .await
            .map_err(|e| classify(name, "delete", e))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let mut cursor = self
            .bucket
            .find(doc! { "_id": name }, None)
            .await
            .map_err(|e| classify(name, "lookup", e))?;
        let first = cursor
            .try_next()
            .await
            .map_err(|e| classify(name, "lookup", e))?;
        Ok(first.is_some())
    }

    fn backend_name(&self) -> &'static str {
        "gridfs"
    }
}
