//! Object storage for outputs too large to keep inline
//!
//! `ObjectStorage` implements the key semantics (fresh random keys,
//! replace-by-delete-then-recreate) on top of a named-blob `BlobBackend`.

mod backend;
mod gridfs;
mod memory;
mod object_storage;

pub use backend::BlobBackend;
pub use gridfs::GridFsBackend;
pub use memory::MemoryBlobBackend;
pub use object_storage::ObjectStorage;
