//! Domain models for Querybridge

mod config;
mod model;
mod standard;
mod status;

pub use config::{Config, ServerConfig, StorageBackend, StorageConfig, DEFAULT_INLINE_THRESHOLD, MAX_INLINE_THRESHOLD};
pub use model::{Credentials, Endpoint, NewQuery, OutputPayload, QueryInput, QueryModel, QueryOutput};
pub use standard::{StandardInput, StandardOutput};
pub use status::{transition, ExecutionEvent, QueryStatus};
