//! Runtime server for Querybridge
//!
//! This crate provides the query variants (connectors), the document and
//! object stores, the query factory, the execution engine and the HTTP layer
//! of the Querybridge service.

pub mod executor;
pub mod handlers;
pub mod query;
pub mod server;
pub mod state;
pub mod storage;
pub mod store;
pub mod variants;

#[cfg(test)]
mod testing;

pub use executor::{Execution, ExecutionEngine};
pub use handlers::{ExecutionHandler, QueryHandler};
pub use query::{Query, QueryFactory, QueryRegistry, VariantConstructor};
pub use server::Runtime;
pub use storage::{BlobBackend, ObjectStorage};
pub use store::{Claim, QueryCollection};
pub use variants::{ExecutionContext, QueryVariant};
