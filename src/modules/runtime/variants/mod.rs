//! Query variants: one connector implementation per source type
//!
//! Each variant owns the translation between its source's native ("local")
//! payloads and the standard formats, plus the remote call itself.

pub mod rest;
mod traits;
pub mod transmart;

pub use rest::RestVariant;
pub use traits::{ExecutionContext, QueryVariant};
pub use transmart::TransmartVariant;
