//! Query handles, the variant factory and the record registry

mod factory;
mod handle;
mod registry;

pub use factory::{QueryFactory, VariantConstructor};
pub use handle::Query;
pub use registry::QueryRegistry;
