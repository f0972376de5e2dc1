//! Document store holding query records
//!
//! The store is an external collaborator: this module only defines the
//! operations the core needs and provides MongoDB and in-memory backings.

mod memory;
mod mongodb;
mod traits;

pub use self::mongodb::{connect, MongoQueryCollection};
pub use memory::MemoryQueryCollection;
pub use traits::{Claim, QueryCollection};
