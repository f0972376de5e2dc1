//! Core domain logic for Querybridge
//!
//! This crate contains the persisted query model, the execution state machine,
//! the standard data formats shared by every connector, configuration types and
//! the error taxonomy. Nothing in here performs I/O.

pub mod domain;
pub mod error;

pub use domain::*;
pub use error::{QueryError, Result};
