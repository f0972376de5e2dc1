//! Type definitions for Querybridge
//!
//! This crate contains shared type definitions used across the Querybridge codebase,
//! including the execution state enum and the request/response bodies of the HTTP layer.

pub mod runtime;
pub mod state;

pub use state::ExecutionState;
