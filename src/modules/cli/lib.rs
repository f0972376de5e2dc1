//! Querybridge CLI
//!
//! This crate provides the command-line interface for Querybridge:
//! - run: Start the server
//! - init: Write a sample configuration
//! - completion: Generate shell completions (hidden)

pub mod commands;

pub use commands::{Cli, Commands, LogFormat};
