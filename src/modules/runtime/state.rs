//! Shared runtime application state (HTTP handlers)

use std::sync::Arc;

use crate::executor::ExecutionEngine;
use crate::query::QueryRegistry;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ExecutionEngine>,
    pub registry: Arc<QueryRegistry>,
}

impl AppState {
    pub fn new(engine: Arc<ExecutionEngine>, registry: Arc<QueryRegistry>) -> Self {
        Self { engine, registry }
    }
}
