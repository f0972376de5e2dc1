//! HTTP request handlers for the Querybridge server
//!
//! `query` covers the record CRUD surface, `execution` starts executions
//! and reports their status.

mod execution;
mod query;

pub use execution::ExecutionHandler;
pub use query::QueryHandler;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use querybridge_core::{QueryError, Result};
use querybridge_types::runtime::ErrorResponse;
use serde::Serialize;
use tracing::{error, warn};

/// Map a failed operation to its status code and a sanitized error body
fn error_response(action: &str, e: QueryError) -> Response {
    if e.is_error() {
        error!("{} failed: {}", action, e);
    } else {
        warn!("{} failed: {}", action, e);
    }
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::new(e.sanitized_message()))).into_response()
}

/// Serialize a successful result with `ok`, or map the error
fn respond<T: Serialize>(action: &str, ok: StatusCode, result: Result<T>) -> Response {
    match result {
        Ok(body) => (ok, Json(body)).into_response(),
        Err(e) => error_response(action, e),
    }
}
