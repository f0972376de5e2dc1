//! Query execution handler

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use querybridge_types::runtime::ExecuteRequest;
use tracing::info;

use super::respond;
use crate::state::AppState;

/// Handler for execution requests
pub struct ExecutionHandler;

impl ExecutionHandler {
    /// Handle POST /execute
    ///
    /// Answers `202 Accepted` with the `running` status; progress is
    /// observed through `GET /execute/{id}`.
    pub async fn execute(
        State(state): State<AppState>,
        Json(request): Json<ExecuteRequest>,
    ) -> Response {
        info!("Executing query: {}", request.query);

        let result = state
            .engine
            .execute_query(&request.query, request.input)
            .await
            .map(|execution| execution.status);
        respond(
            &format!("Execute query '{}'", request.query),
            StatusCode::ACCEPTED,
            result,
        )
    }

    /// Handle GET /execute/{id}
    pub async fn status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
        let result = state.engine.get_status(&id).await;
        respond(&format!("Status of query '{}'", id), StatusCode::OK, result)
    }
}
