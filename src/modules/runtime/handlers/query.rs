//! Query record handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use querybridge_core::NewQuery;
use serde_json::Value;

use super::respond;
use crate::state::AppState;

/// Handler for the `/query` routes
pub struct QueryHandler;

impl QueryHandler {
    /// Handle POST /query/new
    pub async fn create(State(state): State<AppState>, Json(query): Json<NewQuery>) -> Response {
        let result = state.registry.create(query).await;
        respond("Create query", StatusCode::CREATED, result)
    }

    /// Handle GET /query/{id}
    pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Response {
        let result = state.registry.get(&id).await;
        respond(&format!("Get query '{}'", id), StatusCode::OK, result)
    }

    /// Handle DELETE /query/{id}
    pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Response {
        let result = state.registry.delete(&id).await;
        respond(&format!("Delete query '{}'", id), StatusCode::OK, result)
    }

    /// Handle GET /query/{id}/input
    pub async fn get_input(State(state): State<AppState>, Path(id): Path<String>) -> Response {
        let result = state.registry.get_input(&id).await;
        respond(&format!("Get input of '{}'", id), StatusCode::OK, result)
    }

    /// Handle PUT /query/{id}/input
    pub async fn put_input(
        State(state): State<AppState>,
        Path(id): Path<String>,
        Json(standard): Json<Value>,
    ) -> Response {
        let result = state.registry.put_input(&id, standard).await;
        respond(&format!("Update input of '{}'", id), StatusCode::OK, result)
    }

    /// Handle GET /query/{id}/output
    pub async fn get_output(State(state): State<AppState>, Path(id): Path<String>) -> Response {
        let result = state.registry.get_output(&id).await;
        respond(&format!("Get output of '{}'", id), StatusCode::OK, result)
    }

    /// Handle DELETE /query/{id}/output
    pub async fn delete_output(State(state): State<AppState>, Path(id): Path<String>) -> Response {
        let result = state.registry.delete_output(&id).await;
        respond(&format!("Delete output of '{}'", id), StatusCode::OK, result)
    }
}
