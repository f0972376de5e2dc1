//! HTTP server for Querybridge

use axum::{
    routing::{get, post},
    Router,
};
use querybridge_core::{Config, QueryError, StorageBackend, StorageConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::executor::ExecutionEngine;
use crate::handlers::{ExecutionHandler, QueryHandler};
use crate::query::{QueryFactory, QueryRegistry};
use crate::state::AppState;
use crate::storage::{BlobBackend, GridFsBackend, MemoryBlobBackend, ObjectStorage};
use crate::store::{connect, MemoryQueryCollection, MongoQueryCollection, QueryCollection};

/// Runtime server for Querybridge
pub struct Runtime {
    config: Arc<Config>,
    engine: Arc<ExecutionEngine>,
    registry: Arc<QueryRegistry>,
}

/// Apply port override to a configuration
fn apply_port_override(mut config: Config, port_override: Option<u16>) -> Config {
    if let Some(port) = port_override {
        config.server.port = Some(port.to_string());
    }
    config
}

/// Open the document store and the blob store named by the configuration
async fn open_stores(
    storage: &StorageConfig,
) -> Result<(Arc<dyn QueryCollection>, Arc<dyn BlobBackend>), QueryError> {
    match storage.backend {
        StorageBackend::Mongodb => {
            let db = connect(&storage.url, &storage.database).await?;
            info!(
                "Connected to MongoDB database '{}' (collection '{}', bucket '{}')",
                storage.database, storage.collection, storage.bucket
            );
            Ok((
                Arc::new(MongoQueryCollection::new(&db, &storage.collection)),
                Arc::new(GridFsBackend::new(&db, &storage.bucket)),
            ))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage: queries are lost on exit");
            Ok((
                Arc::new(MemoryQueryCollection::new()),
                Arc::new(MemoryBlobBackend::new()),
            ))
        }
    }
}

impl Runtime {
    /// Create a new runtime from a configuration
    pub async fn new(config: Config) -> Result<Self, QueryError> {
        Self::with_port_override(config, None).await
    }

    /// Create a new runtime with an optional port override
    pub async fn with_port_override(
        config: Config,
        port_override: Option<u16>,
    ) -> Result<Self, QueryError> {
        let config = apply_port_override(config, port_override);

        let (collection, blobs) = open_stores(&config.storage).await?;
        let storage = Arc::new(ObjectStorage::new(blobs));
        let factory = QueryFactory::with_default_variants(
            collection,
            storage,
            config.storage.inline_threshold,
        )?;

        Ok(Self::from_factory(config, Arc::new(factory)))
    }

    /// Create a runtime around an already assembled factory
    pub fn from_factory(config: Config, factory: Arc<QueryFactory>) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(ExecutionEngine::new(factory.clone())),
            registry: Arc::new(QueryRegistry::new(factory)),
        }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        let state = AppState::new(self.engine.clone(), self.registry.clone());

        let router = Router::new()
            // Query records
            .route("/query/new", post(QueryHandler::create))
            .route("/query/:id", get(QueryHandler::get).delete(QueryHandler::delete))
            .route(
                "/query/:id/input",
                get(QueryHandler::get_input).put(QueryHandler::put_input),
            )
            .route(
                "/query/:id/output",
                get(QueryHandler::get_output).delete(QueryHandler::delete_output),
            )
            // Execution
            .route("/execute", post(ExecutionHandler::execute))
            .route("/execute/:id", get(ExecutionHandler::status))
            // Health check
            .route("/health", get(Self::health_check))
            .with_state(state);

        let router = if self.config.server.enable_cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        };

        router
            .layer(TimeoutLayer::new(self.config.server.request_timeout()))
            .layer(TraceLayer::new_for_http())
    }

    /// Health check endpoint
    async fn health_check() -> &'static str {
        "OK"
    }

    /// Start the server
    pub async fn run(&self) -> Result<(), QueryError> {
        let addr: SocketAddr = format!("{}:{}", self.config.server.host(), self.config.port())
            .parse()
            .map_err(|e| QueryError::Server(format!("Invalid address: {}", e)))?;

        let app = self.router();
        let factory = self.engine.factory();

        info!("Starting Querybridge server on http://{}", addr);
        info!("Service: {}", self.config.name);
        info!(
            "Storage: {} records, {} blobs, inline below {} bytes",
            factory.collection().backend_name(),
            factory.storage().backend_name(),
            factory.inline_threshold()
        );
        info!("Source types: {}", factory.source_types().join(", "));

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| QueryError::Server(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(Self::shutdown_signal())
            .await
            .map_err(|e| QueryError::Server(format!("Server error: {}", e)))?;

        info!("Server stopped");
        self.shutdown().await?;

        Ok(())
    }

    /// Wait for shutdown signal
    async fn shutdown_signal() {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for CTRL+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to listen for SIGTERM: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                debug!("Received CTRL+C, shutting down...");
            }
            _ = terminate => {
                debug!("Received SIGTERM, shutting down...");
            }
        }
    }

    /// Let running executions finish, then release store connections
    pub async fn shutdown(&self) -> Result<(), QueryError> {
        let in_flight = self.engine.in_flight().await;
        if in_flight > 0 {
            info!("Waiting for {} running execution(s)...", in_flight);
        }
        let interrupted = self.engine.shutdown(self.config.server.shutdown_grace()).await;
        if interrupted > 0 {
            warn!("{} execution(s) recorded as interrupted", interrupted);
        }

        info!("Closing store connections...");
        if let Err(e) = self.engine.factory().collection().close().await {
            warn!("Error closing document store: {}", e);
        }
        info!("Shutdown complete");
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    pub fn registry(&self) -> &Arc<QueryRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_query, Fixture, ECHO_SOURCE_TYPE, GATED_SOURCE_TYPE};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use querybridge_types::ExecutionState;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn runtime(fixture: &Fixture) -> Runtime {
        Runtime::from_factory(Config::new("test-bridge"), fixture.factory.clone())
    }

    async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_runtime_creation_with_memory_storage() {
        let runtime = Runtime::new(Config::new("test-bridge")).await.unwrap();
        assert_eq!(runtime.engine().factory().source_types(), vec!["REST", "TS171"]);
        assert_eq!(runtime.engine().factory().collection().backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_runtime_with_port_override() {
        let runtime = Runtime::with_port_override(Config::new("test-bridge"), Some(3000))
            .await
            .unwrap();
        assert_eq!(runtime.config().port(), 3000);
    }

    #[test]
    fn test_apply_port_override_none() {
        let config = apply_port_override(Config::new("test"), None);
        assert_eq!(config.port(), 8080);
    }

    #[tokio::test]
    async fn test_shutdown_leaves_no_query_running() {
        let fixture = Fixture::new(1024);
        let mut config = Config::new("test-bridge");
        config.server.shutdown_grace_secs = Some(0);
        let runtime = Runtime::from_factory(config, fixture.factory.clone());

        let model = runtime.registry().create(new_query(GATED_SOURCE_TYPE)).await.unwrap();
        runtime.engine().execute_query(&model.id, Value::Null).await.unwrap();

        runtime.shutdown().await.unwrap();
        let status = runtime.engine().get_status(&model.id).await.unwrap();
        assert_eq!(status.status, ExecutionState::Error);
    }

    #[tokio::test]
    async fn test_health_route() {
        let fixture = Fixture::new(1024);
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = runtime(&fixture).router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_query_lifecycle_over_http() {
        let fixture = Fixture::new(1024);
        let runtime = runtime(&fixture);
        let body = serde_json::to_value(new_query(ECHO_SOURCE_TYPE)).unwrap();

        let (status, created) = send(runtime.router(), "POST", "/query/new", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["_id"].as_str().unwrap().to_string();

        let (status, accepted) = send(
            runtime.router(),
            "POST",
            "/execute",
            Some(json!({"query": id, "input": {"source": "ECHO", "records": [7]}})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(accepted["status"], json!("running"));

        let mut state = ExecutionState::Running;
        for _ in 0..100 {
            let (_, polled) = send(runtime.router(), "GET", &format!("/execute/{}", id), None).await;
            state = serde_json::from_value(polled["status"].clone()).unwrap();
            if state.is_terminal() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(state, ExecutionState::Done);

        let (status, output) =
            send(runtime.router(), "GET", &format!("/query/{}/output", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(output, json!({"source": "ECHO", "records": [7]}));

        let (status, _) = send(runtime.router(), "POST", "/execute", Some(json!({"query": id}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, deleted) =
            send(runtime.router(), "DELETE", &format!("/query/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["blobRemoved"], json!(false));

        let (status, error) = send(runtime.router(), "GET", &format!("/query/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(error["error"].as_str().unwrap().contains(&id));
    }

    #[tokio::test]
    async fn test_unsupported_source_type_is_client_error() {
        let fixture = Fixture::new(1024);
        let runtime = runtime(&fixture);
        let model = runtime.registry().create(new_query("X")).await.unwrap();

        let (status, body) = send(
            runtime.router(),
            "POST",
            "/execute",
            Some(json!({"query": model.id})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Unsupported source type: X"));
    }
}
