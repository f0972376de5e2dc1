//! Query execution module
//!
//! Drives a resolved query through `unknown -> running -> {done, error}`.
//! The transition itself is `querybridge_core::transition`; this module only
//! performs the I/O around it.

use chrono::Utc;
use futures::FutureExt;
use querybridge_core::{ExecutionEvent, QueryError, QueryStatus, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::query::{Query, QueryFactory};
use crate::store::{Claim, QueryCollection};

/// Recorded on queries still running when the service stops
const INTERRUPTED: &str = "Execution interrupted by service shutdown";

/// An accepted execution: the persisted `running` status and the background task
/// that will write the terminal one.
#[derive(Debug)]
pub struct Execution {
    pub status: QueryStatus,
    pub task: JoinHandle<Result<QueryStatus>>,
}

impl Execution {
    /// Wait for the background task and return the terminal status it persisted
    pub async fn wait(self) -> Result<QueryStatus> {
        self.task
            .await
            .map_err(|e| QueryError::Server(format!("Execution task failed: {}", e)))?
    }
}

/// Query executor that owns the execution lifecycle
pub struct ExecutionEngine {
    factory: Arc<QueryFactory>,
    tasks: TaskTracker,
    /// Ids whose background task has not finished yet
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl ExecutionEngine {
    pub fn new(factory: Arc<QueryFactory>) -> Self {
        Self {
            factory,
            tasks: TaskTracker::new(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Start executing query `id` with caller-supplied `parameters`.
    ///
    /// Returns as soon as `running` is persisted; the remote call continues in
    /// the background. Only a query still in `unknown` can be started, so a
    /// second concurrent call fails with `InvalidTransition`.
    pub async fn execute_query(&self, id: &str, parameters: Value) -> Result<Execution> {
        let mut query = self.factory.resolve(id).await?;

        let mut status = query.status().clone();
        status.apply(ExecutionEvent::Start, Utc::now(), None)?;

        match self.factory.collection().claim(id, &status).await? {
            Claim::Claimed(model) => query.replace_model(model),
            Claim::Rejected(from) => {
                return Err(QueryError::InvalidTransition {
                    from,
                    event: ExecutionEvent::Start,
                })
            }
            Claim::Missing => return Err(QueryError::NotFound(id.to_string())),
        }
        info!("Query {} running ({})", id, query.variant().source_type());

        let accepted = query.status().clone();
        let collection = self.factory.collection().clone();
        let in_flight = self.in_flight.clone();
        let query_id = id.to_string();
        in_flight.lock().await.insert(query_id.clone());

        let task = self.tasks.spawn(async move {
            let result = Self::run_to_completion(collection, query, parameters).await;
            in_flight.lock().await.remove(&query_id);
            result
        });
        Ok(Execution {
            status: accepted,
            task,
        })
    }

    /// Status as currently persisted.
    ///
    /// Reads the record directly so queries with an unregistered source
    /// type can still be polled.
    pub async fn get_status(&self, id: &str) -> Result<QueryStatus> {
        self.factory
            .collection()
            .find_one(id)
            .await?
            .map(|model| model.status)
            .ok_or_else(|| QueryError::NotFound(id.to_string()))
    }

    pub fn factory(&self) -> &Arc<QueryFactory> {
        &self.factory
    }

    /// Number of executions whose background task is still going
    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    /// Wait up to `grace` for running executions, then record the rest as `error`.
    ///
    /// Returns how many queries were interrupted.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        self.tasks.close();
        if tokio::time::timeout(grace, self.tasks.wait()).await.is_ok() {
            debug!("All executions finished");
            return 0;
        }

        let pending: Vec<String> = self.in_flight.lock().await.iter().cloned().collect();
        warn!(
            "{} execution(s) still running after {:?}, recording them as failed",
            pending.len(),
            grace
        );

        let collection = self.factory.collection();
        let mut interrupted = 0;
        for id in pending {
            let status = match collection.find_one(&id).await {
                Ok(Some(model)) => model.status,
                Ok(None) => continue,
                Err(e) => {
                    error!("Query {}: cannot read status on shutdown: {}", id, e);
                    continue;
                }
            };
            match Self::record_failure(collection.as_ref(), &id, status, INTERRUPTED).await {
                Ok(Some(_)) => interrupted += 1,
                Ok(None) => {}
                Err(e) => error!("Query {}: cannot record interruption: {}", id, e),
            }
        }
        interrupted
    }

    /// Write a failed status derived from `status` if the record is still `running`
    async fn record_failure(
        collection: &dyn QueryCollection,
        id: &str,
        mut status: QueryStatus,
        info: &str,
    ) -> Result<Option<QueryStatus>> {
        status.apply(ExecutionEvent::Fail, Utc::now(), Some(info.to_string()))?;
        let written = collection.fail_running(id, &status).await?;
        Ok(written.then_some(status))
    }

    async fn run_to_completion(
        collection: Arc<dyn QueryCollection>,
        mut query: Query,
        parameters: Value,
    ) -> Result<QueryStatus> {
        let id = query.id().to_string();
        let variant = query.variant().clone();
        let ctx = query.execution_context(parameters);
        let running = query.status().clone();

        let result = AssertUnwindSafe(variant.execute(&ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(QueryError::RemoteExecution("connector panicked".to_string()))
            });

        let outcome = match result {
            Ok(output) => query.set_output(&output).await,
            Err(e) => Err(e),
        };

        let (event, detail) = match outcome {
            Ok(()) => (ExecutionEvent::Succeed, None),
            Err(e) => {
                warn!("Query {} failed: {}", id, e);
                (ExecutionEvent::Fail, Some(e.to_string()))
            }
        };
        query.status_mut().apply(event, Utc::now(), detail)?;

        if let Err(e) = query.push_model().await {
            error!("Query {}: could not persist terminal status: {}", id, e);
            // The stored record never references an output written by this run
            if event == ExecutionEvent::Succeed {
                if let Err(cleanup) = query.clear_output().await {
                    warn!("Query {}: output blob left behind: {}", id, cleanup);
                }
            }

            // Fall back to a status-only write so the record leaves `running`
            let info = format!("Could not store the result: {}", e.sanitized_message());
            return match Self::record_failure(collection.as_ref(), &id, running, &info).await {
                Ok(Some(status)) => {
                    warn!("Query {} recorded as error after a failed write", id);
                    Ok(status)
                }
                Ok(None) => Err(e),
                Err(fallback) => {
                    error!("Query {}: status-only write failed too: {}", id, fallback);
                    Err(e)
                }
            };
        }

        let status = query.status().clone();
        match event {
            ExecutionEvent::Succeed => info!(
                "Query {} done, {} bytes of output{}",
                id,
                query.model().output.data_size,
                if query.model().output.is_blob_stored { " (blob)" } else { "" }
            ),
            _ => debug!("Query {} recorded as {}", id, status.status),
        }
        Ok(status)
    }
}
