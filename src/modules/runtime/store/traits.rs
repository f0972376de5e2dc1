//! Document store trait definition

use async_trait::async_trait;
use querybridge_core::{QueryModel, QueryStatus, Result};
use querybridge_types::ExecutionState;

/// Outcome of a conditional `unknown -> running` claim
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// The record was in `unknown` and now holds the given status
    Claimed(QueryModel),
    /// The record exists but was already in this state
    Rejected(ExecutionState),
    /// No record with that id
    Missing,
}

/// Collection of query records keyed by a store-assigned id
///
/// Writes are last-write-wins: `find_one_and_replace` carries no version
/// check. `claim` and `fail_running` are the only conditional writes.
#[async_trait]
pub trait QueryCollection: Send + Sync {
    /// Load a record; `Ok(None)` when no record matches
    async fn find_one(&self, id: &str) -> Result<Option<QueryModel>>;

    /// Overwrite a record; returns false when the id no longer exists
    async fn find_one_and_replace(&self, id: &str, record: &QueryModel) -> Result<bool>;

    /// Insert a new record and return its freshly assigned id
    async fn insert_one(&self, record: &QueryModel) -> Result<String>;

    /// Remove a record; returns false when nothing was removed
    async fn delete_one(&self, id: &str) -> Result<bool>;

    /// Atomically replace the status with `status` if it is still `unknown`
    async fn claim(&self, id: &str, status: &QueryStatus) -> Result<Claim>;

    /// Overwrite only the status block, and only while the record is `running`.
    /// Returns false when no running record matched.
    async fn fail_running(&self, id: &str, status: &QueryStatus) -> Result<bool>;

    /// Release connections
    async fn close(&self) -> Result<()>;

    /// Get the backing store name
    fn backend_name(&self) -> &'static str;
}
