//! In-memory document store

use async_trait::async_trait;
use bson::oid::ObjectId;
use querybridge_core::{QueryModel, QueryStatus, Result};
use querybridge_types::ExecutionState;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::traits::{Claim, QueryCollection};

/// Process-local collection; ids are generated like MongoDB ObjectIds
pub struct MemoryQueryCollection {
    records: RwLock<HashMap<String, QueryModel>>,
}

impl MemoryQueryCollection {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryQueryCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryCollection for MemoryQueryCollection {
    async fn find_one(&self, id: &str) -> Result<Option<QueryModel>> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }

    async fn find_one_and_replace(&self, id: &str, record: &QueryModel) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(slot) => {
                let mut replacement = record.clone();
                replacement.id = id.to_string();
                *slot = replacement;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_one(&self, record: &QueryModel) -> Result<String> {
        let id = ObjectId::new().to_hex();
        let mut stored = record.clone();
        stored.id = id.clone();
        self.records.write().await.insert(id.clone(), stored);
        Ok(id)
    }

    async fn delete_one(&self, id: &str) -> Result<bool> {
        Ok(self.records.write().await.remove(id).is_some())
    }

    async fn claim(&self, id: &str, status: &QueryStatus) -> Result<Claim> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(id) else {
            return Ok(Claim::Missing);
        };
        if record.status.status != ExecutionState::Unknown {
            return Ok(Claim::Rejected(record.status.status));
        }
        record.status = status.clone();
        Ok(Claim::Claimed(record.clone()))
    }

    async fn fail_running(&self, id: &str, status: &QueryStatus) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(record) if record.status.status == ExecutionState::Running => {
                record.status = status.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
