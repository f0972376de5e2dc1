//! A resolved query: its record, its variant and the stores it lives in

use querybridge_core::{OutputPayload, QueryError, QueryModel, QueryOutput, QueryStatus, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::storage::ObjectStorage;
use crate::store::QueryCollection;
use crate::variants::{ExecutionContext, QueryVariant};

/// In-memory copy of one query record bound to its connector.
///
/// Setters only touch the in-memory model; `push_model` persists it.
pub struct Query {
    model: QueryModel,
    variant: Arc<dyn QueryVariant>,
    collection: Arc<dyn QueryCollection>,
    storage: Arc<ObjectStorage>,
    inline_threshold: u64,
}

impl Query {
    pub(crate) fn new(
        model: QueryModel,
        variant: Arc<dyn QueryVariant>,
        collection: Arc<dyn QueryCollection>,
        storage: Arc<ObjectStorage>,
        inline_threshold: u64,
    ) -> Self {
        Self {
            model,
            variant,
            collection,
            storage,
            inline_threshold,
        }
    }

    pub fn id(&self) -> &str {
        &self.model.id
    }

    pub fn model(&self) -> &QueryModel {
        &self.model
    }

    pub fn status(&self) -> &QueryStatus {
        &self.model.status
    }

    pub(crate) fn status_mut(&mut self) -> &mut QueryStatus {
        &mut self.model.status
    }

    pub fn variant(&self) -> &Arc<dyn QueryVariant> {
        &self.variant
    }

    /// Replace the in-memory record, e.g. with the result of a conditional write
    pub(crate) fn replace_model(&mut self, model: QueryModel) {
        self.model = model;
    }

    /// Stored input in standard format
    pub fn get_input(&self) -> Result<Value> {
        if self.model.input.local.is_null() {
            return Err(QueryError::Translation(format!(
                "Query {} has no input",
                self.model.id
            )));
        }
        self.variant.input_local_to_standard(&self.model.input.local)
    }

    /// Translate a standard input to local format and keep both on the model
    pub fn set_input(&mut self, standard: Value) -> Result<()> {
        let local = self.variant.input_standard_to_local(&standard)?;
        self.model.input.local = local;
        self.model.input.std = standard;
        Ok(())
    }

    /// Stored output in standard format; `null` when nothing was stored yet
    pub async fn get_output(&self) -> Result<Value> {
        match self.model.output.payload() {
            OutputPayload::Empty => Ok(Value::Null),
            OutputPayload::Inline(local) => self.variant.output_local_to_standard(local),
            OutputPayload::Blob(key) => {
                let bytes = self.storage.get(key).await?;
                let local = String::from_utf8(bytes).map_err(|e| {
                    QueryError::Storage(format!("Blob '{}' is not valid UTF-8: {}", key, e))
                })?;
                self.variant.output_local_to_standard(&local)
            }
        }
    }

    /// Translate a standard output to local format and store it inline or as a blob.
    ///
    /// A new blob is written before the previous one is deleted. Failing to
    /// delete the previous blob is logged, not returned.
    pub async fn set_output(&mut self, standard: &Value) -> Result<()> {
        let local = self.variant.output_standard_to_local(standard)?;
        let data_size = local.len() as u64;
        let previous = self.model.output.blob_key().map(str::to_string);

        self.model.output = if data_size >= self.inline_threshold {
            let key = self.storage.create(local.as_bytes()).await?;
            debug!("Query {}: output of {} bytes stored as blob {}", self.model.id, data_size, key);
            QueryOutput::blob(key, data_size)
        } else {
            debug!("Query {}: output of {} bytes stored inline", self.model.id, data_size);
            QueryOutput::inline(local)
        };

        // The model already points at the new output; a stale blob is only logged
        if let Some(old_key) = previous {
            if let Err(e) = self.storage.delete(&old_key).await {
                warn!("Query {}: previous output blob {} not removed: {}", self.model.id, old_key, e);
            }
        }
        Ok(())
    }

    /// Drop the stored output, deleting its blob if any. Returns whether a blob was removed.
    pub async fn clear_output(&mut self) -> Result<bool> {
        let removed = match self.model.output.blob_key() {
            Some(key) => {
                self.storage.delete(key).await?;
                true
            }
            None => false,
        };
        self.model.output = QueryOutput::default();
        Ok(removed)
    }

    /// Overwrite the in-memory model with the stored record
    pub async fn fetch_model(&mut self) -> Result<()> {
        let stored = self
            .collection
            .find_one(&self.model.id)
            .await?
            .ok_or_else(|| QueryError::NotFound(self.model.id.clone()))?;
        self.model = stored;
        Ok(())
    }

    /// Overwrite the stored record with the in-memory model (last write wins)
    pub async fn push_model(&self) -> Result<()> {
        let replaced = self
            .collection
            .find_one_and_replace(&self.model.id, &self.model)
            .await?;
        if !replaced {
            return Err(QueryError::Persistence(format!(
                "Query {} no longer exists",
                self.model.id
            )));
        }
        Ok(())
    }

    /// Context handed to the variant for one execution
    pub fn execution_context(&self, parameters: Value) -> ExecutionContext {
        ExecutionContext {
            query_id: self.model.id.clone(),
            endpoint: self.model.endpoint.clone(),
            credentials: self.model.credentials.clone(),
            local_input: self.model.input.local.clone(),
            parameters,
        }
    }
}
