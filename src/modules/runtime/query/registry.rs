//! Create/read/delete of query records and their payloads

use querybridge_core::{NewQuery, QueryError, QueryModel, Result};
use querybridge_types::runtime::DeleteResponse;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::factory::QueryFactory;

/// Record-level operations over the shared stores.
///
/// Source types are not checked at creation: an unregistered type is only
/// reported when something needs its connector.
pub struct QueryRegistry {
    factory: Arc<QueryFactory>,
}

impl QueryRegistry {
    pub fn new(factory: Arc<QueryFactory>) -> Self {
        Self { factory }
    }

    /// Register a new query in state `unknown` with an empty output
    pub async fn create(&self, query: NewQuery) -> Result<QueryModel> {
        let mut model = QueryModel::new(query);
        model.id = self.factory.collection().insert_one(&model).await?;
        info!("Registered query {} ({})", model.id, model.source_type());
        Ok(model)
    }

    /// Stored record for `id`
    pub async fn get(&self, id: &str) -> Result<QueryModel> {
        self.factory
            .collection()
            .find_one(id)
            .await?
            .ok_or_else(|| QueryError::NotFound(id.to_string()))
    }

    /// Delete the blob-stored output (if any), then the record
    pub async fn delete(&self, id: &str) -> Result<DeleteResponse> {
        let model = self.get(id).await?;

        let blob_removed = match model.output.blob_key() {
            Some(key) => match self.factory.storage().delete(key).await {
                Ok(_) => true,
                Err(QueryError::BlobNotFound(_)) => {
                    warn!("Query {}: output blob {} was already gone", id, key);
                    false
                }
                Err(e) => return Err(e),
            },
            None => false,
        };

        if !self.factory.collection().delete_one(id).await? {
            return Err(QueryError::NotFound(id.to_string()));
        }
        info!("Deleted query {}", id);

        Ok(DeleteResponse {
            id: id.to_string(),
            blob_removed,
        })
    }

    /// Input in standard format
    pub async fn get_input(&self, id: &str) -> Result<Value> {
        self.factory.resolve(id).await?.get_input()
    }

    /// Replace the input from a standard-format payload and persist it
    pub async fn put_input(&self, id: &str, standard: Value) -> Result<QueryModel> {
        let mut query = self.factory.resolve(id).await?;
        query.set_input(standard)?;
        query.push_model().await?;
        Ok(query.model().clone())
    }

    /// Output in standard format, `null` when none was stored
    pub async fn get_output(&self, id: &str) -> Result<Value> {
        self.factory.resolve(id).await?.get_output().await
    }

    /// Clear the output and delete its blob
    pub async fn delete_output(&self, id: &str) -> Result<DeleteResponse> {
        let mut query = self.factory.resolve(id).await?;
        let blob_removed = query.clear_output().await?;
        query.push_model().await?;
        Ok(DeleteResponse {
            id: id.to_string(),
            blob_removed,
        })
    }

    pub fn factory(&self) -> &Arc<QueryFactory> {
        &self.factory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_query, Fixture, ECHO_SOURCE_TYPE};
    use querybridge_types::ExecutionState;
    use serde_json::json;

    fn registry(fixture: &Fixture) -> QueryRegistry {
        QueryRegistry::new(fixture.factory.clone())
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_unknown_status() {
        let fixture = Fixture::new(64);
        let registry = registry(&fixture);

        let model = registry.create(new_query(ECHO_SOURCE_TYPE)).await.unwrap();
        assert!(!model.id.is_empty());
        assert_eq!(model.status.status, ExecutionState::Unknown);
        assert!(model.output.data.is_none());
        assert_eq!(registry.get(&model.id).await.unwrap(), model);
    }

    #[tokio::test]
    async fn test_create_accepts_unregistered_type() {
        let fixture = Fixture::new(64);
        let registry = registry(&fixture);

        let model = registry.create(new_query("X")).await.unwrap();
        assert!(registry.get(&model.id).await.is_ok());
        assert!(matches!(
            registry.get_input(&model.id).await,
            Err(QueryError::UnsupportedSourceType(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_blob_output() {
        let fixture = Fixture::new(64);
        let registry = registry(&fixture);
        let model = registry.create(new_query(ECHO_SOURCE_TYPE)).await.unwrap();

        let mut query = fixture.factory.resolve(&model.id).await.unwrap();
        query
            .set_output(&json!({"source": "ECHO", "records": ["x".repeat(500)]}))
            .await
            .unwrap();
        query.push_model().await.unwrap();
        assert_eq!(fixture.blobs.len().await, 1);

        let deleted = registry.delete(&model.id).await.unwrap();
        assert!(deleted.blob_removed);
        assert!(fixture.blobs.is_empty().await);
        assert!(matches!(registry.get(&model.id).await, Err(QueryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_with_inline_output() {
        let fixture = Fixture::new(1024);
        let registry = registry(&fixture);
        let model = registry.create(new_query(ECHO_SOURCE_TYPE)).await.unwrap();

        let deleted = registry.delete(&model.id).await.unwrap();
        assert!(!deleted.blob_removed);
        assert!(matches!(registry.delete(&model.id).await, Err(QueryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_put_input_persists_both_forms() {
        let fixture = Fixture::new(64);
        let registry = registry(&fixture);
        let model = registry.create(new_query(ECHO_SOURCE_TYPE)).await.unwrap();
        let standard = json!({"resource": "/v2/studies", "filter": null, "dataType": "json"});

        let updated = registry.put_input(&model.id, standard.clone()).await.unwrap();
        assert_eq!(updated.input.std, standard);

        let stored = registry.get(&model.id).await.unwrap();
        assert_eq!(stored.input.local, json!({"echo": standard}));
        assert_eq!(registry.get_input(&model.id).await.unwrap(), standard);
    }

    #[tokio::test]
    async fn test_delete_output_keeps_record() {
        let fixture = Fixture::new(64);
        let registry = registry(&fixture);
        let model = registry.create(new_query(ECHO_SOURCE_TYPE)).await.unwrap();

        let mut query = fixture.factory.resolve(&model.id).await.unwrap();
        let output = json!({"source": "ECHO", "records": ["y".repeat(200)]});
        query.set_output(&output).await.unwrap();
        query.push_model().await.unwrap();
        assert_eq!(registry.get_output(&model.id).await.unwrap(), output);

        let cleared = registry.delete_output(&model.id).await.unwrap();
        assert!(cleared.blob_removed);
        assert!(fixture.blobs.is_empty().await);
        assert_eq!(registry.get_output(&model.id).await.unwrap(), Value::Null);
        assert!(registry.get(&model.id).await.is_ok());
    }
}
