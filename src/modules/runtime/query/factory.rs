//! Resolution of query ids to connector-bound query handles

use querybridge_core::{Endpoint, QueryError, QueryModel, Result};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::handle::Query;
use crate::storage::ObjectStorage;
use crate::store::QueryCollection;
use crate::variants::{self, QueryVariant, RestVariant, TransmartVariant};

/// Builds a variant for one endpoint
pub type VariantConstructor =
    Arc<dyn Fn(&Endpoint) -> Result<Arc<dyn QueryVariant>> + Send + Sync>;

/// Upper bound for a single remote call made by the built-in connectors
const REMOTE_TIMEOUT: Duration = Duration::from_secs(120);

/// Maps `endpoint.sourceType` to a variant constructor and binds loaded
/// records to the shared stores.
pub struct QueryFactory {
    registry: HashMap<String, VariantConstructor>,
    collection: Arc<dyn QueryCollection>,
    storage: Arc<ObjectStorage>,
    inline_threshold: u64,
}

impl QueryFactory {
    /// Create a factory with an empty registry
    pub fn new(
        collection: Arc<dyn QueryCollection>,
        storage: Arc<ObjectStorage>,
        inline_threshold: u64,
    ) -> Self {
        Self {
            registry: HashMap::new(),
            collection,
            storage,
            inline_threshold,
        }
    }

    /// Create a factory with the built-in `TS171` and `REST` connectors
    pub fn with_default_variants(
        collection: Arc<dyn QueryCollection>,
        storage: Arc<ObjectStorage>,
        inline_threshold: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(REMOTE_TIMEOUT)
            .build()
            .map_err(|e| QueryError::Config(format!("HTTP client creation failed: {}", e)))?;

        let mut factory = Self::new(collection, storage, inline_threshold);

        factory.register_shared(
            variants::transmart::SOURCE_TYPE,
            Arc::new(TransmartVariant::new(client.clone())),
        );
        factory.register_shared(
            variants::rest::SOURCE_TYPE,
            Arc::new(RestVariant::new(client)),
        );

        Ok(factory)
    }

    /// Register (or replace) the constructor for a source type
    pub fn register(&mut self, source_type: impl Into<String>, constructor: VariantConstructor) {
        self.registry.insert(source_type.into(), constructor);
    }

    /// Register one variant instance shared by every query of that source type
    pub fn register_shared(&mut self, source_type: impl Into<String>, variant: Arc<dyn QueryVariant>) {
        let constructor = move |_: &Endpoint| -> Result<Arc<dyn QueryVariant>> { Ok(variant.clone()) };
        self.register(source_type, Arc::new(constructor));
    }

    pub fn is_registered(&self, source_type: &str) -> bool {
        self.registry.contains_key(source_type)
    }

    /// Registered source types, sorted
    pub fn source_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn collection(&self) -> &Arc<dyn QueryCollection> {
        &self.collection
    }

    pub fn storage(&self) -> &Arc<ObjectStorage> {
        &self.storage
    }

    pub fn inline_threshold(&self) -> u64 {
        self.inline_threshold
    }

    /// Load the record for `id` and bind it to its connector
    pub async fn resolve(&self, id: &str) -> Result<Query> {
        let model = self
            .collection
            .find_one(id)
            .await?
            .ok_or_else(|| QueryError::NotFound(id.to_string()))?;
        self.instantiate(model)
    }

    /// Bind an already loaded record to its connector
    pub fn instantiate(&self, model: QueryModel) -> Result<Query> {
        let source_type = model.source_type();
        let constructor = self
            .registry
            .get(source_type)
            .ok_or_else(|| QueryError::UnsupportedSourceType(source_type.to_string()))?;

        let variant = constructor(&model.endpoint)?;
        debug!("Query {} resolved to source type {}", model.id, source_type);

        Ok(Query::new(
            model,
            variant,
            self.collection.clone(),
            self.storage.clone(),
            self.inline_threshold,
        ))
    }
}
