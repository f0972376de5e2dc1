//! Test doubles shared by the unit tests of this crate

use async_trait::async_trait;
use querybridge_core::{Endpoint, NewQuery, QueryError, QueryInput, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::query::{Query, QueryFactory};
use crate::storage::{MemoryBlobBackend, ObjectStorage};
use crate::store::{MemoryQueryCollection, QueryCollection};
use crate::variants::{ExecutionContext, QueryVariant};

pub const ECHO_SOURCE_TYPE: &str = "ECHO";
pub const FAILING_SOURCE_TYPE: &str = "FAILING";
pub const GATED_SOURCE_TYPE: &str = "GATED";

/// Wraps standard inputs as `{"echo": ...}` and keeps outputs as JSON text.
/// `execute` returns the execution parameters, or the stored input as a single record.
pub struct EchoVariant;

#[async_trait]
impl QueryVariant for EchoVariant {
    fn source_type(&self) -> &str {
        ECHO_SOURCE_TYPE
    }

    fn input_local_to_standard(&self, local: &Value) -> Result<Value> {
        local
            .get("echo")
            .cloned()
            .ok_or_else(|| QueryError::Translation("missing 'echo'".to_string()))
    }

    fn input_standard_to_local(&self, standard: &Value) -> Result<Value> {
        Ok(json!({ "echo": standard }))
    }

    fn output_local_to_standard(&self, local: &str) -> Result<Value> {
        serde_json::from_str(local).map_err(|e| QueryError::Translation(e.to_string()))
    }

    fn output_standard_to_local(&self, standard: &Value) -> Result<String> {
        Ok(serde_json::to_string(standard)?)
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        if !ctx.parameters.is_null() {
            return Ok(ctx.parameters.clone());
        }
        Ok(json!({ "source": ECHO_SOURCE_TYPE, "records": [ctx.local_input.clone()] }))
    }
}

/// Echo translations, but every remote call fails
pub struct FailingVariant;

#[async_trait]
impl QueryVariant for FailingVariant {
    fn source_type(&self) -> &str {
        FAILING_SOURCE_TYPE
    }

    fn input_local_to_standard(&self, local: &Value) -> Result<Value> {
        EchoVariant.input_local_to_standard(local)
    }

    fn input_standard_to_local(&self, standard: &Value) -> Result<Value> {
        EchoVariant.input_standard_to_local(standard)
    }

    fn output_local_to_standard(&self, local: &str) -> Result<Value> {
        EchoVariant.output_local_to_standard(local)
    }

    fn output_standard_to_local(&self, standard: &Value) -> Result<String> {
        EchoVariant.output_standard_to_local(standard)
    }

    async fn execute(&self, _ctx: &ExecutionContext) -> Result<Value> {
        Err(QueryError::RemoteExecution("source unreachable".to_string()))
    }
}

/// Echo whose `execute` waits until the gate is opened
pub struct GatedVariant {
    gate: Arc<Notify>,
}

#[async_trait]
impl QueryVariant for GatedVariant {
    fn source_type(&self) -> &str {
        GATED_SOURCE_TYPE
    }

    fn input_local_to_standard(&self, local: &Value) -> Result<Value> {
        EchoVariant.input_local_to_standard(local)
    }

    fn input_standard_to_local(&self, standard: &Value) -> Result<Value> {
        EchoVariant.input_standard_to_local(standard)
    }

    fn output_local_to_standard(&self, local: &str) -> Result<Value> {
        EchoVariant.output_local_to_standard(local)
    }

    fn output_standard_to_local(&self, standard: &Value) -> Result<String> {
        EchoVariant.output_standard_to_local(standard)
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        self.gate.notified().await;
        EchoVariant.execute(ctx).await
    }
}

/// In-memory stores and a factory knowing the echo, failing and gated variants
pub struct Fixture {
    pub collection: Arc<MemoryQueryCollection>,
    pub blobs: Arc<MemoryBlobBackend>,
    pub storage: Arc<ObjectStorage>,
    pub factory: Arc<QueryFactory>,
    /// Opens one pending gated execution per `notify_one`
    pub gate: Arc<Notify>,
}

impl Fixture {
    pub fn new(inline_threshold: u64) -> Self {
        let collection = Arc::new(MemoryQueryCollection::new());
        let blobs = Arc::new(MemoryBlobBackend::new());
        let storage = Arc::new(ObjectStorage::new(blobs.clone()));

        let mut factory = QueryFactory::new(collection.clone(), storage.clone(), inline_threshold);
        factory.register_shared(ECHO_SOURCE_TYPE, Arc::new(EchoVariant));
        factory.register_shared(FAILING_SOURCE_TYPE, Arc::new(FailingVariant));

        let gate = Arc::new(Notify::new());
        factory.register_shared(
            GATED_SOURCE_TYPE,
            Arc::new(GatedVariant { gate: gate.clone() }),
        );

        Self {
            collection,
            blobs,
            storage,
            factory: Arc::new(factory),
            gate,
        }
    }
}

pub fn new_query(source_type: &str) -> NewQuery {
    let std = json!({ "resource": "/initial", "filter": {}, "dataType": "json" });
    NewQuery {
        endpoint: Endpoint {
            source_type: source_type.to_string(),
            source_name: "test source".to_string(),
            source_host: "localhost".to_string(),
            source_port: 8080,
            public: false,
        },
        credentials: Default::default(),
        input: QueryInput {
            local: json!({ "echo": std.clone() }),
            std,
        },
    }
}

/// Insert a fresh record and return its id
pub async fn insert_query(fixture: &Fixture, source_type: &str) -> String {
    let model = querybridge_core::QueryModel::new(new_query(source_type));
    fixture.collection.insert_one(&model).await.unwrap()
}

/// Insert an echo record and resolve it
pub async fn echo_query(fixture: &Fixture) -> Query {
    let id = insert_query(fixture, ECHO_SOURCE_TYPE).await;
    fixture.factory.resolve(&id).await.unwrap()
}
