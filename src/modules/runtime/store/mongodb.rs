//! MongoDB-backed document store

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::{ClientOptions, FindOneAndUpdateOptions, ReturnDocument};
use mongodb::{Client, Collection, Database};
use querybridge_core::{QueryError, QueryModel, QueryStatus, Result};
use tracing::debug;

use super::traits::{Claim, QueryCollection};

/// Open a client and select `database`
pub async fn connect(url: &str, database: &str) -> Result<Database> {
    let mut options = ClientOptions::parse(url).await.map_err(|e| {
        QueryError::Persistence(format!("MongoDB options parse failed: {}", e))
    })?;
    options.min_pool_size = options.min_pool_size.or(Some(1));
    options.max_pool_size = options.max_pool_size.or(Some(10));
    options.app_name = options.app_name.or(Some("querybridge".to_string()));

    let client = Client::with_options(options).map_err(|e| {
        QueryError::Persistence(format!("MongoDB client creation failed: {}", e))
    })?;

    let db = client.database(database);
    db.run_command(doc! { "ping": 1 }, None)
        .await
        .map_err(|e| QueryError::Persistence(format!("MongoDB ping failed: {}", e)))?;

    Ok(db)
}

/// Query records stored as documents with an ObjectId `_id`
pub struct MongoQueryCollection {
    collection: Collection<Document>,
}

impl MongoQueryCollection {
    pub fn new(db: &Database, name: &str) -> Self {
        Self {
            collection: db.collection::<Document>(name),
        }
    }
}

/// Ids that are not valid ObjectIds cannot match any record
fn parse_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

fn model_to_document(record: &QueryModel) -> Result<Document> {
    let mut document = bson::to_document(record)
        .map_err(|e| QueryError::Persistence(format!("Cannot encode query record: {}", e)))?;
    document.remove("_id");
    Ok(document)
}

fn document_to_model(mut document: Document) -> Result<QueryModel> {
    let id = match document.remove("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(s)) => s,
        Some(other) => {
            return Err(QueryError::Persistence(format!(
                "Unexpected _id type in query record: {}",
                other
            )))
        }
        None => String::new(),
    };
    let mut model: QueryModel = bson::from_document(document)
        .map_err(|e| QueryError::Persistence(format!("Cannot decode query record: {}", e)))?;
    model.id = id;
    Ok(model)
}

fn persistence(action: &str) -> impl Fn(mongodb::error::Error) -> QueryError + '_ {
    move |e| QueryError::Persistence(format!("{} failed: {}", action, e))
}

#[async_trait]
impl QueryCollection for MongoQueryCollection {
    async fn find_one(&self, id: &str) -> Result<Option<QueryModel>> {
        let Some(oid) = parse_id(id) else {
            return Ok(None);
        };
        let found = self
            .collection
            .find_one(doc! { "_id": oid }, None)
            .await
            .map_err(persistence("findOne"))?;
        found.map(document_to_model).transpose()
    }

    async fn find_one_and_replace(&self, id: &str, record: &QueryModel) -> Result<bool> {
        let Some(oid) = parse_id(id) else {
            return Ok(false);
        };
        let replacement = model_to_document(record)?;
        let previous = self
            .collection
            .find_one_and_replace(doc! { "_id": oid }, replacement, None)
            .await
            .map_err(persistence("findOneAndReplace"))?;
        Ok(previous.is_some())
    }

    async fn insert_one(&self, record: &QueryModel) -> Result<String> {
        let document = model_to_document(record)?;
        let result = self
            .collection
            .insert_one(document, None)
            .await
            .map_err(persistence("insertOne"))?;
        match result.inserted_id {
            Bson::ObjectId(oid) => Ok(oid.to_hex()),
            other => Err(QueryError::Persistence(format!(
                "insertOne returned a non-ObjectId id: {}",
                other
            ))),
        }
    }

    async fn delete_one(&self, id: &str) -> Result<bool> {
        let Some(oid) = parse_id(id) else {
            return Ok(false);
        };
        let result = self
            .collection
            .delete_one(doc! { "_id": oid }, None)
            .await
            .map_err(persistence("deleteOne"))?;
        Ok(result.deleted_count > 0)
    }

    async fn claim(&self, id: &str, status: &QueryStatus) -> Result<Claim> {
        let Some(oid) = parse_id(id) else {
            return Ok(Claim::Missing);
        };
        let status = bson::to_bson(status)
            .map_err(|e| QueryError::Persistence(format!("Cannot encode status: {}", e)))?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .collection
            .find_one_and_update(
                doc! { "_id": oid, "status.status": "unknown" },
                doc! { "$set": { "status": status } },
                options,
            )
            .await
            .map_err(persistence("claim"))?;

        if let Some(document) = updated {
            return Ok(Claim::Claimed(document_to_model(document)?));
        }

        debug!("Claim on {} rejected, reading current state", id);
        match self.find_one(id).await? {
            Some(current) => Ok(Claim::Rejected(current.status.status)),
            None => Ok(Claim::Missing),
        }
    }

    async fn fail_running(&self, id: &str, status: &QueryStatus) -> Result<bool> {
        let Some(oid) = parse_id(id) else {
            return Ok(false);
        };
        let status = bson::to_bson(status)
            .map_err(|e| QueryError::Persistence(format!("Cannot encode status: {}", e)))?;

        let result = self
            .collection
            .update_one(
                doc! { "_id": oid, "status.status": "running" },
                doc! { "$set": { "status": status } },
                None,
            )
            .await
            .map_err(persistence("failRunning"))?;
        Ok(result.matched_count > 0)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querybridge_core::{Endpoint, NewQuery, QueryOutput};

    fn record() -> QueryModel {
        QueryModel::new(NewQuery {
            endpoint: Endpoint {
                source_type: "TS171".into(),
                source_name: "tm".into(),
                source_host: "http://transmart.example.org".into(),
                source_port: 80,
                public: false,
            },
            credentials: Default::default(),
            input: Default::default(),
        })
    }

    #[test]
    fn test_document_round_trip_keeps_object_id() {
        let oid = ObjectId::new();
        let mut model = record();
        model.output = QueryOutput::inline("{}".into());

        let mut document = model_to_document(&model).unwrap();
        assert!(document.get("_id").is_none());
        document.insert("_id", oid);

        let decoded = document_to_model(document).unwrap();
        assert_eq!(decoded.id, oid.to_hex());
        assert_eq!(decoded.output, model.output);
        assert_eq!(decoded.endpoint, model.endpoint);
    }

    #[test]
    fn test_model_id_is_never_written() {
        let mut model = record();
        model.id = ObjectId::new().to_hex();
        let document = model_to_document(&model).unwrap();
        assert!(!document.contains_key("_id"));
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(parse_id("invalid_query_id_Not_Object_id_compatible").is_none());
        assert!(parse_id(&ObjectId::new().to_hex()).is_some());
    }

    #[tokio::test]
    #[ignore] // Requires a running MongoDB instance
    async fn test_mongodb_claim() {
        let db = connect("mongodb://localhost:27017", "querybridge_test").await.unwrap();
        let collection = MongoQueryCollection::new(&db, "queries");
        let id = collection.insert_one(&record()).await.unwrap();
        let running = QueryStatus::running(chrono::Utc::now());

        assert!(matches!(collection.claim(&id, &running).await.unwrap(), Claim::Claimed(_)));
        assert!(matches!(collection.claim(&id, &running).await.unwrap(), Claim::Rejected(_)));
        assert!(collection.delete_one(&id).await.unwrap());
    }
}
