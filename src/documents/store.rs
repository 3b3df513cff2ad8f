//! Store handle for the documents collection
//!
//! The service talks to persistence through the `DocumentStore` trait so the
//! MongoDB implementation can be swapped for an in-memory one in tests. The
//! driver's atomic single-document operations are the only concurrency
//! guarantee; no extra locking, timeouts, or retries are layered on top.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures_util::StreamExt;
use mongodb::options::ReturnDocument;
use mongodb::Collection;
use tracing::error;

use crate::documents::model::DocumentRecord;
use crate::documents::query::DocumentQuery;
use crate::types::DocError;

/// Persistence operations the document service needs
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a record, returning the store-assigned id
    async fn insert_one(&self, record: &DocumentRecord) -> Result<ObjectId, DocError>;

    /// Run a filtered, sorted find, returning raw records
    ///
    /// Records are returned unparsed so the caller can apply its
    /// skip-on-parse-failure policy per record.
    async fn find(&self, query: &DocumentQuery) -> Result<Vec<Document>, DocError>;

    /// Fetch one raw record by id
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>, DocError>;

    /// Atomically apply a `$set` and return the post-update raw record,
    /// or `None` if no record matched
    async fn update_by_id(&self, id: &ObjectId, set: Document) -> Result<Option<Document>, DocError>;

    /// Delete one record by id, returning the number deleted
    async fn delete_by_id(&self, id: &ObjectId) -> Result<u64, DocError>;
}

/// MongoDB-backed document store
///
/// Operates on the raw collection; typed parsing happens in the service so
/// list operations can tolerate malformed records.
#[derive(Clone)]
pub struct MongoDocumentStore {
    collection: Collection<Document>,
}

impl MongoDocumentStore {
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn insert_one(&self, record: &DocumentRecord) -> Result<ObjectId, DocError> {
        let doc = bson::to_document(record)
            .map_err(|e| DocError::Store(format!("Failed to serialize document: {}", e)))?;

        let result = self
            .collection
            .insert_one(doc)
            .await
            .map_err(|e| DocError::Store(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| DocError::Store("Failed to get inserted ID".into()))
    }

    async fn find(&self, query: &DocumentQuery) -> Result<Vec<Document>, DocError> {
        let cursor = self
            .collection
            .find(query.filter.clone())
            .sort(query.sort.clone())
            .await
            .map_err(|e| DocError::Store(format!("Find failed: {}", e)))?;

        let results: Vec<Document> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document from cursor: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>, DocError> {
        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| DocError::Store(format!("Find failed: {}", e)))
    }

    async fn update_by_id(
        &self,
        id: &ObjectId,
        set: Document,
    ) -> Result<Option<Document>, DocError> {
        self.collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| DocError::Store(format!("Update failed: {}", e)))
    }

    async fn delete_by_id(&self, id: &ObjectId) -> Result<u64, DocError> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id })
            .await
            .map_err(|e| DocError::Store(format!("Delete failed: {}", e)))?;

        Ok(result.deleted_count)
    }
}
