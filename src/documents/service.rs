//! Document service
//!
//! Orchestrates create/read/update/delete against the documents collection.
//! Validation runs before any store call; store failures surface as
//! `DocError::Store`; list operations skip records that no longer parse
//! instead of failing the whole listing.

use std::sync::Arc;

use bson::{oid::ObjectId, Document};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::documents::model::{CreateDocument, DocumentRecord, Messages, UpdateDocument};
use crate::documents::query::DocumentQuery;
use crate::documents::store::DocumentStore;
use crate::types::{DocError, Result};

pub struct DocumentService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    messages: Messages,
}

impl DocumentService {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, messages: Messages) -> Self {
        Self {
            store,
            clock,
            messages,
        }
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Create a document and return the persisted form
    ///
    /// The record is re-read after insert so the caller sees exactly what the
    /// store holds (id assignment, field coercion).
    pub async fn create(&self, command: CreateDocument) -> Result<DocumentRecord> {
        command.validate(self.clock.as_ref(), &self.messages)?;

        let now = bson::DateTime::from_chrono(self.clock.now_utc());
        let record = DocumentRecord {
            id: None,
            executor: command.executor,
            document: command.document,
            date_given: command.date_given.to_bson(),
            date_returned: command.date_returned.map(|s| s.to_bson()),
            created_at: now,
            updated_at: now,
        };

        let id = self.store.insert_one(&record).await?;

        let raw = self
            .store
            .find_by_id(&id)
            .await?
            .ok_or_else(|| DocError::Store("Failed to retrieve created document".into()))?;

        let created = parse_record(raw)?;
        info!("Created document with ID: {}", id);
        Ok(created)
    }

    /// All documents, newest `dateGiven` first
    pub async fn get_all(&self) -> Result<Vec<DocumentRecord>> {
        let documents = self.run_query(&DocumentQuery::all()).await?;
        info!("Retrieved {} documents", documents.len());
        Ok(documents)
    }

    /// One document by id
    pub async fn get_by_id(&self, id: &str) -> Result<DocumentRecord> {
        let oid = self.parse_id(id)?;
        let raw = self.store.find_by_id(&oid).await?.ok_or(DocError::NotFound)?;
        parse_record(raw)
    }

    /// Documents whose executor contains the given substring,
    /// case-insensitively
    pub async fn get_by_executor(&self, executor: &str) -> Result<Vec<DocumentRecord>> {
        let documents = self.run_query(&DocumentQuery::by_executor(executor)).await?;
        info!("Found {} documents for executor: {}", documents.len(), executor);
        Ok(documents)
    }

    /// Documents filtered by derived status ("active" or "returned")
    pub async fn get_by_status(&self, status: &str) -> Result<Vec<DocumentRecord>> {
        let query = DocumentQuery::by_status(status, &self.messages)?;
        let documents = self.run_query(&query).await?;
        info!("Found {} documents with status: {}", documents.len(), status);
        Ok(documents)
    }

    /// Apply a partial update and return the post-update record
    ///
    /// `updatedAt` is refreshed on every successful update. The
    /// find-and-update is atomic; no record matching the id is `NotFound`.
    pub async fn update(&self, id: &str, update: UpdateDocument) -> Result<DocumentRecord> {
        let oid = self.parse_id(id)?;
        let mut set = update.validate(self.clock.as_ref(), &self.messages)?;
        set.insert("updatedAt", bson::DateTime::from_chrono(self.clock.now_utc()));

        let raw = self
            .store
            .update_by_id(&oid, set)
            .await?
            .ok_or(DocError::NotFound)?;

        let updated = parse_record(raw)?;
        info!("Updated document {}", id);
        Ok(updated)
    }

    /// Hard-delete one document by id
    pub async fn delete(&self, id: &str) -> Result<()> {
        let oid = self.parse_id(id)?;
        let deleted = self.store.delete_by_id(&oid).await?;

        if deleted == 0 {
            return Err(DocError::NotFound);
        }

        info!("Deleted document {}", id);
        Ok(())
    }

    fn parse_id(&self, id: &str) -> Result<ObjectId> {
        ObjectId::parse_str(id)
            .map_err(|_| DocError::validation("id", &self.messages.invalid_id))
    }

    /// Run a listing query, skipping raw records that fail to parse
    async fn run_query(&self, query: &DocumentQuery) -> Result<Vec<DocumentRecord>> {
        let raw_records = self.store.find(query).await?;

        let mut documents = Vec::with_capacity(raw_records.len());
        for raw in raw_records {
            let id = raw.get("_id").cloned();
            match bson::from_document::<DocumentRecord>(raw) {
                Ok(record) => documents.push(record),
                Err(e) => {
                    warn!("Skipping invalid document {:?}: {}", id, e);
                }
            }
        }

        Ok(documents)
    }
}

/// Parse a single-record fetch; a malformed record here is a store failure,
/// not a skippable entry
fn parse_record(raw: Document) -> Result<DocumentRecord> {
    bson::from_document(raw).map_err(|e| DocError::Store(format!("Failed to parse document: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::model::Status;
    use async_trait::async_trait;
    use bson::doc;
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Clock that advances one second per reading, so successive stamps are
    /// strictly ordered
    struct SteppingClock {
        ticks: AtomicI64,
    }

    impl SteppingClock {
        fn new() -> Self {
            Self {
                ticks: AtomicI64::new(0),
            }
        }

        fn base() -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
        }
    }

    impl Clock for SteppingClock {
        fn now_utc(&self) -> DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            Self::base() + chrono::Duration::seconds(tick)
        }

        fn now_naive(&self) -> NaiveDateTime {
            self.now_utc().naive_utc()
        }
    }

    /// In-memory store understanding the three filter shapes the query
    /// builder produces
    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<Vec<Document>>,
        calls: AtomicUsize,
    }

    impl MemoryStore {
        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn push_raw(&self, doc: Document) {
            self.records.lock().unwrap().push(doc);
        }

        fn matches(filter: &Document, record: &Document) -> bool {
            if filter.is_empty() {
                return true;
            }
            if let Ok(executor_filter) = filter.get_document("executor") {
                let pattern = executor_filter.get_str("$regex").unwrap_or_default();
                let literal: String = pattern.chars().filter(|c| *c != '\\').collect();
                let executor = record.get_str("executor").unwrap_or_default();
                return executor.to_lowercase().contains(&literal.to_lowercase());
            }
            if let Some(status_filter) = filter.get("dateReturned") {
                let returned = record.get("dateReturned");
                let present = matches!(returned, Some(v) if *v != bson::Bson::Null);
                return match status_filter {
                    bson::Bson::Null => !present,
                    _ => present,
                };
            }
            false
        }
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn insert_one(&self, record: &DocumentRecord) -> crate::types::Result<ObjectId> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let id = ObjectId::new();
            let mut doc = bson::to_document(record).unwrap();
            doc.insert("_id", id);
            self.records.lock().unwrap().push(doc);
            Ok(id)
        }

        async fn find(&self, query: &DocumentQuery) -> crate::types::Result<Vec<Document>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut matched: Vec<Document> = self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| Self::matches(&query.filter, r))
                .cloned()
                .collect();
            matched.sort_by(|a, b| {
                let a = a.get_datetime("dateGiven").cloned().unwrap_or_else(|_| bson::DateTime::from_millis(0));
                let b = b.get_datetime("dateGiven").cloned().unwrap_or_else(|_| bson::DateTime::from_millis(0));
                b.cmp(&a)
            });
            Ok(matched)
        }

        async fn find_by_id(&self, id: &ObjectId) -> crate::types::Result<Option<Document>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.get_object_id("_id") == Ok(*id))
                .cloned())
        }

        async fn update_by_id(
            &self,
            id: &ObjectId,
            set: Document,
        ) -> crate::types::Result<Option<Document>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|r| r.get_object_id("_id") == Ok(*id));
            match record {
                Some(record) => {
                    for (key, value) in set {
                        record.insert(key, value);
                    }
                    Ok(Some(record.clone()))
                }
                None => Ok(None),
            }
        }

        async fn delete_by_id(&self, id: &ObjectId) -> crate::types::Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.get_object_id("_id") != Ok(*id));
            Ok((before - records.len()) as u64)
        }
    }

    fn service() -> (DocumentService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(SteppingClock::new());
        let service = DocumentService::new(store.clone(), clock, Messages::default());
        (service, store)
    }

    fn create_command(executor: &str, title: &str, date_given: &str) -> CreateDocument {
        serde_json::from_value(serde_json::json!({
            "executor": executor,
            "document": title,
            "dateGiven": date_given,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_returns_persisted_active_document() {
        let (service, _) = service();
        let created = service
            .create(create_command("J. Smith", "Invoice #42", "2024-01-10T00:00:00Z"))
            .await
            .unwrap();

        assert!(created.id.is_some());
        assert_eq!(created.status(), Status::Active);
        assert!(created.date_returned.is_none());
        assert_eq!(created.created_at, created.updated_at);
    }

    #[tokio::test]
    async fn test_create_with_return_date_is_returned() {
        let (service, _) = service();
        let command: CreateDocument = serde_json::from_value(serde_json::json!({
            "executor": "J. Smith",
            "document": "Invoice #42",
            "dateGiven": "2024-01-10T00:00:00Z",
            "dateReturned": "2024-01-15T00:00:00Z",
        }))
        .unwrap();

        let created = service.create(command).await.unwrap();
        assert_eq!(created.status(), Status::Returned);
    }

    #[tokio::test]
    async fn test_create_validation_failure_never_reaches_store() {
        let (service, store) = service();
        let err = service
            .create(create_command("J.", "Invoice #42", "2024-01-10T00:00:00Z"))
            .await
            .unwrap_err();

        assert!(matches!(err, DocError::Validation { .. }));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_get_by_id_rejects_malformed_id_before_store() {
        let (service, store) = service();
        let err = service.get_by_id("not-an-object-id").await.unwrap_err();
        assert!(matches!(err, DocError::Validation { ref field, .. } if field == "id"));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_get_by_id_unknown_is_not_found() {
        let (service, _) = service();
        let err = service.get_by_id(&ObjectId::new().to_hex()).await.unwrap_err();
        assert!(matches!(err, DocError::NotFound));
    }

    #[tokio::test]
    async fn test_update_with_no_fields_never_reaches_store() {
        let (service, store) = service();
        let err = service
            .update(&ObjectId::new().to_hex(), UpdateDocument::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DocError::Validation { ref reason, .. }
            if reason == "No fields to update"));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let (service, _) = service();
        let update: UpdateDocument =
            serde_json::from_value(serde_json::json!({ "executor": "New Executor" })).unwrap();
        let err = service
            .update(&ObjectId::new().to_hex(), update)
            .await
            .unwrap_err();
        assert!(matches!(err, DocError::NotFound));
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_fields_and_refreshes_updated_at() {
        let (service, _) = service();
        let created = service
            .create(create_command("J. Smith", "Invoice #42", "2024-01-10T00:00:00Z"))
            .await
            .unwrap();
        let id = created.id.unwrap().to_hex();

        let update: UpdateDocument =
            serde_json::from_value(serde_json::json!({ "executor": "Jane Cooper" })).unwrap();
        let updated = service.update(&id, update).await.unwrap();

        assert_eq!(updated.executor, "Jane Cooper");
        assert_eq!(updated.document, created.document);
        assert_eq!(updated.date_given, created.date_given);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_setting_return_date_flips_status() {
        let (service, _) = service();
        let created = service
            .create(create_command("J. Smith", "Invoice #42", "2024-01-10T00:00:00Z"))
            .await
            .unwrap();
        let id = created.id.unwrap().to_hex();

        let update: UpdateDocument = serde_json::from_value(
            serde_json::json!({ "dateReturned": "2024-01-15T00:00:00Z" }),
        )
        .unwrap();
        let updated = service.update(&id, update).await.unwrap();
        assert_eq!(updated.status(), Status::Returned);

        let returned = service.get_by_status("returned").await.unwrap();
        assert!(returned.iter().any(|d| d.id == created.id));
        let active = service.get_by_status("active").await.unwrap();
        assert!(!active.iter().any(|d| d.id == created.id));
    }

    #[tokio::test]
    async fn test_clearing_return_date_reactivates_document() {
        let (service, _) = service();
        let command: CreateDocument = serde_json::from_value(serde_json::json!({
            "executor": "J. Smith",
            "document": "Invoice #42",
            "dateGiven": "2024-01-10T00:00:00Z",
            "dateReturned": "2024-01-15T00:00:00Z",
        }))
        .unwrap();
        let created = service.create(command).await.unwrap();
        let id = created.id.unwrap().to_hex();

        let update: UpdateDocument =
            serde_json::from_value(serde_json::json!({ "dateReturned": null })).unwrap();
        let updated = service.update(&id, update).await.unwrap();
        assert_eq!(updated.status(), Status::Active);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_found() {
        let (service, _) = service();
        let err = service.delete(&ObjectId::new().to_hex()).await.unwrap_err();
        assert!(matches!(err, DocError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let (service, _) = service();
        let created = service
            .create(create_command("J. Smith", "Invoice #42", "2024-01-10T00:00:00Z"))
            .await
            .unwrap();
        let id = created.id.unwrap().to_hex();

        service.delete(&id).await.unwrap();
        let err = service.get_by_id(&id).await.unwrap_err();
        assert!(matches!(err, DocError::NotFound));
    }

    #[tokio::test]
    async fn test_get_by_status_rejects_bogus_value() {
        let (service, store) = service();
        let err = service.get_by_status("bogus").await.unwrap_err();
        assert!(matches!(err, DocError::Validation { ref field, .. } if field == "status"));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_get_by_executor_is_case_insensitive_substring() {
        let (service, _) = service();
        service
            .create(create_command("J. Smith", "Invoice #42", "2024-01-10T00:00:00Z"))
            .await
            .unwrap();
        service
            .create(create_command("A. Jones", "Delivery note", "2024-01-11T00:00:00Z"))
            .await
            .unwrap();

        let matched = service.get_by_executor("smith").await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].executor, "J. Smith");
    }

    #[tokio::test]
    async fn test_get_all_sorts_by_date_given_desc() {
        let (service, _) = service();
        service
            .create(create_command("First Holder", "Older document", "2024-01-10T00:00:00Z"))
            .await
            .unwrap();
        service
            .create(create_command("Second Holder", "Newer document", "2024-02-10T00:00:00Z"))
            .await
            .unwrap();

        let all = service.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].document, "Newer document");
        assert_eq!(all[1].document, "Older document");
    }

    #[tokio::test]
    async fn test_listing_skips_malformed_record() {
        let (service, store) = service();
        service
            .create(create_command("J. Smith", "Invoice #42", "2024-01-10T00:00:00Z"))
            .await
            .unwrap();
        // A record missing required fields cannot parse into DocumentRecord
        store.push_raw(doc! { "_id": ObjectId::new(), "executor": "Orphan Entry" });

        let all = service.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].executor, "J. Smith");
    }
}
