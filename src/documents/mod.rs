//! Document tracking core: model, query construction, store seam, service

pub mod model;
pub mod query;
pub mod service;
pub mod store;

pub use model::{
    derive_status, CreateDocument, DocumentRecord, Messages, Patch, Stamp, Status,
    UpdateDocument, DOCUMENT_COLLECTION,
};
pub use query::DocumentQuery;
pub use service::DocumentService;
pub use store::{DocumentStore, MongoDocumentStore};
