//! docledger - document issue/return tracking service
//!
//! HTTP CRUD service for tracking issued documents (executor, title, issue
//! date, return date) backed by MongoDB.
//!
//! ## Components
//!
//! - **Model**: persisted record shape, field validation, date invariants,
//!   derived status
//! - **Query builder**: filter + sort construction for listings
//! - **Service**: create/read/update/delete orchestration over an injected
//!   store handle
//! - **Server**: hyper-based HTTP routing mapping service failures to
//!   status codes

pub mod clock;
pub mod config;
pub mod db;
pub mod documents;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{DocError, Result};
