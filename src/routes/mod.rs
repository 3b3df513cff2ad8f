//! HTTP routes for docledger

pub mod documents;
pub mod health;

pub use documents::{error_response, handle_documents_request, json_response};
pub use health::{health_check, root_info, version_info};
