//! Document API endpoints
//!
//! ## Endpoints
//!
//! - `GET /documents` - List all documents
//! - `GET /documents/{id}` - Get document by id
//! - `GET /documents/executor/{executor}` - Filter by executor substring
//! - `GET /documents/status/{status}` - Filter by status (active/returned)
//! - `POST /documents` - Create a document
//! - `PUT /documents/{id}` - Partial update
//! - `DELETE /documents/{id}` - Delete by id
//!
//! Service failures map to status codes: validation 400, not-found 404,
//! store 500.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::documents::model::{CreateDocument, DocumentRecord, UpdateDocument};
use crate::server::AppState;
use crate::types::DocError;

type FullBody = Full<Bytes>;

// =============================================================================
// Response Types
// =============================================================================

/// Document as returned to clients, with the derived status included
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub executor: String,
    pub document: String,
    #[serde(rename = "dateGiven")]
    pub date_given: String,
    #[serde(rename = "dateReturned")]
    pub date_returned: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    pub status: &'static str,
}

/// Response for document lists
#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentResponse>,
    pub total: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// =============================================================================
// Response Helpers
// =============================================================================

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

pub fn error_response(status: StatusCode, error: &str, code: Option<&str>) -> Response<FullBody> {
    json_response(
        status,
        &ErrorResponse {
            error: error.to_string(),
            code: code.map(|c| c.to_string()),
            field: None,
        },
    )
}

/// Map a service failure to an HTTP response
fn failure_response(err: DocError) -> Response<FullBody> {
    match err {
        DocError::Validation { field, reason } => json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse {
                error: reason,
                code: Some("VALIDATION_ERROR".to_string()),
                field: Some(field),
            },
        ),
        DocError::NotFound => {
            error_response(StatusCode::NOT_FOUND, "Document not found", Some("NOT_FOUND"))
        }
        DocError::Store(cause) => {
            warn!("Store failure: {}", cause);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error",
                Some("DB_ERROR"),
            )
        }
    }
}

fn to_response(record: DocumentRecord) -> DocumentResponse {
    DocumentResponse {
        id: record.id.map(|o| o.to_hex()).unwrap_or_default(),
        status: record.status().as_str(),
        executor: record.executor,
        document: record.document,
        date_given: rfc3339(record.date_given),
        date_returned: record.date_returned.map(rfc3339),
        created_at: rfc3339(record.created_at),
        updated_at: rfc3339(record.updated_at),
    }
}

fn rfc3339(dt: bson::DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}

fn list_response(records: Vec<DocumentRecord>) -> Response<FullBody> {
    let documents: Vec<DocumentResponse> = records.into_iter().map(to_response).collect();
    json_response(
        StatusCode::OK,
        &DocumentListResponse {
            total: documents.len(),
            documents,
        },
    )
}

// =============================================================================
// Route Handler
// =============================================================================

/// Main handler for /documents/* routes
pub async fn handle_documents_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path
        .strip_prefix("/documents")
        .unwrap_or("")
        .trim_end_matches('/')
        .to_string();

    match (method, subpath.as_str()) {
        (Method::GET, "") => handle_list(state).await,

        (Method::GET, p) if p.starts_with("/executor/") => {
            let executor = decode_segment(p.trim_start_matches("/executor/"));
            handle_by_executor(state, &executor).await
        }

        (Method::GET, p) if p.starts_with("/status/") => {
            let status = decode_segment(p.trim_start_matches("/status/"));
            handle_by_status(state, &status).await
        }

        (Method::GET, p) => {
            let id = p.trim_start_matches('/');
            handle_get(state, id).await
        }

        (Method::POST, "") => handle_create(req, state).await,

        (Method::PUT, p) => {
            let id = p.trim_start_matches('/').to_string();
            handle_update(req, state, &id).await
        }

        (Method::DELETE, p) => {
            let id = p.trim_start_matches('/');
            handle_delete(state, id).await
        }

        _ => error_response(StatusCode::NOT_FOUND, "Not found", None),
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

// =============================================================================
// Endpoint Handlers
// =============================================================================

async fn handle_list(state: Arc<AppState>) -> Response<FullBody> {
    match state.service.get_all().await {
        Ok(records) => list_response(records),
        Err(e) => failure_response(e),
    }
}

async fn handle_get(state: Arc<AppState>, id: &str) -> Response<FullBody> {
    match state.service.get_by_id(id).await {
        Ok(record) => json_response(StatusCode::OK, &to_response(record)),
        Err(e) => failure_response(e),
    }
}

async fn handle_by_executor(state: Arc<AppState>, executor: &str) -> Response<FullBody> {
    match state.service.get_by_executor(executor).await {
        Ok(records) => list_response(records),
        Err(e) => failure_response(e),
    }
}

async fn handle_by_status(state: Arc<AppState>, status: &str) -> Response<FullBody> {
    match state.service.get_by_status(status).await {
        Ok(records) => list_response(records),
        Err(e) => failure_response(e),
    }
}

async fn handle_create(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let command: CreateDocument = match read_json(req).await {
        Ok(c) => c,
        Err(resp) => return *resp,
    };

    match state.service.create(command).await {
        Ok(record) => json_response(StatusCode::CREATED, &to_response(record)),
        Err(e) => failure_response(e),
    }
}

async fn handle_update(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<FullBody> {
    let update: UpdateDocument = match read_json(req).await {
        Ok(u) => u,
        Err(resp) => return *resp,
    };

    match state.service.update(id, update).await {
        Ok(record) => json_response(StatusCode::OK, &to_response(record)),
        Err(e) => failure_response(e),
    }
}

async fn handle_delete(state: Arc<AppState>, id: &str) -> Response<FullBody> {
    match state.service.delete(id).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &MessageResponse {
                message: "Document successfully deleted".to_string(),
            },
        ),
        Err(e) => failure_response(e),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    req: Request<Incoming>,
) -> Result<T, Box<Response<FullBody>>> {
    let body_bytes = match req.into_body().collect().await {
        Ok(b) => b.to_bytes(),
        Err(_) => {
            return Err(Box::new(error_response(
                StatusCode::BAD_REQUEST,
                "Invalid body",
                None,
            )))
        }
    };

    serde_json::from_slice(&body_bytes).map_err(|e| {
        Box::new(error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid JSON: {}", e),
            Some("INVALID_JSON"),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    #[test]
    fn test_failure_response_status_mapping() {
        let resp = failure_response(DocError::validation("executor", "too short"));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = failure_response(DocError::NotFound);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = failure_response(DocError::Store("connection reset".into()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_to_response_includes_derived_status() {
        let now = bson::DateTime::now();
        let record = DocumentRecord {
            id: Some(ObjectId::new()),
            executor: "J. Smith".to_string(),
            document: "Invoice #42".to_string(),
            date_given: now,
            date_returned: None,
            created_at: now,
            updated_at: now,
        };

        let response = to_response(record);
        assert_eq!(response.status, "active");
        assert!(response.date_returned.is_none());
        assert!(!response.id.is_empty());
    }
}
