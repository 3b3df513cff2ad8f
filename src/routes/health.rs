//! Health and version endpoints
//!
//! Liveness returns 200 whenever the process is running; MongoDB
//! reachability is deliberately not part of the probe.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub node_id: String,
    pub timestamp: String,
}

#[derive(Serialize)]
struct VersionResponse {
    version: &'static str,
    commit: &'static str,
    commit_full: &'static str,
    build_time: &'static str,
    service: &'static str,
}

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
    health: &'static str,
    version: &'static str,
}

fn json(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Handle liveness probe (/health, /healthz)
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = HealthResponse {
        status: "healthy",
        service: "docledger",
        version: env!("CARGO_PKG_VERSION"),
        node_id: state.args.node_id.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"status":"healthy"}"#.to_string());

    json(StatusCode::OK, body)
}

/// Version info for deployment verification
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "docledger",
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"version":"unknown","commit":"unknown"}"#.to_string());

    json(StatusCode::OK, body)
}

/// Root endpoint with service pointers
pub fn root_info() -> Response<Full<Bytes>> {
    let response = RootResponse {
        message: "docledger - document tracking API",
        health: "/health",
        version: "/version",
    };

    let body = serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string());
    json(StatusCode::OK, body)
}
