//! Service descriptor, health and metrics handlers.

use axum::extract::Extension;
use axum::response::Json as JsonResponse;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::store::{FileStore, StoreMetrics};

pub const SERVICE_NAME: &str = "File Storage API";

#[derive(Serialize)]
pub struct EndpointInfo {
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
pub struct ServiceInfo {
    message: String,
    version: &'static str,
    endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct HealthStatus {
    status: &'static str,
    timestamp: String,
    service: &'static str,
}

const ENDPOINTS: [(&str, &str, &str); 6] = [
    ("GET", "/", "Service description"),
    ("GET", "/health", "Health check"),
    ("GET", "/files", "List stored files"),
    ("POST", "/files", "Upload a file (multipart field `file`)"),
    ("GET", "/files/{filename}", "Download a file"),
    ("GET", "/metrics", "Storage metrics"),
];

/// Describes the service and its endpoints.
pub async fn service_info() -> JsonResponse<ServiceInfo> {
    JsonResponse(ServiceInfo {
        message: format!("Welcome to the {SERVICE_NAME}"),
        version: crate::build::PKG_VERSION,
        endpoints: ENDPOINTS
            .iter()
            .map(|&(method, path, description)| EndpointInfo {
                method,
                path,
                description,
            })
            .collect(),
    })
}

pub async fn health() -> JsonResponse<HealthStatus> {
    JsonResponse(HealthStatus {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        service: SERVICE_NAME,
    })
}

/// Current file count, cumulative store count and bytes on disk.
pub async fn metrics(
    Extension(store): Extension<Arc<FileStore>>,
) -> Result<JsonResponse<StoreMetrics>, ApiError> {
    Ok(JsonResponse(store.metrics().await?))
}
