//! HTTP helpers: CORS, security headers and the JSON fallback.

use axum::body::Body as AxumBody;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::{middleware, response::Response};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::error::ApiError;

/// Builds a CORS layer from a comma separated origin list.
pub fn build_cors_layer(cors_origins: Option<&str>) -> Option<CorsLayer> {
    let origins = cors_origins?
        .split(',')
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "invalid cors origin");
                None
            }
        })
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

pub async fn add_security_headers(
    request: Request<AxumBody>,
    next: middleware::Next,
) -> Result<Response, StatusCode> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        axum::http::header::X_FRAME_OPTIONS,
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        axum::http::header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    Ok(response)
}

/// Unmatched routes, including raw `..` segments under `/files/`.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".into())
}
