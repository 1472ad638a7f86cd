//! Router assembly.

use axum::extract::{DefaultBodyLimit, Extension, connect_info::ConnectInfo};
use axum::http::Request;
use axum::routing::get;
use axum::{Router, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info_span};

use crate::store::FileStore;
use crate::{files, http, service};

/// Builds the application router around a shared store.
///
/// `max_upload_size` of zero removes the request body limit on uploads.
pub fn build_router(store: Arc<FileStore>, max_upload_size: usize) -> Router {
    let body_limit = if max_upload_size == 0 {
        DefaultBodyLimit::disable()
    } else {
        DefaultBodyLimit::max(max_upload_size)
    };

    Router::new()
        .route("/", get(service::service_info))
        .route("/health", get(service::health))
        .route("/metrics", get(service::metrics))
        .route(
            "/files",
            get(files::list_files)
                .post(files::upload_file)
                .layer(body_limit),
        )
        .route("/files/{filename}", get(files::download_file))
        .fallback(http::not_found)
        .layer(middleware::from_fn(http::add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let forwarded_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .map(|s| s.split(',').next().unwrap_or("").trim().to_string());
                    let connect_ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.to_string());
                    let client_ip = forwarded_ip
                        .or(connect_ip)
                        .unwrap_or_else(|| "unknown".to_string());

                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(Extension(store))
}
