//! Handlers for listing, uploading and downloading files.

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Extension, Multipart, Path};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use httpdate::fmt_http_date;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ApiError, INVALID_FILENAME};
use crate::store::{FileListing, FileStore, StoredFileMetadata};

const UPLOAD_FIELD: &str = "file";

/// Lists all stored files.
pub async fn list_files(
    Extension(store): Extension<Arc<FileStore>>,
) -> Result<JsonResponse<FileListing>, ApiError> {
    let listing = store.list().await?;
    info!(count = listing.count, "list files");
    Ok(JsonResponse(listing))
}

/// Stores the multipart `file` field under its client-supplied filename.
pub async fn upload_file(
    Extension(store): Extension<Arc<FileStore>>,
    mut multipart: Multipart,
) -> Result<JsonResponse<StoredFileMetadata>, ApiError> {
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!(field = field.name().unwrap_or(""), "skip multipart field");
            continue;
        }
        if upload.is_some() {
            return Err(ApiError::BadRequest(
                "Multiple file fields are not allowed".into(),
            ));
        }
        // Reject before buffering the body.
        let filename = field
            .file_name()
            .ok_or_else(|| ApiError::BadRequest(INVALID_FILENAME.into()))
            .and_then(|name| Ok(FileStore::validate_filename(name)?.to_string()))?;
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, data));
    }

    let (filename, data) =
        upload.ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;
    let metadata = store.store(&filename, &data).await?;
    info!(
        filename = metadata.filename,
        size = metadata.size,
        "store file"
    );
    Ok(JsonResponse(metadata))
}

/// Returns the raw content of a stored file.
pub async fn download_file(
    Path(filename): Path<String>,
    Extension(store): Extension<Arc<FileStore>>,
) -> Result<Response, ApiError> {
    let file = store.retrieve(&filename).await?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str()).map_err(|_| ApiError::Internal)?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file.content.len()));
    if let Some(modified) = file.modified
        && let Ok(value) = HeaderValue::from_str(&fmt_http_date(modified))
    {
        headers.insert(header::LAST_MODIFIED, value);
    }

    info!(filename, size = file.content.len(), "download file");
    Ok((StatusCode::OK, headers, file.content).into_response())
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(format!("Failed to read multipart body: {}", err.body_text()))
    }
}
