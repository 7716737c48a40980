//! File handlers.

use axum::{
    body::Body,
    extract::{
        multipart::{Field, MultipartError},
        Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::Response,
    Form, Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::file::{sanitize, FileListing, FileStorage, StagedObject, UploadCandidate};
use crate::web::dto::{
    ApiResponse, DeleteResponse, ExpiryForm, ExpiryResponse, ListFilesQuery, UploadResponse,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Multipart field carrying files.
const FILES_FIELD: &str = "files";

/// Multipart field carrying the expiry choice.
const EXPIRY_FIELD: &str = "expiry";

/// Build a Content-Disposition value for a download.
///
/// Plain ASCII names are sent as-is. Anything else gets a sanitized ASCII
/// fallback plus an RFC 5987 `filename*` with the full UTF-8 name, so
/// control characters never reach the header.
pub fn content_disposition_header(filename: &str) -> String {
    let plain = filename
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\');

    if plain && !filename.is_empty() {
        return format!("attachment; filename=\"{filename}\"");
    }

    let fallback = sanitize(filename);
    let encoded = urlencoding::encode(filename);

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

/// GET /api/files - List files, newest first.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<ApiResponse<FileListing>>, ApiError> {
    let listing = state
        .file_service()
        .list_files(query.cat.as_deref())
        .await?;

    Ok(Json(ApiResponse::new(listing)))
}

/// Map a multipart read failure, keeping the request limit as 413.
fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!("Upload body exceeds server limit");
        ApiError::payload_too_large("request size exceeds server limit")
    } else {
        tracing::warn!("Failed to read multipart data: {}", e);
        ApiError::bad_request("Invalid multipart data")
    }
}

/// Stream one file part into a staging object.
async fn stage_field(
    storage: &FileStorage,
    field: &mut Field<'_>,
) -> Result<StagedObject, ApiError> {
    let mut staging = storage.begin_staging().await?;

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                storage.abort_staging(staging).await;
                return Err(multipart_error(e));
            }
        };
        if let Err(e) = staging.write_chunk(&chunk).await {
            storage.abort_staging(staging).await;
            return Err(e.into());
        }
    }

    Ok(storage.finish_staging(staging).await?)
}

/// Read the multipart body, staging every file part.
async fn read_upload(
    storage: &FileStorage,
    multipart: &mut Multipart,
    candidates: &mut Vec<UploadCandidate>,
) -> Result<Option<String>, ApiError> {
    let mut expiry = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            FILES_FIELD => {
                let filename = field.file_name().map(|s| s.to_string());
                let staged = stage_field(storage, &mut field).await?;

                // Browsers send an empty, unnamed part when nothing was picked
                if filename.as_deref().unwrap_or("").is_empty() && staged.size() == 0 {
                    storage.discard(&staged).await;
                    continue;
                }

                candidates.push(UploadCandidate::new(filename, staged));
            }
            EXPIRY_FIELD => {
                expiry = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    Ok(expiry)
}

/// POST /upload - Upload a batch of files.
///
/// Repeated `files` parts carry the files; an optional `expiry` part picks
/// how long they are kept. File parts are streamed to disk as they arrive.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let mut candidates = Vec::new();

    let expiry = match read_upload(&state.storage, &mut multipart, &mut candidates).await {
        Ok(expiry) => expiry,
        Err(e) => {
            for candidate in &candidates {
                state.storage.discard(&candidate.staged).await;
            }
            return Err(e);
        }
    };

    let outcome = state
        .file_service()
        .upload_batch(candidates, expiry.as_deref())
        .await?;

    Ok(Json(ApiResponse::new(outcome.into())))
}

/// GET /download/:id - Stream a file as an attachment.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
) -> Result<Response<Body>, ApiError> {
    let download = state.file_service().download(file_id).await?;

    let stream = ReaderStream::new(download.file);

    let response = Response::builder()
        .header(header::CONTENT_TYPE, &download.record.mime)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&download.record.orig_name),
        )
        .header(header::CONTENT_LENGTH, download.size)
        .body(Body::from_stream(stream))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })?;

    Ok(response)
}

/// POST /files/:id/expiry - Change how long a file is kept.
pub async fn set_file_expiry(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
    Form(form): Form<ExpiryForm>,
) -> Result<Json<ApiResponse<ExpiryResponse>>, ApiError> {
    let record = state
        .file_service()
        .set_expiry(file_id, form.expiry.as_deref())
        .await?;

    Ok(Json(ApiResponse::new(record.into())))
}

/// POST /files/:id/delete - Delete a file.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    state.file_service().delete(file_id).await?;

    Ok(Json(ApiResponse::new(DeleteResponse { deleted: true })))
}
