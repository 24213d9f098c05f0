//! File API handlers
//!
//! Downloads and uploads are streamed; file content never has to fit in
//! memory as a whole.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::{StreamExt, TryStreamExt};
use tokio::io::AsyncWriteExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{error, info};

use crate::api::dto::files::{CopyResponse, DigestResponse, FileInfoResponse, UploadResponse};
use crate::api::dto::ApiResponse;
use crate::files::{hash_reader, DigestAlgorithm, FileError, FileStore};

/// File handler state
#[derive(Clone)]
pub struct FileHandlerState {
    pub store: Arc<FileStore>,
}

fn file_error<T>(err: FileError) -> (StatusCode, Json<ApiResponse<T>>) {
    let status = match &err {
        FileError::NotFound(_) => StatusCode::NOT_FOUND,
        FileError::InvalidName(_) => StatusCode::BAD_REQUEST,
        FileError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("file operation failed: {err}");
    }
    (status, Json(ApiResponse::error(err.to_string())))
}

fn unknown_algorithm<T>(name: &str) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::error(format!(
            "unknown digest algorithm: {name}"
        ))),
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/files",
    tag = "Files",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Stored files, sorted by name", body = ApiResponse<Vec<FileInfoResponse>>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_files(
    State(state): State<FileHandlerState>,
) -> Result<Json<ApiResponse<Vec<FileInfoResponse>>>, (StatusCode, Json<ApiResponse<Vec<FileInfoResponse>>>)>
{
    let files = state.store.list().await.map_err(file_error)?;
    let files = files.into_iter().map(FileInfoResponse::from).collect();
    Ok(Json(ApiResponse::success(files)))
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{file_name}/info",
    tag = "Files",
    security(("bearer_auth" = [])),
    params(
        ("file_name" = String, Path, description = "Stored file name")
    ),
    responses(
        (status = 200, description = "File metadata", body = ApiResponse<FileInfoResponse>),
        (status = 400, description = "Invalid file name"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "File not found")
    )
)]
pub async fn get_file_info(
    State(state): State<FileHandlerState>,
    Path(file_name): Path<String>,
) -> Result<Json<ApiResponse<FileInfoResponse>>, (StatusCode, Json<ApiResponse<FileInfoResponse>>)>
{
    let info = state.store.metadata(&file_name).await.map_err(file_error)?;
    Ok(Json(ApiResponse::success(info.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{file_name}/content",
    tag = "Files",
    security(("bearer_auth" = [])),
    params(
        ("file_name" = String, Path, description = "Stored file name")
    ),
    responses(
        (status = 200, description = "Raw file content", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 400, description = "Invalid file name"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "File not found")
    )
)]
pub async fn download_file(
    State(state): State<FileHandlerState>,
    Path(file_name): Path<String>,
) -> Result<Response, (StatusCode, Json<ApiResponse<()>>)> {
    let (file, info) = state.store.open(&file_name).await.map_err(file_error)?;

    let body = Body::from_stream(ReaderStream::new(file));
    let headers = [
        (
            header::CONTENT_TYPE,
            "application/octet-stream".to_string(),
        ),
        (header::CONTENT_LENGTH, info.length.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", info.name),
        ),
    ];

    Ok((headers, body).into_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{file_name}/digest/{algorithm}",
    tag = "Files",
    security(("bearer_auth" = [])),
    params(
        ("file_name" = String, Path, description = "Stored file name"),
        ("algorithm" = String, Path, description = "MD5, SHA1, SHA256, SHA384 or SHA512")
    ),
    responses(
        (status = 200, description = "Digest of the file content", body = ApiResponse<DigestResponse>),
        (status = 400, description = "Invalid file name or unknown algorithm"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "File not found")
    )
)]
pub async fn file_digest(
    State(state): State<FileHandlerState>,
    Path((file_name, algorithm)): Path<(String, String)>,
) -> Result<Json<ApiResponse<DigestResponse>>, (StatusCode, Json<ApiResponse<DigestResponse>>)> {
    let Some(algorithm) = DigestAlgorithm::parse(&algorithm) else {
        return Err(unknown_algorithm(&algorithm));
    };

    let digest = state
        .store
        .digest(&file_name, algorithm)
        .await
        .map_err(file_error)?;

    Ok(Json(ApiResponse::success(DigestResponse {
        name: Some(file_name),
        algorithm: algorithm.as_str().to_string(),
        digest,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/files/{file_name}",
    tag = "Files",
    security(("bearer_auth" = [])),
    params(
        ("file_name" = String, Path, description = "Name to store the file under")
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "File stored, existing content replaced", body = ApiResponse<UploadResponse>),
        (status = 400, description = "Invalid file name or aborted upload"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn upload_file(
    State(state): State<FileHandlerState>,
    Path(file_name): Path<String>,
    body: Body,
) -> Result<Json<ApiResponse<UploadResponse>>, (StatusCode, Json<ApiResponse<UploadResponse>>)> {
    let mut file = state.store.create(&file_name).await.map_err(file_error)?;

    let mut stream = body.into_data_stream();
    let mut length: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| {
            (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format!("upload aborted: {err}"))),
            )
        })?;
        length += chunk.len() as u64;
        file.write_all(&chunk)
            .await
            .map_err(|err| file_error(FileError::Io(err)))?;
    }
    file.flush()
        .await
        .map_err(|err| file_error(FileError::Io(err)))?;

    info!(file = %file_name, length, "file uploaded");
    Ok(Json(ApiResponse::success(UploadResponse {
        name: file_name,
        length,
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/files/{file_name}",
    tag = "Files",
    security(("bearer_auth" = [])),
    params(
        ("file_name" = String, Path, description = "Stored file name")
    ),
    responses(
        (status = 200, description = "File deleted"),
        (status = 400, description = "Invalid file name"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "File not found")
    )
)]
pub async fn delete_file(
    State(state): State<FileHandlerState>,
    Path(file_name): Path<String>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    state.store.delete(&file_name).await.map_err(file_error)?;
    info!(file = %file_name, "file deleted");
    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    post,
    path = "/api/v1/files/{file_name}/copy-to/{destination}",
    tag = "Files",
    security(("bearer_auth" = [])),
    params(
        ("file_name" = String, Path, description = "Source file name"),
        ("destination" = String, Path, description = "Destination file name, overwritten if present")
    ),
    responses(
        (status = 200, description = "File copied", body = ApiResponse<CopyResponse>),
        (status = 400, description = "Invalid file name"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Source file not found")
    )
)]
pub async fn copy_file(
    State(state): State<FileHandlerState>,
    Path((file_name, destination)): Path<(String, String)>,
) -> Result<Json<ApiResponse<CopyResponse>>, (StatusCode, Json<ApiResponse<CopyResponse>>)> {
    let length = state
        .store
        .copy(&file_name, &destination)
        .await
        .map_err(file_error)?;

    info!(source = %file_name, destination = %destination, "file copied");
    Ok(Json(ApiResponse::success(CopyResponse {
        source: file_name,
        destination,
        length,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/digests/{algorithm}",
    tag = "Digests",
    security(("bearer_auth" = [])),
    params(
        ("algorithm" = String, Path, description = "MD5, SHA1, SHA256, SHA384 or SHA512")
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Digest of the request body", body = ApiResponse<DigestResponse>),
        (status = 400, description = "Unknown algorithm"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn body_digest(
    Path(algorithm): Path<String>,
    body: Body,
) -> Result<Json<ApiResponse<DigestResponse>>, (StatusCode, Json<ApiResponse<DigestResponse>>)> {
    let Some(algorithm) = DigestAlgorithm::parse(&algorithm) else {
        return Err(unknown_algorithm(&algorithm));
    };

    let stream = body.into_data_stream().map_err(std::io::Error::other);
    let mut reader = StreamReader::new(stream);
    let digest = hash_reader(algorithm, &mut reader)
        .await
        .map_err(|err| file_error(FileError::Io(err)))?;

    Ok(Json(ApiResponse::success(DigestResponse {
        name: None,
        algorithm: algorithm.as_str().to_string(),
        digest,
    })))
}
