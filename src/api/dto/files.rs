//! File API DTOs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::files::StoredFileInfo;

#[derive(Debug, Serialize, ToSchema)]
pub struct FileInfoResponse {
    pub name: String,
    /// Size in bytes
    pub length: u64,
    /// Extension without the leading dot, empty when the name has none
    pub extension: String,
    pub modified: Option<DateTime<Utc>>,
}

impl From<StoredFileInfo> for FileInfoResponse {
    fn from(info: StoredFileInfo) -> Self {
        Self {
            name: info.name,
            length: info.length,
            extension: info.extension,
            modified: info.modified,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub name: String,
    /// Number of bytes written
    pub length: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CopyResponse {
    pub source: String,
    pub destination: String,
    /// Number of bytes copied
    pub length: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DigestResponse {
    /// Stored file the digest was computed over, absent for request-body
    /// digests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub algorithm: String,
    /// Uppercase hex digest
    pub digest: String,
}
