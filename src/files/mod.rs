//! Uploaded-file management for the dashboard's agents.
//!
//! An organization feeds an agent by uploading files in batches. The
//! dashboard posts a batch as `multipart/form-data`, lists the files an
//! organization uploaded for one agent, deletes a file, and downloads one
//! again. Storage sits behind [`FileStore`]; the gateway ships
//! [`MemoryFileStore`], seeded with sample records.
//!
//! Like the search gateway, each operation shapes its outcome into a
//! [`JsonReply`] and leaves headers to the HTTP layer.

pub mod form;
pub mod memory;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub use form::{FilePart, UploadForm};
pub use memory::MemoryFileStore;

use crate::reply::JsonReply;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Ingestion state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Processing,
    Completed,
    Failed,
}

/// One uploaded file as listed to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub filename: String,
    /// RFC 3339 timestamp.
    pub upload_date: String,
    pub uploaded_by: String,
    pub organization_id: String,
    pub organization_name: String,
    pub agent: String,
    pub status: FileStatus,
    pub file_size: u64,
    pub file_type: String,
}

/// A complete upload, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBatch {
    pub organization_id: String,
    pub organization_name: String,
    pub agent: String,
    pub data_source_option: Option<String>,
    pub uploaded_by: String,
    pub files: Vec<FilePart>,
}

/// File content handed back for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDownload {
    pub filename: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Where uploaded files live.
pub trait FileStore: Send + Sync {
    /// Store every file in `batch`, returning the new records in order.
    fn store(&self, batch: UploadBatch) -> Result<Vec<UploadedFile>>;

    /// Files `organization_id` uploaded for `agent`, oldest first.
    fn list(&self, organization_id: &str, agent: &str) -> Result<Vec<UploadedFile>>;

    /// Remove a file; `false` when no file has that id.
    fn delete(&self, id: &str) -> Result<bool>;

    /// A file's content, or `None` when no file has that id.
    fn download(&self, id: &str) -> Result<Option<FileDownload>>;
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// 401 for file requests that carry no bearer token.
pub fn missing_token() -> JsonReply {
    JsonReply::error(401, "No authorization token")
}

/// Handle an upload body end to end.
///
/// 400 when the body is not a readable multipart form or lacks the
/// organization, the agent, or anything to ingest (files or Google Drive
/// credentials). `{message, uploadedFiles}` on success.
pub fn upload_batch(
    store: &dyn FileStore,
    uploaded_by: &str,
    content_type: Option<&str>,
    body: &[u8],
) -> JsonReply {
    let form = match UploadForm::parse(content_type, body) {
        Ok(form) => form,
        Err(error) => {
            tracing::warn!(error = %format!("{error:#}"), "unreadable upload body");
            return JsonReply::error(400, format!("{error:#}"));
        }
    };

    let Some(batch) = form.into_batch(uploaded_by) else {
        return JsonReply::error(400, "Missing required fields for upload.");
    };

    let organization_id = batch.organization_id.clone();
    let agent = batch.agent.clone();
    let source = batch.data_source_option.clone().unwrap_or_default();

    match store.store(batch) {
        Ok(files) => {
            tracing::info!(
                organization_id = %organization_id,
                agent = %agent,
                source = %source,
                count = files.len(),
                "files uploaded"
            );
            JsonReply::ok(json!({
                "message": "Files uploaded and processed successfully.",
                "uploadedFiles": files,
            }))
        }
        Err(error) => {
            tracing::error!(organization_id = %organization_id, error = %format!("{error:#}"), "upload failed");
            JsonReply::error(500, format!("{error:#}"))
        }
    }
}

/// List the files for the `organizationId` and `agent` query parameters.
pub fn list_files(store: &dyn FileStore, query: &str) -> JsonReply {
    let params = crate::query::parse(query);
    let param = |name: &str| params.get(name).map(String::as_str).filter(|v| !v.is_empty());

    let (Some(organization_id), Some(agent)) = (param("organizationId"), param("agent")) else {
        return JsonReply::error(400, "Missing organizationId or agent query parameters.");
    };

    match store.list(organization_id, agent) {
        Ok(files) => JsonReply::ok(json!(files)),
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "listing files failed");
            JsonReply::error(500, format!("{error:#}"))
        }
    }
}

/// Delete one file. 404 when the id is unknown.
pub fn delete_file(store: &dyn FileStore, id: &str) -> JsonReply {
    match store.delete(id) {
        Ok(true) => {
            tracing::info!(file_id = %id, "file deleted");
            JsonReply::ok(json!({ "message": format!("File {id} deleted successfully.") }))
        }
        Ok(false) => JsonReply::error(404, format!("File {id} not found")),
        Err(error) => {
            tracing::error!(file_id = %id, error = %format!("{error:#}"), "delete failed");
            JsonReply::error(500, format!("{error:#}"))
        }
    }
}

/// Fetch one file for download, or the JSON error to send instead.
pub fn download_file(store: &dyn FileStore, id: &str) -> Result<FileDownload, JsonReply> {
    match store.download(id) {
        Ok(Some(download)) => Ok(download),
        Ok(None) => Err(JsonReply::error(404, format!("File {id} not found"))),
        Err(error) => {
            tracing::error!(file_id = %id, error = %format!("{error:#}"), "download failed");
            Err(JsonReply::error(500, format!("{error:#}")))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
