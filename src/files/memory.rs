//! In-process [`FileStore`].
//!
//! Content lives in memory for the life of the gateway. The sample records
//! have no content of their own and download as a short text placeholder.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use chrono::SecondsFormat;

use super::{FileDownload, FileStatus, FileStore, UploadBatch, UploadedFile};

struct StoredFile {
    record: UploadedFile,
    content: Option<Vec<u8>>,
}

#[derive(Default)]
pub struct MemoryFileStore {
    files: Mutex<Vec<StoredFile>>,
}

impl MemoryFileStore {
    /// A store holding the three sample uploads the dashboard demos with.
    pub fn with_samples() -> Self {
        let files = sample_records()
            .into_iter()
            .map(|record| StoredFile {
                record,
                content: None,
            })
            .collect();
        Self {
            files: Mutex::new(files),
        }
    }

    fn files(&self) -> Result<MutexGuard<'_, Vec<StoredFile>>> {
        self.files
            .lock()
            .map_err(|_| anyhow!("file store lock poisoned"))
    }
}

impl FileStore for MemoryFileStore {
    fn store(&self, batch: UploadBatch) -> Result<Vec<UploadedFile>> {
        let uploaded_at = chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let stored: Vec<StoredFile> = batch
            .files
            .into_iter()
            .map(|part| StoredFile {
                record: UploadedFile {
                    id: new_file_id(),
                    filename: part.filename,
                    upload_date: uploaded_at.clone(),
                    uploaded_by: batch.uploaded_by.clone(),
                    organization_id: batch.organization_id.clone(),
                    organization_name: batch.organization_name.clone(),
                    agent: batch.agent.clone(),
                    status: FileStatus::Completed,
                    file_size: part.data.len() as u64,
                    file_type: part.content_type,
                },
                content: Some(part.data),
            })
            .collect();

        let records = stored.iter().map(|file| file.record.clone()).collect();
        self.files()?.extend(stored);
        Ok(records)
    }

    fn list(&self, organization_id: &str, agent: &str) -> Result<Vec<UploadedFile>> {
        Ok(self
            .files()?
            .iter()
            .filter(|file| {
                file.record.organization_id == organization_id && file.record.agent == agent
            })
            .map(|file| file.record.clone())
            .collect())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut files = self.files()?;
        let before = files.len();
        files.retain(|file| file.record.id != id);
        Ok(files.len() != before)
    }

    fn download(&self, id: &str) -> Result<Option<FileDownload>> {
        let files = self.files()?;
        let Some(file) = files.iter().find(|file| file.record.id == id) else {
            return Ok(None);
        };

        Ok(Some(match &file.content {
            Some(content) => FileDownload {
                filename: file.record.filename.clone(),
                content_type: file.record.file_type.clone(),
                body: content.clone(),
            },
            None => FileDownload {
                filename: format!("downloaded_file_{id}.txt"),
                content_type: "text/plain; charset=utf-8".to_string(),
                body: format!(
                    "This is a dummy file for {id}. Your actual file content would be here."
                )
                .into_bytes(),
            },
        }))
    }
}

fn new_file_id() -> String {
    format!("file-{}", uuid::Uuid::new_v4().simple())
}

fn sample_records() -> Vec<UploadedFile> {
    let sample = |id: &str,
                  filename: &str,
                  upload_date: &str,
                  uploaded_by: &str,
                  organization: (&str, &str),
                  agent: &str,
                  status: FileStatus,
                  file_size: u64,
                  file_type: &str| UploadedFile {
        id: id.to_string(),
        filename: filename.to_string(),
        upload_date: upload_date.to_string(),
        uploaded_by: uploaded_by.to_string(),
        organization_id: organization.0.to_string(),
        organization_name: organization.1.to_string(),
        agent: agent.to_string(),
        status,
        file_size,
        file_type: file_type.to_string(),
    };

    vec![
        sample(
            "file-1",
            "sales_q1_2023.csv",
            "2023-01-15T10:00:00Z",
            "user1",
            ("org-1", "Acme Corp"),
            "business-vitality-agent",
            FileStatus::Completed,
            12345,
            "text/csv",
        ),
        sample(
            "file-2",
            "customer_feedback.json",
            "2023-02-20T11:30:00Z",
            "user2",
            ("org-1", "Acme Corp"),
            "customer-analyzer-agent",
            FileStatus::Completed,
            54321,
            "application/json",
        ),
        sample(
            "file-3",
            "mission_report.xlsx",
            "2023-03-10T14:00:00Z",
            "user1",
            ("org-2", "Globex Inc"),
            "mission-alignment-agent",
            FileStatus::Processing,
            98765,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
    ]
}
