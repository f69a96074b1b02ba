//! `multipart/form-data` upload bodies.

use std::io::Read;

use anyhow::{Context, Result, bail};
use multipart::server::Multipart;

use super::UploadBatch;

const OCTET_STREAM: &str = "application/octet-stream";

/// One file part of an upload form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// The fields the dashboard sends with an upload. Unknown fields are
/// ignored and empty text fields count as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    pub agent: Option<String>,
    pub organization_id: Option<String>,
    pub organization_name: Option<String>,
    pub data_source_option: Option<String>,
    pub google_drive_credentials: Option<String>,
    pub files: Vec<FilePart>,
}

impl UploadForm {
    /// Read a multipart body. Any part that carries a filename is a file.
    pub fn parse(content_type: Option<&str>, body: &[u8]) -> Result<Self> {
        let content_type = content_type.context("upload has no Content-Type")?;
        let mime: mime::Mime = content_type
            .parse()
            .context("upload has an invalid Content-Type")?;
        if mime.type_() != mime::MULTIPART || mime.subtype() != mime::FORM_DATA {
            bail!("expected multipart/form-data, got {}", mime.essence_str());
        }
        let boundary = mime
            .get_param(mime::BOUNDARY)
            .context("multipart Content-Type has no boundary")?;

        let mut multipart = Multipart::with_body(body, boundary.as_str());
        let mut form = Self::default();

        while let Some(mut field) = multipart.read_entry().context("malformed multipart body")? {
            let mut data = Vec::new();
            field
                .data
                .read_to_end(&mut data)
                .with_context(|| format!("failed reading form field '{}'", field.headers.name))?;

            if let Some(filename) = field.headers.filename.clone() {
                let content_type = field
                    .headers
                    .content_type
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| OCTET_STREAM.to_string());
                form.files.push(FilePart {
                    filename,
                    content_type,
                    data,
                });
                continue;
            }

            let slot = match &*field.headers.name {
                "agent" => &mut form.agent,
                "organizationId" => &mut form.organization_id,
                "organizationName" => &mut form.organization_name,
                "dataSourceOption" => &mut form.data_source_option,
                "googleDriveCredentials" => &mut form.google_drive_credentials,
                _ => continue,
            };
            let value = String::from_utf8_lossy(&data).into_owned();
            *slot = Some(value).filter(|v| !v.trim().is_empty());
        }

        Ok(form)
    }

    /// The storable batch, or `None` when the organization, the agent, or
    /// anything to ingest (files or Drive credentials) is missing.
    pub fn into_batch(self, uploaded_by: &str) -> Option<UploadBatch> {
        let organization_id = self.organization_id?;
        let agent = self.agent?;
        if self.files.is_empty() && self.google_drive_credentials.is_none() {
            return None;
        }

        Some(UploadBatch {
            organization_name: self.organization_name.unwrap_or_default(),
            organization_id,
            agent,
            data_source_option: self.data_source_option,
            uploaded_by: uploaded_by.to_string(),
            files: self.files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT_TYPE: &str = "multipart/form-data; boundary=XyZ";

    fn body(parts: &[&str]) -> Vec<u8> {
        let mut out = String::new();
        for part in parts {
            out.push_str("--XyZ\r\n");
            out.push_str(part);
            out.push_str("\r\n");
        }
        out.push_str("--XyZ--\r\n");
        out.into_bytes()
    }

    #[test]
    fn reads_text_fields_and_files() {
        let body = body(&[
            "Content-Disposition: form-data; name=\"agent\"\r\n\r\ncustomer-analyzer-agent",
            "Content-Disposition: form-data; name=\"organizationId\"\r\n\r\norg-1",
            "Content-Disposition: form-data; name=\"unknown\"\r\n\r\nignored",
            "Content-Disposition: form-data; name=\"files\"; filename=\"feedback.json\"\r\nContent-Type: application/json\r\n\r\n{\"ok\":true}",
        ]);
        let form = UploadForm::parse(Some(CONTENT_TYPE), &body).unwrap();
        assert_eq!(form.agent.as_deref(), Some("customer-analyzer-agent"));
        assert_eq!(form.organization_id.as_deref(), Some("org-1"));
        assert_eq!(form.organization_name, None);
        assert_eq!(form.files.len(), 1);
        assert_eq!(form.files[0].filename, "feedback.json");
        assert_eq!(form.files[0].content_type, "application/json");
        assert_eq!(form.files[0].data, br#"{"ok":true}"#);
    }

    #[test]
    fn file_without_content_type_is_octet_stream() {
        let body = body(&[
            "Content-Disposition: form-data; name=\"files\"; filename=\"blob.bin\"\r\n\r\n\x01\x02",
        ]);
        let form = UploadForm::parse(Some(CONTENT_TYPE), &body).unwrap();
        assert_eq!(form.files[0].content_type, OCTET_STREAM);
    }

    #[test]
    fn blank_fields_count_as_missing() {
        let body = body(&["Content-Disposition: form-data; name=\"agent\"\r\n\r\n  "]);
        let form = UploadForm::parse(Some(CONTENT_TYPE), &body).unwrap();
        assert_eq!(form.agent, None);
    }

    #[test]
    fn rejects_missing_boundary_and_wrong_type() {
        assert!(UploadForm::parse(None, b"").is_err());
        assert!(UploadForm::parse(Some("multipart/form-data"), b"").is_err());
        assert!(UploadForm::parse(Some("text/plain"), b"").is_err());
    }

    #[test]
    fn into_batch_requires_organization_and_agent() {
        let file = FilePart {
            filename: "a.csv".to_string(),
            content_type: "text/csv".to_string(),
            data: b"x".to_vec(),
        };
        let form = UploadForm {
            organization_id: Some("org-1".to_string()),
            files: vec![file.clone()],
            ..Default::default()
        };
        assert_eq!(form.into_batch("u"), None);

        let form = UploadForm {
            organization_id: Some("org-1".to_string()),
            agent: Some("a".to_string()),
            files: vec![file],
            ..Default::default()
        };
        let batch = form.into_batch("u").unwrap();
        assert_eq!(batch.organization_name, "");
        assert_eq!(batch.uploaded_by, "u");
        assert_eq!(batch.files.len(), 1);
    }
}
