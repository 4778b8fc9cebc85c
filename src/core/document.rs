//! Document metadata and upload payloads.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::ids::DocumentId;

/// MIME type accepted for uploads.
pub const PDF_MIME: &str = "application/pdf";

/// A document owned by the current session, as reported by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Server-issued identifier, stable for the document's lifetime.
    pub id: DocumentId,
    /// Original file name.
    pub filename: String,
    /// When the server stored the document.
    #[serde(deserialize_with = "deserialize_upload_date")]
    pub upload_date: DateTime<Utc>,
    /// Server-side storage path, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Owning user, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl Document {
    /// Build a document with only the required fields.
    #[must_use]
    pub fn new(
        id: impl Into<DocumentId>,
        filename: impl Into<String>,
        upload_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            upload_date,
            file_path: None,
            user_id: None,
        }
    }
}

/// Accept RFC 3339, naive ISO datetimes (taken as UTC) and bare dates.
fn deserialize_upload_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_upload_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized upload_date: {raw}")))
}

fn parse_upload_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A local file offered for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    /// File name sent to the server.
    pub filename: String,
    /// Declared MIME type.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Build an upload payload.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Build a payload whose MIME type is inferred from the file extension.
    #[must_use]
    pub fn from_named_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            filename,
            content_type,
            bytes,
        }
    }

    /// Whether the declared type is PDF.
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.content_type.eq_ignore_ascii_case(PDF_MIME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_server_document_shape() {
        let json = r#"{
            "id": 3,
            "filename": "report.pdf",
            "file_path": "uploads/report.pdf",
            "upload_date": "2024-03-05T10:20:30.123456",
            "user_id": 9
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.id.as_str(), "3");
        assert_eq!(doc.user_id, Some(9));
        assert_eq!(
            doc.upload_date.date_naive(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
    }

    #[test]
    fn parses_bare_dates_and_rfc3339() {
        let bare: Document = serde_json::from_str(
            r#"{"id":"d1","filename":"a.pdf","upload_date":"2024-01-01"}"#,
        )
        .unwrap();
        assert_eq!(
            bare.upload_date,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );

        let zoned = parse_upload_date("2024-01-01T02:00:00+02:00").unwrap();
        assert_eq!(zoned, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        assert!(parse_upload_date("yesterday").is_none());
    }

    #[test]
    fn infers_pdf_mime_from_extension() {
        assert!(UploadFile::from_named_bytes("Paper.PDF", vec![]).is_pdf());
        assert!(!UploadFile::from_named_bytes("notes.txt", vec![]).is_pdf());
        assert!(!UploadFile::from_named_bytes("noext", vec![]).is_pdf());
        assert_eq!(
            UploadFile::from_named_bytes("notes.txt", vec![]).content_type,
            "text/plain"
        );
        assert_eq!(
            UploadFile::from_named_bytes("noext", vec![]).content_type,
            "application/octet-stream"
        );
    }
}
