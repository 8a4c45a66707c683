use serde::{Deserialize, Serialize};
use tempfile::TempPath;

/// A completed envelope as reported by the document source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeRef {
    pub envelope_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub sent_date: String,
    #[serde(default)]
    pub last_modified: String,
}

impl EnvelopeRef {
    pub fn new(envelope_id: impl Into<String>) -> Self {
        Self {
            envelope_id: envelope_id.into(),
            status: "completed".to_string(),
            subject: String::new(),
            sent_date: String::new(),
            last_modified: String::new(),
        }
    }
}

/// One document inside an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document_id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub doc_type: String,
}

impl DocumentRef {
    pub fn new(
        document_id: impl Into<String>,
        name: impl Into<String>,
        doc_type: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            name: name.into(),
            doc_type: doc_type.into(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self.doc_type.as_str() {
            "content" | "summary" => "application/pdf",
            "zip" => "application/zip",
            _ => "application/octet-stream",
        }
    }

    /// Local file name: `content`/`summary` documents get a `.pdf` suffix and
    /// `zip` documents a `.zip` suffix unless the name already has one.
    pub fn file_name(&self) -> String {
        let base: String = self
            .name
            .trim()
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        let base = if base.is_empty() || base == "." || base == ".." {
            format!("document-{}", self.document_id)
        } else {
            base
        };

        let lower = base.to_ascii_lowercase();
        match self.doc_type.as_str() {
            "content" | "summary" if !lower.ends_with(".pdf") => format!("{base}.pdf"),
            "zip" if !lower.ends_with(".zip") => format!("{base}.zip"),
            _ => base,
        }
    }
}

/// Document bytes fetched into a scratch file. The file is removed when
/// `temp_path` is dropped unless it has been persisted.
#[derive(Debug)]
pub struct FetchedDocument {
    pub temp_path: TempPath,
    pub content_type: String,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_follows_document_type() {
        assert_eq!(DocumentRef::new("1", "Lease", "content").file_name(), "Lease.pdf");
        assert_eq!(DocumentRef::new("1", "Lease.PDF", "content").file_name(), "Lease.PDF");
        assert_eq!(DocumentRef::new("2", "bundle", "zip").file_name(), "bundle.zip");
        assert_eq!(DocumentRef::new("3", "notes.txt", "attachment").file_name(), "notes.txt");
        assert_eq!(DocumentRef::new("4", "a/../b", "content").file_name(), "a_.._b.pdf");
        assert_eq!(DocumentRef::new("5", "  ", "content").file_name(), "document-5.pdf");
    }

    #[test]
    fn content_type_follows_document_type() {
        assert_eq!(DocumentRef::new("1", "x", "summary").content_type(), "application/pdf");
        assert_eq!(DocumentRef::new("1", "x", "zip").content_type(), "application/zip");
        assert_eq!(
            DocumentRef::new("1", "x", "other").content_type(),
            "application/octet-stream"
        );
    }

    #[test]
    fn document_ref_reads_wire_type_field() {
        let doc: DocumentRef =
            serde_json::from_str(r#"{"document_id":"1","name":"Lease","type":"content"}"#)
                .unwrap();
        assert_eq!(doc.doc_type, "content");
    }
}
