use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::AppError;

/// The unit of data flowing through the pipeline: one document, attachment,
/// or row. Connectors create it; each downstream stage takes ownership,
/// mutates it, and hands it on (single writer at any time).
///
/// Canonical fields are typed; everything source-specific lands in `fields`
/// untouched and stays available to the indexing stage's field mapping.
#[derive(Debug, Clone, Default)]
pub struct Record {
    pub file_name: Option<String>,
    pub file_bytes: Option<Bytes>,
    pub text: Option<String>,
    pub metadata: Map<String, Value>,
    pub chunks: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            file_bytes: Some(bytes.into()),
            ..Self::default()
        }
    }

    pub fn from_text(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// A stable label for logging; falls back to "<unnamed>" for records
    /// whose connector supplied no identifier.
    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("<unnamed>")
    }

    /// The lowercase extension of `file_name`, when present.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .as_deref()?
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// Resolves a dotted path against the record: canonical fields first
    /// (`file_name`, `text`), then passthrough `fields` with nested-object
    /// traversal (`author.name`).
    pub fn lookup_path(&self, path: &str) -> Option<Value> {
        match path {
            "file_name" | "blob_file_name" => {
                return self.file_name.as_deref().map(|v| Value::String(v.into()))
            }
            "text" => return self.text.as_deref().map(|v| Value::String(v.into())),
            _ => {}
        }

        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.fields.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }

    /// Verifies the chunk/embedding alignment invariant: once both are
    /// populated, `embeddings[i]` must be the vector for `chunks[i]`.
    pub fn ensure_aligned(&self) -> Result<(), AppError> {
        if self.chunks.len() != self.embeddings.len() {
            return Err(AppError::Processing(format!(
                "record '{}' has {} chunks but {} embeddings",
                self.display_name(),
                self.chunks.len(),
                self.embeddings.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_resolves_canonical_and_passthrough_fields() {
        let record = Record::from_text("report.txt", "body")
            .with_field("sys_id", json!("abc-1"))
            .with_field("author", json!({"name": "Ada", "org": {"id": 7}}));

        assert_eq!(record.lookup_path("file_name"), Some(json!("report.txt")));
        assert_eq!(record.lookup_path("blob_file_name"), Some(json!("report.txt")));
        assert_eq!(record.lookup_path("sys_id"), Some(json!("abc-1")));
        assert_eq!(record.lookup_path("author.name"), Some(json!("Ada")));
        assert_eq!(record.lookup_path("author.org.id"), Some(json!(7)));
        assert_eq!(record.lookup_path("author.missing"), None);
        assert_eq!(record.lookup_path("nope"), None);
    }

    #[test]
    fn extension_is_lowercased() {
        let record = Record::from_bytes("Quarterly.PDF", Vec::from(*b"%PDF"));
        assert_eq!(record.extension().as_deref(), Some("pdf"));
        assert_eq!(Record::from_text("noext", "x").extension(), None);
    }

    #[test]
    fn misaligned_chunks_and_embeddings_are_rejected() {
        let mut record = Record::from_text("a.txt", "text");
        record.chunks = vec!["one".into(), "two".into()];
        record.embeddings = vec![vec![0.1]];
        assert!(record.ensure_aligned().is_err());

        record.embeddings.push(vec![0.2]);
        assert!(record.ensure_aligned().is_ok());
    }
}
