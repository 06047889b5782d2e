use async_trait::async_trait;
use common::error::AppError;
use serde_json::{Map, Value};
use tracing::debug;

use super::{office, Extraction, ExtractionProvider};

const PLAIN_TEXT_EXTENSIONS: &[&str] = &["txt", "md", "csv", "json", "log"];
const OFFICE_EXTENSIONS: &[&str] = &["docx", "xlsx", "xls", "pptx"];

/// Local extraction with no external service: UTF-8 passthrough for plain
/// text formats, in-process parsing for PDF and the Office formats.
#[derive(Default)]
pub struct OpenSourceExtraction;

impl OpenSourceExtraction {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn is_plain_text(extension: &str) -> bool {
        PLAIN_TEXT_EXTENSIONS.contains(&extension)
    }

    pub(crate) fn decode_plain_text(content: &[u8]) -> Result<String, AppError> {
        String::from_utf8(content.to_vec())
            .map_err(|e| AppError::Extraction(format!("file is not valid UTF-8: {e}")))
    }

    /// Formats every provider parses in-process, so remote variants only pay
    /// for a service round-trip on formats that need one (PDF, images).
    /// Returns `None` for extensions with no native parser.
    pub(crate) async fn extract_native(
        content: &[u8],
        extension: &str,
    ) -> Option<Result<Extraction, AppError>> {
        if Self::is_plain_text(extension) {
            return Some(Self::decode_plain_text(content).map(|text| Extraction {
                text,
                metadata: Map::new(),
            }));
        }
        if !OFFICE_EXTENSIONS.contains(&extension) {
            return None;
        }

        let parse: fn(&[u8]) -> Result<Extraction, AppError> = match extension {
            "docx" => office::extract_docx,
            "pptx" => office::extract_pptx,
            _ => |content| office::extract_xlsx(content, None),
        };
        let bytes = content.to_vec();
        Some(match tokio::task::spawn_blocking(move || parse(&bytes)).await {
            Ok(result) => result,
            Err(e) => Err(AppError::Join(e)),
        })
    }

    async fn extract_pdf(content: &[u8]) -> Result<String, AppError> {
        let bytes = content.to_vec();
        // pdf_extract is CPU-bound and synchronous.
        tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| AppError::Extraction(format!("failed to extract pdf text: {e}")))
        })
        .await?
    }
}

#[async_trait]
impl ExtractionProvider for OpenSourceExtraction {
    fn name(&self) -> &'static str {
        "opensource"
    }

    fn validate_config(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn extract(&self, content: &[u8], extension: &str) -> Result<Extraction, AppError> {
        let mut extraction = if let Some(native) = Self::extract_native(content, extension).await {
            native?
        } else if extension == "pdf" {
            Extraction {
                text: Self::extract_pdf(content).await?,
                metadata: Map::new(),
            }
        } else {
            return Err(AppError::Extraction(format!(
                "unsupported file extension '{extension}' for opensource extraction"
            )));
        };

        debug!(
            extension,
            characters = extraction.text.len(),
            "text extracted locally"
        );

        extraction
            .metadata
            .insert("extraction_provider".into(), Value::String("opensource".into()));
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_text_is_passed_through() {
        let provider = OpenSourceExtraction::new();
        let extraction = provider
            .extract("Hello world. This is a test.".as_bytes(), "txt")
            .await
            .expect("extraction");
        assert_eq!(extraction.text, "Hello world. This is a test.");
    }

    #[tokio::test]
    async fn invalid_utf8_is_rejected() {
        let provider = OpenSourceExtraction::new();
        let result = provider.extract(&[0xff, 0xfe, 0x00], "txt").await;
        assert!(matches!(result, Err(AppError::Extraction(_))));
    }

    #[tokio::test]
    async fn office_extensions_route_to_the_native_parsers() {
        // A corrupt container must fail in the docx parser, not fall through
        // to the unsupported-extension error.
        let provider = OpenSourceExtraction::new();
        let result = provider.extract(b"not a zip", "docx").await;
        match result {
            Err(AppError::Extraction(message)) => {
                assert!(message.contains("docx"), "unexpected message: {message}")
            }
            other => panic!("expected extraction error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let provider = OpenSourceExtraction::new();
        let result = provider.extract(b"binary", "exe").await;
        assert!(matches!(result, Err(AppError::Extraction(_))));
    }
}
