use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::error::AppError;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{require_param, string_param, Extraction, ExtractionProvider, OpenSourceExtraction};

/// Google Document AI OCR processor. One synchronous `:process` call with the
/// document inlined as a raw document.
pub struct GcpExtraction {
    http: reqwest::Client,
    processor_url: Option<String>,
    access_token: Option<String>,
}

impl GcpExtraction {
    pub fn from_params(params: &Map<String, Value>, http: reqwest::Client) -> Self {
        Self {
            http,
            processor_url: string_param(params, "processor_url")
                .or_else(|| std::env::var("GCP_DOCUMENT_AI_PROCESSOR_URL").ok()),
            access_token: string_param(params, "access_token")
                .or_else(|| std::env::var("GCP_ACCESS_TOKEN").ok()),
        }
    }

    async fn process_document(&self, content: &[u8], extension: &str) -> Result<String, AppError> {
        let processor_url = self.processor_url.as_deref().unwrap_or_default();
        let mime_type = mime_guess::from_ext(extension)
            .first_or_octet_stream()
            .to_string();

        let response: ProcessResponse = self
            .http
            .post(format!("{}:process", processor_url.trim_end_matches('/')))
            .bearer_auth(self.access_token.as_deref().unwrap_or_default())
            .json(&json!({
                "rawDocument": {
                    "content": BASE64.encode(content),
                    "mimeType": mime_type,
                }
            }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::Extraction(format!("document ai request failed: {e}")))?
            .json()
            .await?;

        let text = response.document.map(|d| d.text).unwrap_or_default();
        debug!(mime_type, characters = text.len(), "document ai processing finished");
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    document: Option<ProcessedDocument>,
}

#[derive(Debug, Deserialize)]
struct ProcessedDocument {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl ExtractionProvider for GcpExtraction {
    fn name(&self) -> &'static str {
        "gcp"
    }

    fn validate_config(&self) -> Result<(), AppError> {
        require_param(&self.processor_url, "gcp", "processor_url")?;
        require_param(&self.access_token, "gcp", "access_token")?;
        Ok(())
    }

    async fn extract(&self, content: &[u8], extension: &str) -> Result<Extraction, AppError> {
        let mut extraction =
            match OpenSourceExtraction::extract_native(content, extension).await {
                Some(native) => native?,
                None => Extraction {
                    text: self.process_document(content, extension).await?,
                    metadata: Map::new(),
                },
            };

        extraction
            .metadata
            .insert("extraction_provider".into(), Value::String("gcp".into()));
        Ok(extraction)
    }
}
