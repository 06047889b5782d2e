use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::error::AppError;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{require_param, string_param, Extraction, ExtractionProvider, OpenSourceExtraction};

/// AWS Textract synchronous text detection. The request is authorized with a
/// pre-issued token; credential exchange and signing happen outside the
/// pipeline.
pub struct AwsExtraction {
    http: reqwest::Client,
    region: Option<String>,
    auth_token: Option<String>,
}

impl AwsExtraction {
    pub fn from_params(params: &Map<String, Value>, http: reqwest::Client) -> Self {
        Self {
            http,
            region: string_param(params, "region").or_else(|| std::env::var("AWS_REGION").ok()),
            auth_token: string_param(params, "auth_token")
                .or_else(|| std::env::var("AWS_TEXTRACT_AUTH_TOKEN").ok()),
        }
    }

    async fn detect_document_text(&self, content: &[u8]) -> Result<String, AppError> {
        let region = self.region.as_deref().unwrap_or_default();
        let url = format!("https://textract.{region}.amazonaws.com/");

        let response: DetectDocumentTextResponse = self
            .http
            .post(&url)
            .header("X-Amz-Target", "Textract.DetectDocumentText")
            .header("Content-Type", "application/x-amz-json-1.1")
            .bearer_auth(self.auth_token.as_deref().unwrap_or_default())
            .json(&json!({
                "Document": { "Bytes": BASE64.encode(content) }
            }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::Extraction(format!("textract request failed: {e}")))?
            .json()
            .await?;

        // LINE blocks in reading order; WORD blocks duplicate their content.
        let lines: Vec<&str> = response
            .blocks
            .iter()
            .filter(|block| block.block_type == "LINE")
            .filter_map(|block| block.text.as_deref())
            .collect();

        debug!(lines = lines.len(), "textract detection finished");
        Ok(lines.join("\n"))
    }
}

#[derive(Debug, Deserialize)]
struct DetectDocumentTextResponse {
    #[serde(rename = "Blocks", default)]
    blocks: Vec<TextractBlock>,
}

#[derive(Debug, Deserialize)]
struct TextractBlock {
    #[serde(rename = "BlockType")]
    block_type: String,
    #[serde(rename = "Text")]
    text: Option<String>,
}

#[async_trait]
impl ExtractionProvider for AwsExtraction {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn validate_config(&self) -> Result<(), AppError> {
        require_param(&self.region, "aws", "region")?;
        require_param(&self.auth_token, "aws", "auth_token")?;
        Ok(())
    }

    async fn extract(&self, content: &[u8], extension: &str) -> Result<Extraction, AppError> {
        let mut extraction =
            match OpenSourceExtraction::extract_native(content, extension).await {
                Some(native) => native?,
                None => Extraction {
                    text: self.detect_document_text(content).await?,
                    metadata: Map::new(),
                },
            };

        extraction
            .metadata
            .insert("extraction_provider".into(), Value::String("aws".into()));
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_requires_region_and_token() {
        let mut params = Map::new();
        params.insert("region".into(), json!("eu-west-1"));
        let provider = AwsExtraction::from_params(&params, reqwest::Client::new());
        assert!(provider.validate_config().is_err());

        params.insert("auth_token".into(), json!("token"));
        let provider = AwsExtraction::from_params(&params, reqwest::Client::new());
        assert!(provider.validate_config().is_ok());
    }

    #[test]
    fn line_blocks_are_joined_in_order() {
        let response: DetectDocumentTextResponse = serde_json::from_value(json!({
            "Blocks": [
                { "BlockType": "PAGE", "Text": null },
                { "BlockType": "LINE", "Text": "First line" },
                { "BlockType": "WORD", "Text": "First" },
                { "BlockType": "LINE", "Text": "Second line" }
            ]
        }))
        .expect("response parses");

        let lines: Vec<&str> = response
            .blocks
            .iter()
            .filter(|b| b.block_type == "LINE")
            .filter_map(|b| b.text.as_deref())
            .collect();
        assert_eq!(lines, vec!["First line", "Second line"]);
    }
}
