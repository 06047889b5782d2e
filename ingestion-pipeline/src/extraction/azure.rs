use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::error::AppError;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{require_param, string_param, Extraction, ExtractionProvider, OpenSourceExtraction};

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_POLLS: usize = 60;

/// Azure Document Intelligence (prebuilt-read). Submits the document for
/// analysis and polls the returned operation until it succeeds.
pub struct AzureExtraction {
    http: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl AzureExtraction {
    pub fn from_params(params: &Map<String, Value>, http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: string_param(params, "endpoint")
                .or_else(|| std::env::var("AZURE_DOC_INTELLIGENCE_ENDPOINT").ok()),
            api_key: string_param(params, "api_key")
                .or_else(|| std::env::var("AZURE_DOC_INTELLIGENCE_KEY").ok()),
        }
    }

    async fn analyze(&self, content: &[u8]) -> Result<String, AppError> {
        let endpoint = self.endpoint.as_deref().unwrap_or_default();
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let url = format!(
            "{}/documentintelligence/documentModels/prebuilt-read:analyze?api-version=2024-02-29-preview",
            endpoint.trim_end_matches('/')
        );

        let response = self
            .http
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", api_key)
            .json(&json!({ "base64Source": BASE64.encode(content) }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::Extraction(format!("azure analyze request failed: {e}")))?;

        let operation_url = response
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::Extraction("azure response missing operation-location header".into())
            })?;

        self.poll_operation(&operation_url, api_key).await
    }

    async fn poll_operation(&self, operation_url: &str, api_key: &str) -> Result<String, AppError> {
        for attempt in 0..MAX_POLLS {
            tokio::time::sleep(POLL_INTERVAL).await;

            let result: AnalyzeOperation = self
                .http
                .get(operation_url)
                .header("Ocp-Apim-Subscription-Key", api_key)
                .send()
                .await?
                .error_for_status()
                .map_err(|e| AppError::Extraction(format!("azure poll request failed: {e}")))?
                .json()
                .await?;

            match result.status.as_str() {
                "succeeded" => {
                    let content = result
                        .analyze_result
                        .map(|r| r.content)
                        .unwrap_or_default();
                    debug!(attempt, "azure document analysis finished");
                    return Ok(content);
                }
                "failed" => {
                    return Err(AppError::Extraction(
                        "azure document analysis reported failure".into(),
                    ))
                }
                _ => continue,
            }
        }
        Err(AppError::Extraction(
            "azure document analysis did not finish in time".into(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeOperation {
    status: String,
    #[serde(rename = "analyzeResult")]
    analyze_result: Option<AnalyzeResult>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl ExtractionProvider for AzureExtraction {
    fn name(&self) -> &'static str {
        "azure"
    }

    fn validate_config(&self) -> Result<(), AppError> {
        require_param(&self.endpoint, "azure", "endpoint")?;
        require_param(&self.api_key, "azure", "api_key")?;
        Ok(())
    }

    async fn extract(&self, content: &[u8], extension: &str) -> Result<Extraction, AppError> {
        // Plain text and Office formats never need a round-trip to the service.
        let mut extraction =
            match OpenSourceExtraction::extract_native(content, extension).await {
                Some(native) => native?,
                None => Extraction {
                    text: self.analyze(content).await?,
                    metadata: Map::new(),
                },
            };

        extraction
            .metadata
            .insert("extraction_provider".into(), Value::String("azure".into()));
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_requires_endpoint_and_key() {
        let mut params = Map::new();
        params.insert("endpoint".into(), json!("https://example.cognitiveservices.azure.com"));
        let provider = AzureExtraction::from_params(&params, reqwest::Client::new());
        assert!(provider.validate_config().is_err());

        params.insert("api_key".into(), json!("secret"));
        let provider = AzureExtraction::from_params(&params, reqwest::Client::new());
        assert!(provider.validate_config().is_ok());
    }

    #[tokio::test]
    async fn plain_text_skips_the_remote_service() {
        let mut params = Map::new();
        params.insert("endpoint".into(), json!("https://unreachable.invalid"));
        params.insert("api_key".into(), json!("secret"));
        let provider = AzureExtraction::from_params(&params, reqwest::Client::new());

        let extraction = provider
            .extract(b"local text", "txt")
            .await
            .expect("local extraction");
        assert_eq!(extraction.text, "local text");
    }
}
