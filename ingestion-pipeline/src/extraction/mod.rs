//! Text-extraction providers: `(file bytes, extension)` in, plain text and
//! provider metadata out. All variants must return semantically equivalent
//! text for the same input; that equivalence is what keeps the chunking and
//! embedding stages provider-agnostic.

mod aws;
mod azure;
mod gcp;
pub(crate) mod office;
mod opensource;

pub use aws::AwsExtraction;
pub use azure::AzureExtraction;
pub use gcp::GcpExtraction;
pub use opensource::OpenSourceExtraction;

use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use common::error::AppError;
use serde_json::{Map, Value};

/// Extracted text plus provider-specific metadata (page counts, entities,
/// tables) that passes through the pipeline untouched.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub text: String,
    pub metadata: Map<String, Value>,
}

#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Presence checks only; never performs network calls.
    fn validate_config(&self) -> Result<(), AppError>;

    async fn extract(&self, content: &[u8], extension: &str) -> Result<Extraction, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionKind {
    OpenSource,
    Azure,
    Aws,
    Gcp,
}

impl FromStr for ExtractionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "opensource" | "open-source" | "open_source" => Ok(Self::OpenSource),
            "azure" => Ok(Self::Azure),
            "aws" => Ok(Self::Aws),
            "gcp" | "google" => Ok(Self::Gcp),
            other => Err(AppError::Validation(format!(
                "unknown text extraction provider '{other}'. Expected 'opensource', 'azure', 'aws', or 'gcp'."
            ))),
        }
    }
}

impl ExtractionKind {
    /// Resolves the provider, validating its configuration up front.
    pub fn build(
        self,
        params: &Map<String, Value>,
        http: reqwest::Client,
    ) -> Result<Arc<dyn ExtractionProvider>, AppError> {
        let provider: Arc<dyn ExtractionProvider> = match self {
            Self::OpenSource => Arc::new(OpenSourceExtraction::new()),
            Self::Azure => Arc::new(AzureExtraction::from_params(params, http)),
            Self::Aws => Arc::new(AwsExtraction::from_params(params, http)),
            Self::Gcp => Arc::new(GcpExtraction::from_params(params, http)),
        };
        provider.validate_config()?;
        Ok(provider)
    }
}

pub(crate) fn string_param(params: &Map<String, Value>, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

pub(crate) fn require_param(value: &Option<String>, provider: &str, key: &str) -> Result<(), AppError> {
    if value.is_none() {
        return Err(AppError::Validation(format!(
            "{provider} extraction requires '{key}' in configuration"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_parse() {
        assert_eq!(
            ExtractionKind::from_str("opensource").unwrap(),
            ExtractionKind::OpenSource
        );
        assert_eq!(ExtractionKind::from_str("azure").unwrap(), ExtractionKind::Azure);
        assert_eq!(ExtractionKind::from_str("aws").unwrap(), ExtractionKind::Aws);
        assert_eq!(ExtractionKind::from_str("google").unwrap(), ExtractionKind::Gcp);
        assert!(ExtractionKind::from_str("watson").is_err());
    }

    #[test]
    fn remote_providers_fail_config_validation_without_credentials() {
        let http = reqwest::Client::new();
        for kind in [ExtractionKind::Azure, ExtractionKind::Aws, ExtractionKind::Gcp] {
            let err = kind.build(&Map::new(), http.clone());
            assert!(err.is_err(), "{kind:?} should require configuration");
        }
    }
}
