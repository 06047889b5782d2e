use std::sync::Arc;

use async_trait::async_trait;
use common::{error::AppError, record::Record};
use tracing::{debug, instrument};

use super::{Stage, StageKind};
use crate::extraction::ExtractionProvider;

/// Turns raw connector bytes into plain text via the configured extraction
/// provider. Consumes `file_bytes`; records that already carry structured
/// `text` (rows, mail bodies) pass through untouched.
pub struct ExtractionStage {
    provider: Arc<dyn ExtractionProvider>,
}

impl ExtractionStage {
    pub fn new(provider: Arc<dyn ExtractionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Stage for ExtractionStage {
    fn kind(&self) -> StageKind {
        StageKind::TextExtraction
    }

    #[instrument(level = "trace", skip_all)]
    async fn process(&self, mut record: Record) -> Result<Record, AppError> {
        let Some(bytes) = record.file_bytes.take() else {
            if record.text.is_some() {
                return Ok(record);
            }
            return Err(AppError::Extraction(format!(
                "record '{}' has neither file bytes nor text",
                record.display_name()
            )));
        };

        let extension = record.extension().ok_or_else(|| {
            AppError::Extraction(format!(
                "record '{}' has no file extension to select a parser",
                record.display_name()
            ))
        })?;

        let extraction = self.provider.extract(&bytes, &extension).await?;

        debug!(
            record = %record.display_name(),
            provider = self.provider.name(),
            text_chars = extraction.text.chars().count(),
            "text extracted"
        );

        record.text = Some(extraction.text);
        for (key, value) in extraction.metadata {
            record.metadata.insert(key, value);
        }

        Ok(record)
    }
}
