use async_trait::async_trait;
use common::{error::AppError, record::Record, storage::db::SearchDbClient};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{require_param, string_param, Connector};
use crate::pipeline::IngestionPipeline;

/// Relational-style source backed by a database table. Rows are paged with
/// `LIMIT`/`START`, and an optional `updated_since` timestamp narrows the run
/// to a delta window.
pub struct DatabaseConnector {
    db: SearchDbClient,
    table: Option<String>,
    text_field: Option<String>,
    updated_since: Option<String>,
    page_size: usize,
}

impl DatabaseConnector {
    pub fn from_params(params: &Map<String, Value>, db: SearchDbClient, page_size: usize) -> Self {
        Self {
            db,
            table: string_param(params, "table"),
            text_field: string_param(params, "text_field"),
            updated_since: string_param(params, "updated_since"),
            page_size,
        }
    }

    fn row_record(table: &str, text_field: &str, row: Map<String, Value>) -> Option<Record> {
        let record_id = row
            .get("record_id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let text = match row.get(text_field) {
            Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
            _ => {
                warn!(table, record_id = %record_id, text_field, "skipping row without usable text");
                return None;
            }
        };

        let mut record = Record::from_text(format!("{table}-{record_id}.txt"), text);
        for (key, value) in row {
            record = record.with_field(key, value);
        }
        Some(record)
    }
}

#[async_trait]
impl Connector for DatabaseConnector {
    fn name(&self) -> &'static str {
        "database"
    }

    fn validate_config(&self) -> Result<(), AppError> {
        require_param(&self.table, "database", "table")?;
        require_param(&self.text_field, "database", "text_field")?;
        Ok(())
    }

    async fn fetch_data(&self, pipeline: &IngestionPipeline) -> Result<(), AppError> {
        let table = self.table.as_deref().unwrap_or_default();
        let text_field = self.text_field.as_deref().unwrap_or_default();
        let delta_filter = self
            .updated_since
            .as_deref()
            .map_or(String::new(), |_| "WHERE updated_at > $since".to_string());

        let mut start = 0usize;
        let mut emitted = 0usize;
        loop {
            let query = format!(
                "SELECT *, meta::id(id) AS record_id OMIT id FROM type::table($table) \
                 {delta_filter} LIMIT $limit START $start;"
            );
            let mut response = self
                .db
                .client
                .query(query)
                .bind(("table", table.to_string()))
                .bind(("since", self.updated_since.clone().unwrap_or_default()))
                .bind(("limit", self.page_size))
                .bind(("start", start))
                .await?;
            let rows: Vec<Map<String, Value>> = response
                .take(0)
                .map_err(|e| AppError::Processing(format!("failed to read source rows: {e}")))?;

            if rows.is_empty() {
                break;
            }
            let page_len = rows.len();

            for row in rows {
                if let Some(record) = Self::row_record(table, text_field, row) {
                    pipeline.process_record(record).await;
                    emitted += 1;
                }
            }

            start += page_len;
            if page_len < self.page_size {
                break;
            }
        }

        info!(table, rows = emitted, "database enumeration finished");
        Ok(())
    }
}
