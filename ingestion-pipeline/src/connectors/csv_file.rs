use async_trait::async_trait;
use calamine::Reader;
use common::{error::AppError, record::Record};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{require_param, string_param, Connector};
use crate::{extraction::office, pipeline::IngestionPipeline};

/// Emits one record per row of a CSV file or Excel workbook. Header names
/// (the first row) become passthrough fields and the row is rendered as
/// `header: value` lines for the text stages.
pub struct CsvConnector {
    path: Option<String>,
    sheet: Option<String>,
}

impl CsvConnector {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            sheet: None,
        }
    }

    pub fn from_params(params: &Map<String, Value>) -> Self {
        Self {
            path: string_param(params, "path"),
            sheet: string_param(params, "sheet"),
        }
    }

    fn row_record(
        file_name: &str,
        row_number: usize,
        headers: &[String],
        values: &[String],
    ) -> Record {
        let mut lines = Vec::with_capacity(headers.len());
        let mut record = Record::from_text(file_name, String::new())
            .with_field("row_number", json!(row_number));

        for (header, value) in headers.iter().zip(values.iter()) {
            lines.push(format!("{header}: {value}"));
            record = record.with_field(header, json!(value));
        }
        record.text = Some(lines.join("\n"));
        record
    }

    /// Rows of an xlsx/xls workbook as strings, first row included. Reads the
    /// named sheet when one is configured, otherwise the first sheet.
    fn workbook_rows(bytes: &[u8], sheet: Option<&str>) -> Result<Vec<Vec<String>>, AppError> {
        let mut workbook =
            calamine::open_workbook_auto_from_rs(std::io::Cursor::new(bytes))
                .map_err(|e| AppError::Processing(format!("not a readable workbook: {e}")))?;

        let sheet_name = match sheet {
            Some(name) => {
                if !workbook.sheet_names().iter().any(|s| s == name) {
                    return Err(AppError::Processing(format!(
                        "workbook has no sheet named '{name}'"
                    )));
                }
                name.to_string()
            }
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| AppError::Processing("workbook has no sheets".into()))?,
        };

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| AppError::Processing(format!("failed to read sheet '{sheet_name}': {e}")))?;
        Ok(range
            .rows()
            .map(|row| row.iter().map(office::cell_text).collect())
            .collect())
    }

    async fn fetch_workbook(&self, pipeline: &IngestionPipeline, path: &str) -> Result<(), AppError> {
        let bytes = tokio::fs::read(path).await?;
        let sheet = self.sheet.clone();
        let rows =
            tokio::task::spawn_blocking(move || Self::workbook_rows(&bytes, sheet.as_deref()))
                .await??;
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();

        let mut rows = rows.into_iter();
        let headers = rows.next().unwrap_or_default();

        let mut emitted = 0usize;
        for (offset, values) in rows.enumerate() {
            emitted += 1;
            let record = Self::row_record(&file_name, offset + 1, &headers, &values);
            pipeline.process_record(record).await;
        }

        info!(file = %file_name, rows = emitted, "workbook enumeration finished");
        Ok(())
    }

    async fn fetch_csv(&self, pipeline: &IngestionPipeline, path: &str) -> Result<(), AppError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::Processing(format!("failed to read csv headers: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut emitted = 0usize;
        for (offset, row) in reader.records().enumerate() {
            let row_number = offset + 1;
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(file = %file_name, row_number, error = %e, "skipping malformed csv row");
                    continue;
                }
            };

            emitted += 1;
            let values: Vec<String> = row.iter().map(str::to_string).collect();
            let record = Self::row_record(&file_name, row_number, &headers, &values);
            pipeline.process_record(record).await;
        }

        info!(file = %file_name, rows = emitted, "csv enumeration finished");
        Ok(())
    }
}

#[async_trait]
impl Connector for CsvConnector {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn validate_config(&self) -> Result<(), AppError> {
        require_param(&self.path, "csv", "path")
    }

    async fn fetch_data(&self, pipeline: &IngestionPipeline) -> Result<(), AppError> {
        let path = self.path.clone().unwrap_or_default();
        let extension = path.rsplit('.').next().unwrap_or_default().to_lowercase();
        if matches!(extension.as_str(), "xlsx" | "xls") {
            self.fetch_workbook(pipeline, &path).await
        } else {
            self.fetch_csv(pipeline, &path).await
        }
    }
}
