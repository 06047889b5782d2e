//! Source connectors. A connector drives the pipeline push-style: it
//! enumerates source items (handling pagination internally) and calls
//! [`IngestionPipeline::process_record`] for each one. One item's failure
//! never aborts the enumeration of its siblings.

mod csv_file;
mod database;
mod file_system;
mod outlook;
mod sharepoint;

pub use csv_file::CsvConnector;
pub use database::DatabaseConnector;
pub use file_system::FileSystemConnector;
pub use outlook::OutlookConnector;
pub use sharepoint::SharePointConnector;

use std::str::FromStr;

use async_trait::async_trait;
use common::{error::AppError, storage::db::SearchDbClient};
use serde_json::{Map, Value};

use crate::pipeline::IngestionPipeline;

#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Presence checks on credentials and identifiers only; no network calls.
    fn validate_config(&self) -> Result<(), AppError>;

    /// Enumerates the source and feeds every item through the pipeline. An
    /// `Err` here means the source itself became unreachable; per-record
    /// failures are handled inside `process_record` and do not surface.
    async fn fetch_data(&self, pipeline: &IngestionPipeline) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorKind {
    FileSystem,
    Csv,
    SharePoint,
    Outlook,
    Database,
}

impl FromStr for ConnectorKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file_system" | "filesystem" | "file-system" => Ok(Self::FileSystem),
            "csv" | "excel" | "xlsx" => Ok(Self::Csv),
            "sharepoint" | "share_point" => Ok(Self::SharePoint),
            "outlook" => Ok(Self::Outlook),
            "database" | "sql" | "relational" => Ok(Self::Database),
            other => Err(AppError::Validation(format!(
                "unknown connector '{other}'. Expected 'file_system', 'csv', 'sharepoint', 'outlook', or 'database'."
            ))),
        }
    }
}

impl ConnectorKind {
    pub fn build(
        self,
        params: &Map<String, Value>,
        http: reqwest::Client,
        db: Option<SearchDbClient>,
        page_size: usize,
    ) -> Result<Box<dyn Connector>, AppError> {
        let connector: Box<dyn Connector> = match self {
            Self::FileSystem => Box::new(FileSystemConnector::from_params(params)),
            Self::Csv => Box::new(CsvConnector::from_params(params)),
            Self::SharePoint => Box::new(SharePointConnector::from_params(params, http, page_size)),
            Self::Outlook => Box::new(OutlookConnector::from_params(params, http, page_size)),
            Self::Database => {
                let db = db.ok_or_else(|| {
                    AppError::Validation(
                        "database connector requires a configured database client".into(),
                    )
                })?;
                Box::new(DatabaseConnector::from_params(params, db, page_size))
            }
        };
        connector.validate_config()?;
        Ok(connector)
    }
}

pub(crate) fn string_param(params: &Map<String, Value>, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

pub(crate) fn require_param(
    value: &Option<String>,
    connector: &str,
    key: &str,
) -> Result<(), AppError> {
    if value.is_none() {
        return Err(AppError::Validation(format!(
            "{connector} connector requires '{key}' in configuration"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_names_parse() {
        assert_eq!(
            ConnectorKind::from_str("file_system").unwrap(),
            ConnectorKind::FileSystem
        );
        assert_eq!(ConnectorKind::from_str("csv").unwrap(), ConnectorKind::Csv);
        assert_eq!(ConnectorKind::from_str("excel").unwrap(), ConnectorKind::Csv);
        assert_eq!(ConnectorKind::from_str("xlsx").unwrap(), ConnectorKind::Csv);
        assert_eq!(
            ConnectorKind::from_str("sharepoint").unwrap(),
            ConnectorKind::SharePoint
        );
        assert_eq!(ConnectorKind::from_str("outlook").unwrap(), ConnectorKind::Outlook);
        assert_eq!(ConnectorKind::from_str("sql").unwrap(), ConnectorKind::Database);
        assert!(ConnectorKind::from_str("ftp").is_err());
    }
}
