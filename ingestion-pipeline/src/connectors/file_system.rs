use std::path::PathBuf;

use async_trait::async_trait;
use common::{error::AppError, record::Record};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{require_param, string_param, Connector};
use crate::pipeline::IngestionPipeline;

/// Walks a directory tree and feeds every regular file through the pipeline.
/// Unreadable entries are logged and skipped.
pub struct FileSystemConnector {
    root: Option<String>,
}

impl FileSystemConnector {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn from_params(params: &Map<String, Value>) -> Self {
        Self {
            root: string_param(params, "path"),
        }
    }
}

#[async_trait]
impl Connector for FileSystemConnector {
    fn name(&self) -> &'static str {
        "file_system"
    }

    fn validate_config(&self) -> Result<(), AppError> {
        require_param(&self.root, "file_system", "path")
    }

    async fn fetch_data(&self, pipeline: &IngestionPipeline) -> Result<(), AppError> {
        let root = PathBuf::from(self.root.as_deref().unwrap_or_default());
        let mut pending = vec![root.clone()];
        let mut discovered = 0usize;

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    // Only the root being unreadable is fatal.
                    if dir == root {
                        return Err(AppError::Io(e));
                    }
                    warn!(directory = %dir.display(), error = %e, "skipping unreadable directory");
                    continue;
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(
                            directory = %dir.display(),
                            error = %e,
                            "directory enumeration interrupted; continuing with remaining entries"
                        );
                        break;
                    }
                };
                let path = entry.path();
                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                        continue;
                    }
                };

                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }

                let file_name = entry.file_name().to_string_lossy().into_owned();
                let bytes = match tokio::fs::read(&path).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable file");
                        continue;
                    }
                };

                discovered += 1;
                let record = Record::from_bytes(file_name, bytes)
                    .with_field("source_path", json!(path.display().to_string()));
                pipeline.process_record(record).await;
            }
        }

        info!(root = %root.display(), discovered, "file system enumeration finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{config::PipelineTuning, IngestionPipeline};

    #[test]
    fn validation_requires_a_path() {
        assert!(FileSystemConnector::from_params(&Map::new())
            .validate_config()
            .is_err());
        assert!(FileSystemConnector::new("/tmp/data").validate_config().is_ok());
    }

    #[tokio::test]
    async fn a_missing_root_is_fatal() {
        let connector = FileSystemConnector::new("/nonexistent/ingest-root");
        let pipeline = IngestionPipeline::new(
            Box::new(FileSystemConnector::new("/nonexistent/ingest-root")),
            Vec::new(),
            PipelineTuning::default(),
        );
        assert!(matches!(
            connector.fetch_data(&pipeline).await,
            Err(AppError::Io(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn problem_entries_do_not_stop_the_enumeration() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("readable.txt"), b"hello").expect("write file");
        // Dangling symlink alongside the regular file.
        std::os::unix::fs::symlink(
            dir.path().join("does-not-exist"),
            dir.path().join("dangling"),
        )
        .expect("symlink");

        let root = dir.path().to_string_lossy().into_owned();
        let pipeline = IngestionPipeline::new(
            Box::new(FileSystemConnector::new(root)),
            Vec::new(),
            PipelineTuning::default(),
        );

        let report = pipeline.run().await.expect("run succeeds");
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 0);
    }
}
