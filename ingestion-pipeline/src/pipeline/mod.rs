//! Pipeline orchestration: the compiled stage chain, the per-record loop,
//! and the aggregate run report.

pub mod compiler;
pub mod config;
#[cfg(test)]
mod tests;

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use common::{error::AppError, record::Record};
use tracing::{debug, info, warn};

use crate::{
    connectors::Connector,
    stages::{Stage, StageKind},
};
use config::PipelineTuning;

/// An executable pipeline: one connector driving an ordered stage chain.
/// Built by [`compiler::compile`]; every provider has already passed
/// `validate_config` by the time this exists.
pub struct IngestionPipeline {
    connector: Box<dyn Connector>,
    stages: Vec<Box<dyn Stage>>,
    tuning: PipelineTuning,
    processed: AtomicUsize,
    failed: AtomicUsize,
}

/// The fate of a single record. Failures carry the stage that rejected the
/// record; they never propagate out of the run loop.
#[derive(Debug)]
pub enum RecordOutcome {
    Processed,
    Failed { stage: StageKind, error: AppError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub processed: usize,
    pub failed: usize,
}

impl IngestionPipeline {
    pub fn new(
        connector: Box<dyn Connector>,
        stages: Vec<Box<dyn Stage>>,
        tuning: PipelineTuning,
    ) -> Self {
        Self {
            connector,
            stages,
            tuning,
            processed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Runs the connector to exhaustion and reports aggregate counts. An
    /// `Err` means the source itself failed; individual record failures only
    /// show up in the report.
    pub async fn run(&self) -> Result<RunReport, AppError> {
        self.connector.validate_config()?;

        info!(
            connector = self.connector.name(),
            stages = self.stages.len(),
            "ingestion run starting"
        );
        self.connector.fetch_data(self).await?;

        let report = self.report();
        info!(
            processed = report.processed,
            failed = report.failed,
            "ingestion run finished"
        );
        Ok(report)
    }

    /// Threads one record through the stage chain. Each stage runs under the
    /// configured timeout; the first failure drops the record and the
    /// enumeration moves on. Indexing is the only persistent side effect and
    /// runs last, so a dropped record leaves nothing behind.
    pub async fn process_record(&self, mut record: Record) -> RecordOutcome {
        let name = record.display_name().to_string();

        for stage in &self.stages {
            let kind = stage.kind();
            let started = Instant::now();
            let budget = Duration::from_secs(self.tuning.stage_timeout_secs);

            let result = match tokio::time::timeout(budget, stage.process(record)).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout(self.tuning.stage_timeout_secs)),
            };

            match result {
                Ok(next) => {
                    debug!(
                        record = %name,
                        stage = %kind,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "stage finished"
                    );
                    record = next;
                }
                Err(error) => {
                    warn!(record = %name, stage = %kind, error = %error, "record dropped");
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    return RecordOutcome::Failed { stage: kind, error };
                }
            }
        }

        self.processed.fetch_add(1, Ordering::Relaxed);
        RecordOutcome::Processed
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
