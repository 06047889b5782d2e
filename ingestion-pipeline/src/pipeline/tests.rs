use std::sync::Arc;

use async_trait::async_trait;
use common::{
    error::AppError,
    field_mapping::{FieldMapping, FieldRule},
    record::Record,
    utils::embedding::EmbeddingProvider,
};
use serde_json::json;
use tokio::sync::Mutex;

use super::{config::PipelineTuning, IngestionPipeline, RecordOutcome};
use crate::{
    connectors::Connector,
    extraction::{Extraction, ExtractionProvider, OpenSourceExtraction},
    search::{MemorySearchBackend, SearchBackend},
    stages::{ChunkingStage, EmbeddingStage, ExtractionStage, IndexingStage, Stage, StageKind},
};
use chunking::SentenceChunker;

/// Connector fed from a fixed record list; stands in for a real source.
struct StaticConnector {
    records: Mutex<Vec<Record>>,
}

impl StaticConnector {
    fn new(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl Connector for StaticConnector {
    fn name(&self) -> &'static str {
        "static"
    }

    fn validate_config(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn fetch_data(&self, pipeline: &IngestionPipeline) -> Result<(), AppError> {
        let records = std::mem::take(&mut *self.records.lock().await);
        for record in records {
            pipeline.process_record(record).await;
        }
        Ok(())
    }
}

/// Extraction that rejects a marker payload, leaving other records alone.
struct FlakyExtraction;

#[async_trait]
impl ExtractionProvider for FlakyExtraction {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn validate_config(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn extract(&self, content: &[u8], _extension: &str) -> Result<Extraction, AppError> {
        if content == b"boom" {
            return Err(AppError::Extraction("corrupt file".into()));
        }
        Ok(Extraction {
            text: String::from_utf8_lossy(content).into_owned(),
            metadata: serde_json::Map::new(),
        })
    }
}

fn stage_chain(
    provider: Arc<dyn ExtractionProvider>,
    backend: Arc<MemorySearchBackend>,
    mapping: FieldMapping,
) -> Vec<Box<dyn Stage>> {
    let embedding = Arc::new(EmbeddingProvider::new_hashed(1536));
    vec![
        Box::new(ExtractionStage::new(provider)),
        Box::new(ChunkingStage::new(Box::new(SentenceChunker))),
        Box::new(EmbeddingStage::new(embedding, 8000, 2, 10)),
        Box::new(IndexingStage::new(backend, "documents".into(), mapping, 1536)),
    ]
}

#[tokio::test]
async fn one_failing_record_does_not_abort_its_siblings() {
    let records = vec![
        Record::from_bytes("one.txt", Vec::from(*b"First document.")),
        Record::from_bytes("two.txt", Vec::from(*b"boom")),
        Record::from_bytes("three.txt", Vec::from(*b"Third document.")),
    ];
    let backend = Arc::new(MemorySearchBackend::new());
    let pipeline = IngestionPipeline::new(
        Box::new(StaticConnector::new(records)),
        stage_chain(Arc::new(FlakyExtraction), Arc::clone(&backend), FieldMapping(Vec::new())),
        PipelineTuning::default(),
    );

    let report = pipeline.run().await.expect("run completes");
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 1);

    // Only the surviving records reach the index.
    assert_eq!(backend.document_count("documents").await.expect("count"), 2);
}

#[tokio::test]
async fn failure_outcome_names_the_stage_that_rejected_the_record() {
    let backend = Arc::new(MemorySearchBackend::new());
    let pipeline = IngestionPipeline::new(
        Box::new(StaticConnector::new(Vec::new())),
        stage_chain(Arc::new(FlakyExtraction), backend, FieldMapping(Vec::new())),
        PipelineTuning::default(),
    );

    let outcome = pipeline
        .process_record(Record::from_bytes("bad.txt", Vec::from(*b"boom")))
        .await;
    match outcome {
        RecordOutcome::Failed { stage, .. } => assert_eq!(stage, StageKind::TextExtraction),
        RecordOutcome::Processed => panic!("record should have failed extraction"),
    }
}

#[tokio::test]
async fn sentence_pipeline_end_to_end() {
    let mapping = FieldMapping(vec![FieldRule {
        source_path: "file_name".into(),
        target_name: "source_file".into(),
    }]);
    let backend = Arc::new(MemorySearchBackend::new());
    let record = Record::from_bytes("a.txt", Vec::from(*b"Hello world. This is a test."));

    let pipeline = IngestionPipeline::new(
        Box::new(StaticConnector::new(vec![record])),
        stage_chain(Arc::new(OpenSourceExtraction::new()), Arc::clone(&backend), mapping),
        PipelineTuning::default(),
    );

    let report = pipeline.run().await.expect("run completes");
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 0);

    let mut documents = backend.all_documents("documents").await;
    assert_eq!(documents.len(), 2);
    documents.sort_by(|a, b| a.content.cmp(&b.content));

    assert_eq!(documents[0].content, "Hello world.");
    assert_eq!(documents[1].content, "This is a test.");
    assert_ne!(documents[0].id, documents[1].id);
    for document in &documents {
        assert_eq!(document.embedding.len(), 1536);
        assert_eq!(document.extra.get("source_file"), Some(&json!("a.txt")));
    }
}

#[tokio::test]
async fn a_stalled_stage_times_out_and_fails_the_record() {
    struct StallingExtraction;

    #[async_trait]
    impl ExtractionProvider for StallingExtraction {
        fn name(&self) -> &'static str {
            "stalling"
        }

        fn validate_config(&self) -> Result<(), AppError> {
            Ok(())
        }

        async fn extract(&self, _content: &[u8], _extension: &str) -> Result<Extraction, AppError> {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            Ok(Extraction::default())
        }
    }

    let backend = Arc::new(MemorySearchBackend::new());
    let tuning = PipelineTuning {
        stage_timeout_secs: 1,
        ..PipelineTuning::default()
    };
    let pipeline = IngestionPipeline::new(
        Box::new(StaticConnector::new(Vec::new())),
        stage_chain(Arc::new(StallingExtraction), backend, FieldMapping(Vec::new())),
        tuning,
    );

    tokio::time::pause();
    let outcome_future =
        pipeline.process_record(Record::from_bytes("slow.txt", Vec::from(*b"text")));
    let outcome = outcome_future.await;

    match outcome {
        RecordOutcome::Failed { stage, error } => {
            assert_eq!(stage, StageKind::TextExtraction);
            assert!(matches!(error, AppError::Timeout(1)));
        }
        RecordOutcome::Processed => panic!("stalled stage should time out"),
    }
}

mod compiled {
    use super::*;
    use crate::pipeline::{
        compiler::{compile, CompilerDeps},
        config::{NodeSpec, NodeType, PipelineSpec},
    };
    use common::utils::config::AppConfig;

    fn test_config() -> AppConfig {
        AppConfig {
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".into(),
            embedding_model: "text-embedding-3-small".into(),
            embedding_dimensions: 1536,
            surrealdb_address: String::new(),
            surrealdb_username: String::new(),
            surrealdb_password: String::new(),
            surrealdb_namespace: "test".into(),
            surrealdb_database: "test".into(),
            search_index: "documents".into(),
            data_dir: String::new(),
        }
    }

    #[tokio::test]
    async fn compiled_file_system_pipeline_ingests_a_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.txt"), "Hello world. This is a test.")
            .expect("write fixture");
        std::fs::write(dir.path().join("b.txt"), "Another file.").expect("write fixture");

        let spec = PipelineSpec {
            nodes: vec![
                NodeSpec::new(NodeType::Connector, "file_system")
                    .with_param("path", json!(dir.path().display().to_string())),
                NodeSpec::new(NodeType::TextExtraction, "opensource"),
                NodeSpec::new(NodeType::Chunking, "sentence"),
                NodeSpec::new(NodeType::Embedding, "hashed"),
                NodeSpec::new(NodeType::Search, "memory").with_param("create_index", json!(true)),
            ],
        };
        let deps = CompilerDeps {
            http: reqwest::Client::new(),
            db: None,
            embedding_provider: None,
            config: test_config(),
        };

        let pipeline = compile(&spec, PipelineTuning::default(), deps)
            .await
            .expect("pipeline compiles");
        let report = pipeline.run().await.expect("run completes");
        assert_eq!(report.processed, 2);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn compilation_rejects_unknown_providers() {
        let spec = PipelineSpec {
            nodes: vec![
                NodeSpec::new(NodeType::Connector, "carrier_pigeon"),
                NodeSpec::new(NodeType::TextExtraction, "opensource"),
                NodeSpec::new(NodeType::Chunking, "sentence"),
                NodeSpec::new(NodeType::Embedding, "hashed"),
                NodeSpec::new(NodeType::Search, "memory"),
            ],
        };
        let deps = CompilerDeps {
            http: reqwest::Client::new(),
            db: None,
            embedding_provider: None,
            config: test_config(),
        };

        let err = compile(&spec, PipelineTuning::default(), deps).await;
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn compilation_requires_every_stage_node() {
        let spec = PipelineSpec {
            nodes: vec![NodeSpec::new(NodeType::Connector, "csv")
                .with_param("path", json!("rows.csv"))],
        };
        let deps = CompilerDeps {
            http: reqwest::Client::new(),
            db: None,
            embedding_provider: None,
            config: test_config(),
        };

        let err = compile(&spec, PipelineTuning::default(), deps).await;
        assert!(matches!(err, Err(AppError::Validation(_))));
    }
}
