//! Turns a declarative [`PipelineSpec`] into an executable
//! [`IngestionPipeline`]. Every provider name is resolved and every
//! provider's configuration validated here, at build time, so a misconfigured
//! pipeline fails before the first record is fetched.

use std::{str::FromStr, sync::Arc};

use async_openai::{config::OpenAIConfig, Client};
use common::{
    error::AppError,
    field_mapping::FieldMapping,
    storage::db::SearchDbClient,
    utils::{
        config::AppConfig,
        embedding::{EmbeddingBackend, EmbeddingProvider},
    },
};
use serde_json::{Map, Value};
use tracing::info;

use super::{
    config::{NodeSpec, NodeType, PipelineSpec, PipelineTuning},
    IngestionPipeline,
};
use crate::{
    connectors::ConnectorKind,
    extraction::ExtractionKind,
    search::{MemorySearchBackend, SearchBackend, SearchKind, SurrealSearchBackend},
    stages::{ChunkingStage, EmbeddingStage, ExtractionStage, IndexingStage, Stage},
};
use chunking::ChunkingStrategy;

/// Process-wide collaborators the compiler wires into the stages. Clients are
/// constructed once at startup and shared; `embedding_provider` lets tests
/// (and pre-warmed deployments) inject a ready backend.
pub struct CompilerDeps {
    pub http: reqwest::Client,
    pub db: Option<SearchDbClient>,
    pub embedding_provider: Option<Arc<EmbeddingProvider>>,
    pub config: AppConfig,
}

/// Builds the pipeline: connector, then extraction, chunking, embedding, and
/// indexing stages in that fixed order. Creates the target index when the
/// search node asks for it.
pub async fn compile(
    spec: &PipelineSpec,
    tuning: PipelineTuning,
    deps: CompilerDeps,
) -> Result<IngestionPipeline, AppError> {
    let connector_node = require_node(spec, NodeType::Connector)?;
    let connector = ConnectorKind::from_str(&connector_node.service)?.build(
        &connector_node.params,
        deps.http.clone(),
        deps.db.clone(),
        tuning.connector_page_size,
    )?;

    let mut stages: Vec<Box<dyn Stage>> = Vec::with_capacity(4);

    let extraction_node = require_node(spec, NodeType::TextExtraction)?;
    let extraction_provider = ExtractionKind::from_str(&extraction_node.service)?
        .build(&extraction_node.params, deps.http.clone())?;
    stages.push(Box::new(ExtractionStage::new(extraction_provider)));

    let chunking_node = require_node(spec, NodeType::Chunking)?;
    let chunker =
        ChunkingStrategy::from_str(&chunking_node.service)?.build(&chunking_node.params)?;
    stages.push(Box::new(ChunkingStage::new(chunker)));

    let embedding_node = require_node(spec, NodeType::Embedding)?;
    let embedding_provider = match deps.embedding_provider {
        Some(provider) => provider,
        None => Arc::new(build_embedding_provider(embedding_node, &deps.config).await?),
    };
    stages.push(Box::new(EmbeddingStage::new(
        Arc::clone(&embedding_provider),
        tuning.embedding_char_budget,
        tuning.embedding_retry_attempts,
        tuning.embedding_retry_base_ms,
    )));

    let search_node = require_node(spec, NodeType::Search)?;
    let backend = build_search_backend(search_node, deps.db)?;
    let index = search_node
        .params
        .get("index")
        .and_then(Value::as_str)
        .unwrap_or(&deps.config.search_index)
        .to_string();
    let mapping = field_mapping(search_node)?;
    let dimension = embedding_provider.dimension();

    if search_node
        .params
        .get("create_index")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        let template = search_node
            .params
            .get("metadata_template")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        backend.create_index(&index, &template, dimension).await?;
    }

    stages.push(Box::new(IndexingStage::new(
        backend,
        index.clone(),
        mapping,
        dimension,
    )));

    info!(
        connector = connector.name(),
        index = %index,
        embedding = embedding_provider.backend_label(),
        dimension,
        "pipeline compiled"
    );

    Ok(IngestionPipeline::new(connector, stages, tuning))
}

fn require_node(spec: &PipelineSpec, node_type: NodeType) -> Result<&NodeSpec, AppError> {
    spec.node(node_type).ok_or_else(|| {
        AppError::Validation(format!(
            "pipeline configuration is missing a {node_type:?} node"
        ))
    })
}

async fn build_embedding_provider(
    node: &NodeSpec,
    config: &AppConfig,
) -> Result<EmbeddingProvider, AppError> {
    let model = node
        .params
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(&config.embedding_model)
        .to_string();
    let dimensions = node
        .params
        .get("dimensions")
        .and_then(Value::as_u64)
        .map_or(config.embedding_dimensions, |v| v as u32);

    match EmbeddingBackend::from_str(&node.service)? {
        EmbeddingBackend::OpenAI => {
            let client = openai_client(node, config)?;
            Ok(EmbeddingProvider::new_openai(client, model, dimensions))
        }
        EmbeddingBackend::AzureOpenAI => {
            let client = openai_client(node, config)?;
            Ok(EmbeddingProvider::new_azure_openai(client, model, dimensions))
        }
        EmbeddingBackend::FastEmbed => {
            let model_override = node
                .params
                .get("model")
                .and_then(Value::as_str)
                .map(str::to_string);
            Ok(EmbeddingProvider::new_fastembed(model_override).await?)
        }
        EmbeddingBackend::Hashed => Ok(EmbeddingProvider::new_hashed(dimensions as usize)),
    }
}

fn openai_client(
    node: &NodeSpec,
    config: &AppConfig,
) -> Result<Arc<Client<OpenAIConfig>>, AppError> {
    let api_key = node
        .params
        .get("api_key")
        .and_then(Value::as_str)
        .unwrap_or(&config.openai_api_key);
    if api_key.is_empty() {
        return Err(AppError::Validation(
            "embedding node requires an OpenAI API key".into(),
        ));
    }
    let base_url = node
        .params
        .get("base_url")
        .and_then(Value::as_str)
        .unwrap_or(&config.openai_base_url);

    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(base_url);
    Ok(Arc::new(Client::with_config(openai_config)))
}

fn build_search_backend(
    node: &NodeSpec,
    db: Option<SearchDbClient>,
) -> Result<Arc<dyn SearchBackend>, AppError> {
    match SearchKind::from_str(&node.service)? {
        SearchKind::Memory => Ok(Arc::new(MemorySearchBackend::new())),
        SearchKind::Surreal => {
            let db = db.ok_or_else(|| {
                AppError::Validation(
                    "surreal search backend requires a configured database client".into(),
                )
            })?;
            Ok(Arc::new(SurrealSearchBackend::new(db)))
        }
    }
}

fn field_mapping(node: &NodeSpec) -> Result<FieldMapping, AppError> {
    if let Some(value) = node.params.get("field_definitions") {
        let rules = serde_json::from_value(value.clone())
            .map_err(|e| AppError::Validation(format!("invalid field_definitions: {e}")))?;
        return Ok(FieldMapping(rules));
    }
    match std::env::var("FIELD_DEFINITIONS") {
        Ok(raw) if !raw.is_empty() => FieldMapping::from_json_str(&raw),
        _ => Ok(FieldMapping(Vec::new())),
    }
}

/// Assembles a [`PipelineSpec`] from the stage-selection environment
/// variables; strategy knobs (`MAX_TOKENS`, `OVERLAP_TOKENS`, `PAGE_TOKENS`,
/// `CHUNKING_KEYWORDS`) are forwarded as node parameters.
pub fn spec_from_env() -> Result<PipelineSpec, AppError> {
    let mut nodes = Vec::with_capacity(5);

    nodes.push(node_from_env("CONNECTOR_TYPE", NodeType::Connector, &[
        ("path", "CONNECTOR_PATH"),
    ])?);
    nodes.push(node_from_env("TEXT_EXTRACTION_TYPE", NodeType::TextExtraction, &[])?);
    nodes.push(node_from_env("CHUNKING_STRATEGY", NodeType::Chunking, &[
        ("max_tokens", "MAX_TOKENS"),
        ("overlap_tokens", "OVERLAP_TOKENS"),
        ("page_tokens", "PAGE_TOKENS"),
        ("keywords", "CHUNKING_KEYWORDS"),
    ])?);
    nodes.push(node_from_env("EMBEDDING_TYPE", NodeType::Embedding, &[])?);
    nodes.push(node_from_env("SEARCH_TYPE", NodeType::Search, &[
        ("index", "SEARCH_INDEX"),
    ])?);

    Ok(PipelineSpec { nodes })
}

fn node_from_env(
    selector: &str,
    node_type: NodeType,
    param_vars: &[(&str, &str)],
) -> Result<NodeSpec, AppError> {
    let service = std::env::var(selector)
        .map_err(|_| AppError::Validation(format!("environment variable {selector} is not set")))?;

    let mut params = Map::new();
    for (key, var) in param_vars {
        if let Ok(value) = std::env::var(var) {
            if !value.is_empty() {
                params.insert((*key).to_string(), Value::String(value));
            }
        }
    }

    Ok(NodeSpec {
        node_type,
        service,
        params,
    })
}
