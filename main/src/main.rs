use common::{storage::db::SearchDbClient, utils::config::get_config};
use ingestion_pipeline::{
    compile, spec_from_env, CompilerDeps, NodeType, PipelineSpec, PipelineTuning,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;

    // A JSON pipeline file given as the first argument wins; otherwise the
    // stage-selection environment variables describe the pipeline.
    let (spec, tuning) = match std::env::args().nth(1) {
        Some(path) => load_spec_file(&path)?,
        None => (spec_from_env()?, PipelineTuning::default()),
    };

    // The database is only dialled when a node actually needs it.
    let db = if needs_database(&spec) {
        Some(
            SearchDbClient::new(
                &config.surrealdb_address,
                &config.surrealdb_username,
                &config.surrealdb_password,
                &config.surrealdb_namespace,
                &config.surrealdb_database,
            )
            .await?,
        )
    } else {
        None
    };

    let deps = CompilerDeps {
        http: reqwest::Client::new(),
        db,
        embedding_provider: None,
        config,
    };

    let pipeline = compile(&spec, tuning, deps).await?;
    let report = pipeline.run().await?;

    info!(
        processed = report.processed,
        failed = report.failed,
        "ingestion finished"
    );
    println!(
        "ingestion finished: {} processed, {} failed",
        report.processed, report.failed
    );
    Ok(())
}

fn load_spec_file(path: &str) -> Result<(PipelineSpec, PipelineTuning), Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;

    let tuning = match value.get("tuning") {
        Some(tuning) => serde_json::from_value(tuning.clone())?,
        None => PipelineTuning::default(),
    };
    let spec: PipelineSpec = serde_json::from_value(value)?;
    Ok((spec, tuning))
}

fn needs_database(spec: &PipelineSpec) -> bool {
    let surreal_search = spec
        .node(NodeType::Search)
        .is_some_and(|node| node.service != "memory");
    let database_connector = spec
        .node(NodeType::Connector)
        .is_some_and(|node| matches!(node.service.as_str(), "database" | "sql" | "relational"));
    surreal_search || database_connector
}
