//! Configurable, provider-agnostic document ingestion pipeline.
//!
//! A declarative node list (connector, text extraction, chunking, embedding,
//! search) is compiled into an executable chain at startup. The connector
//! drives the chain push-style, one record at a time; a stage failure is
//! local to the record that triggered it.

pub mod connectors;
pub mod extraction;
pub mod pipeline;
pub mod search;
pub mod stages;

pub use pipeline::{
    compiler::{compile, spec_from_env, CompilerDeps},
    config::{NodeSpec, NodeType, PipelineSpec, PipelineTuning},
    IngestionPipeline, RecordOutcome, RunReport,
};
