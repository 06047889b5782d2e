//! Search/indexing backends: persist chunk documents and keep upserts
//! idempotent by document id.

mod memory;
mod surreal;

pub use memory::MemorySearchBackend;
pub use surreal::SurrealSearchBackend;

use std::str::FromStr;

use async_trait::async_trait;
use common::{error::AppError, search_document::SearchDocument};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Surreal,
    Memory,
}

impl FromStr for SearchKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "surreal" | "surrealdb" => Ok(Self::Surreal),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(AppError::Validation(format!(
                "unknown search backend '{other}'. Expected 'surreal' or 'memory'."
            ))),
        }
    }
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Idempotent index creation: an existing index of the same name is
    /// dropped and recreated with a schema inferred from
    /// `additional_metadata` value types.
    async fn create_index(
        &self,
        index: &str,
        additional_metadata: &Map<String, Value>,
        dimension: usize,
    ) -> Result<(), AppError>;

    /// Upserts documents by id; safe to call repeatedly with the same id
    /// (last write wins).
    async fn store_documents(
        &self,
        index: &str,
        documents: Vec<SearchDocument>,
    ) -> Result<(), AppError>;

    async fn document_count(&self, index: &str) -> Result<usize, AppError>;

    async fn get_document(
        &self,
        index: &str,
        id: &str,
    ) -> Result<Option<SearchDocument>, AppError>;
}

/// Field types for schema inference over `additional_metadata` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Bool,
    StringCollection,
    Object,
}

pub fn infer_field_type(value: &Value) -> FieldType {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => FieldType::Integer,
        Value::Number(_) => FieldType::Float,
        Value::Bool(_) => FieldType::Bool,
        Value::Array(_) => FieldType::StringCollection,
        Value::Object(_) => FieldType::Object,
        Value::String(_) | Value::Null => FieldType::String,
    }
}

impl FieldType {
    /// SurrealQL field type for index DDL.
    pub fn surreal_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::StringCollection => "array<string>",
            Self::Object => "object",
        }
    }
}
