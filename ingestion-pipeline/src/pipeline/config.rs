use serde::Deserialize;
use serde_json::{Map, Value};

/// Declarative pipeline description, usually read from JSON:
/// `{"nodes": [{"type": "connector", "service": "file_system", "path": "..."}, ...]}`.
/// Unknown keys on a node are kept as provider parameters.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PipelineSpec {
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

impl PipelineSpec {
    pub fn node(&self, node_type: NodeType) -> Option<&NodeSpec> {
        self.nodes.iter().find(|node| node.node_type == node_type)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub service: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl NodeSpec {
    pub fn new(node_type: NodeType, service: impl Into<String>) -> Self {
        Self {
            node_type,
            service: service.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Connector,
    TextExtraction,
    Chunking,
    Embedding,
    Search,
}

/// Runtime knobs with defaults that match the hosted deployment profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineTuning {
    /// Per-stage wall-clock budget; a stage exceeding it fails the record.
    pub stage_timeout_secs: u64,
    /// Chunks longer than this are split before embedding; providers impose
    /// input-size limits.
    pub embedding_char_budget: usize,
    pub embedding_retry_attempts: usize,
    pub embedding_retry_base_ms: u64,
    pub connector_page_size: usize,
}

impl Default for PipelineTuning {
    fn default() -> Self {
        Self {
            stage_timeout_secs: 120,
            embedding_char_budget: 8000,
            embedding_retry_attempts: 3,
            embedding_retry_base_ms: 100,
            connector_page_size: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_list_parses_with_flattened_params() {
        let spec: PipelineSpec = serde_json::from_value(json!({
            "nodes": [
                { "type": "connector", "service": "file_system", "path": "/data/in" },
                { "type": "chunking", "service": "sentence" }
            ]
        }))
        .expect("spec parses");

        let connector = spec.node(NodeType::Connector).expect("connector node");
        assert_eq!(connector.service, "file_system");
        assert_eq!(connector.params.get("path"), Some(&json!("/data/in")));
        assert!(spec.node(NodeType::Embedding).is_none());
    }

    #[test]
    fn tuning_defaults_apply_to_missing_fields() {
        let tuning: PipelineTuning =
            serde_json::from_value(json!({ "stage_timeout_secs": 30 })).expect("tuning parses");
        assert_eq!(tuning.stage_timeout_secs, 30);
        assert_eq!(tuning.embedding_char_budget, 8000);
        assert_eq!(tuning.connector_page_size, 50);
    }
}
