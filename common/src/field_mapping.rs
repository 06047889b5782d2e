use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::AppError, record::Record};

/// One projection rule: where to read in the record and what to call the
/// field on the search document. Accepts the legacy `source_name` /
/// `Target_name` spellings used by existing `FIELD_DEFINITIONS` payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldRule {
    #[serde(alias = "source_name")]
    pub source_path: String,
    #[serde(alias = "Target_name", alias = "target_name")]
    pub target_name: String,
}

/// Ordered list of [`FieldRule`]s used by the indexing stage to project
/// record fields onto the target document schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldMapping(pub Vec<FieldRule>);

impl FieldMapping {
    /// Parses a `FIELD_DEFINITIONS` JSON array.
    pub fn from_json_str(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw).map_err(|e| {
            AppError::Validation(format!("FIELD_DEFINITIONS is not a valid mapping list: {e}"))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Projects the mapped fields out of a record. Values are copied
    /// unchanged; paths that resolve to nothing are skipped. All
    /// chunk-documents derived from one record share this projection.
    pub fn project(&self, record: &Record) -> Map<String, Value> {
        let mut projected = Map::new();
        for rule in &self.0 {
            if let Some(value) = record.lookup_path(&rule.source_path) {
                projected.insert(rule.target_name.clone(), value);
            }
        }
        projected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_both_key_spellings() {
        let mapping = FieldMapping::from_json_str(
            r#"[
                {"source_name": "sys_id", "Target_name": "source_id"},
                {"source_path": "webUrl", "target_name": "url"}
            ]"#,
        )
        .expect("mapping parses");

        assert_eq!(
            mapping.0,
            vec![
                FieldRule {
                    source_path: "sys_id".into(),
                    target_name: "source_id".into()
                },
                FieldRule {
                    source_path: "webUrl".into(),
                    target_name: "url".into()
                },
            ]
        );
    }

    #[test]
    fn rejects_malformed_definitions() {
        assert!(FieldMapping::from_json_str("{\"not\": \"a list\"}").is_err());
    }

    #[test]
    fn projection_copies_values_and_skips_missing_paths() {
        let record = Record::from_text("a.txt", "body")
            .with_field("sys_id", json!("row-9"))
            .with_field("Permissions", json!(["read", "write"]));

        let mapping = FieldMapping(vec![
            FieldRule {
                source_path: "sys_id".into(),
                target_name: "source_id".into(),
            },
            FieldRule {
                source_path: "Permissions".into(),
                target_name: "permissions".into(),
            },
            FieldRule {
                source_path: "absent".into(),
                target_name: "ignored".into(),
            },
        ]);

        let projected = mapping.project(&record);
        assert_eq!(projected.get("source_id"), Some(&json!("row-9")));
        assert_eq!(projected.get("permissions"), Some(&json!(["read", "write"])));
        assert!(!projected.contains_key("ignored"));
    }
}
