use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use surrealdb::sql::Thing;
use uuid::Uuid;

/// One upserted search document: the shape downstream consumers rely on.
/// Each document carries a unique string id, the chunk text, the embedding
/// vector, and zero or more mapped metadata fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchDocument {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

struct FlexibleIdVisitor;

impl<'de> de::Visitor<'de> for FlexibleIdVisitor {
    type Value = String;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a string or a Thing")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(value.to_string())
    }

    fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(value)
    }

    fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
    where
        A: de::MapAccess<'de>,
    {
        // SurrealDB hands record ids back as a Thing; keep the raw key.
        let thing = Thing::deserialize(de::value::MapAccessDeserializer::new(map))?;
        Ok(thing.id.to_raw())
    }
}

/// Accepts both the plain-string id this crate writes and the `Thing` the
/// database returns it as.
pub fn deserialize_flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(FlexibleIdVisitor)
}

impl SearchDocument {
    pub fn new(content: String, embedding: Vec<f32>, extra: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            embedding,
            extra,
        }
    }
}
