//! Opaque device records streamed in by the host.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type EntityId = String;

/// A device/state record. Only `entity_id` is required; everything else is
/// carried through untouched for matchers and renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(alias = "id")]
    pub entity_id: EntityId,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Entity {
    pub fn new(entity_id: impl Into<EntityId>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: String::new(),
            attributes: Map::new(),
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.entity_id
    }

    /// Portion of the id before the first `.` (`light.kitchen` -> `light`).
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(domain, _)| domain)
            .unwrap_or(&self.entity_id)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(Value::as_str)
    }

    pub fn attribute_u64(&self, key: &str) -> Option<u64> {
        self.attribute(key).and_then(Value::as_u64)
    }
}

/// Parse a JSON array of entity records.
pub fn entities_from_json(input: &str) -> serde_json::Result<Vec<Entity>> {
    serde_json::from_str(input)
}
