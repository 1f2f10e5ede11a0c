//! Domain models for field mapping.
//!
//! These are the shapes shared by every layer:
//!
//! - [`FieldDefinition`] - one destination field of an entity
//! - [`FieldMapping`] - one source → destination binding plus its transform
//! - [`MappingSet`] - the ordered bindings for one (direction, entity, endpoint)
//! - [`Suggestion`] - an automap proposal with a confidence score
//! - [`SourceSample`] - field names and sample values from a source endpoint
//!
//! `MappingSet` serializes to the persisted document shape:
//!
//! ```json
//! {
//!   "name": "PFA import",
//!   "direction": "import",
//!   "entity": "PFA",
//!   "endpointId": "ep-42",
//!   "mappings": [
//!     { "id": "PFA_ID-pfaId", "sourceField": "PFA_ID", "destinationField": "pfaId",
//!       "dataType": "string", "transformType": "trim" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::transform::kinds::TransformKind;

/// Free-form transform parameters as sent by parameter editors.
pub type TransformParams = Map<String, Value>;

// =============================================================================
// Field definitions
// =============================================================================

/// Data type of a destination field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Date,
    Json,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Json => "json",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A destination field of an entity. Immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Unique key within the entity
    pub name: String,
    /// Human-readable label, used in validation messages
    pub label: String,
    pub data_type: DataType,
    #[serde(default)]
    pub required: bool,
}

impl FieldDefinition {
    pub fn new(name: &str, label: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            data_type,
            required: false,
        }
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

// =============================================================================
// Mappings
// =============================================================================

/// Whether a mapping set feeds data in or out of the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Import,
    Export,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Import => "import",
            Direction::Export => "export",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "import" => Ok(Direction::Import),
            "export" => Ok(Direction::Export),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// A single source field → destination field binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub id: String,
    pub source_field: String,
    pub destination_field: String,
    /// Copied from the destination definition when the mapping is created
    pub data_type: String,
    #[serde(default)]
    pub transform_type: TransformKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_params: Option<TransformParams>,
}

impl FieldMapping {
    /// Create a direct (untransformed) mapping with a derived id.
    pub fn new(source_field: &str, destination_field: &str, data_type: &str) -> Self {
        Self {
            id: mapping_id(source_field, destination_field),
            source_field: source_field.to_string(),
            destination_field: destination_field.to_string(),
            data_type: data_type.to_string(),
            transform_type: TransformKind::Direct,
            transform_params: None,
        }
    }

    pub fn with_transform(mut self, kind: TransformKind) -> Self {
        self.transform_type = kind;
        self
    }

    pub fn with_params(mut self, params: TransformParams) -> Self {
        self.transform_params = Some(params);
        self
    }
}

/// Natural key of a binding.
pub fn mapping_id(source_field: &str, destination_field: &str) -> String {
    format!("{}-{}", source_field, destination_field)
}

/// Ordered bindings scoped to one (direction, entity, endpoint) triple.
///
/// Invariant: at most one mapping per `destination_field`. Operations live in
/// [`crate::mapping::set`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSet {
    #[serde(default)]
    pub name: String,
    pub direction: Direction,
    pub entity: String,
    #[serde(default)]
    pub endpoint_id: Option<String>,
    #[serde(default)]
    pub mappings: Vec<FieldMapping>,
}

// =============================================================================
// External inputs
// =============================================================================

/// An automap proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub source: String,
    pub destination: String,
    pub confidence: f64,
}

impl Suggestion {
    pub fn new(source: &str, destination: &str, confidence: f64) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
            confidence,
        }
    }
}

/// What a source endpoint exposes: its field names and one sample record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSample {
    pub fields: Vec<String>,
    #[serde(default)]
    pub sample: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapping_set_document_shape() {
        let doc = json!({
            "name": "PFA import",
            "direction": "import",
            "entity": "PFA",
            "endpointId": "ep-42",
            "mappings": [{
                "id": "PFA_ID-pfaId",
                "sourceField": "PFA_ID",
                "destinationField": "pfaId",
                "dataType": "string",
                "transformType": "multiply",
                "transformParams": { "factor": 2 }
            }]
        });

        let set: MappingSet = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(set.direction, Direction::Import);
        assert_eq!(set.mappings[0].transform_type, TransformKind::Multiply);
        assert_eq!(serde_json::to_value(&set).unwrap(), doc);
    }

    #[test]
    fn test_params_omitted_when_absent() {
        let mapping = FieldMapping::new("a", "b", "string");
        let value = serde_json::to_value(&mapping).unwrap();
        assert!(value.get("transformParams").is_none());
        assert_eq!(value["transformType"], "direct");
        assert_eq!(value["id"], "a-b");
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("Export".parse::<Direction>(), Ok(Direction::Export));
        assert!("sideways".parse::<Direction>().is_err());
    }
}
