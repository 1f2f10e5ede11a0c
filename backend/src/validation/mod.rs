//! Validation of mapping sets.
//!
//! # Save gate
//!
//! [`validate`] lists the labels of required destination fields that have no
//! mapping, in catalog order. A non-empty list blocks saving
//! ([`ensure_saveable`]).
//!
//! # Report
//!
//! [`report`] adds non-blocking findings: mappings to destinations the catalog
//! does not know, and transform parameters that fail their schema.
//!
//! # Documents
//!
//! [`validate_document`] checks a raw persisted document against the embedded
//! JSON Schema (`schemas/mapping-config-schema.json`) before it is deserialized.
//!
//! # Example
//!
//! ```rust,ignore
//! use fieldmap::{FieldCatalog, MappingSet, Direction, validation};
//!
//! let catalog = FieldCatalog::builtin();
//! let fields = catalog.get_fields("PFA")?;
//! let mut set = MappingSet::create(Direction::Import, "PFA", None);
//! set.add_or_replace("ID", "pfaId", "string")?;
//!
//! let missing = validation::validate(&set, fields);
//! assert_eq!(missing.len(), 9);
//! ```

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::catalog::find_field;
use crate::error::ValidationError;
use crate::models::{FieldDefinition, MappingSet};
use crate::transform::validate_params;

/// Embedded persisted-document schema
static MAPPING_CONFIG_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/mapping-config-schema.json"))
        .expect("Invalid embedded schema")
});

/// Labels of required fields with no mapping, in catalog order.
pub fn validate(set: &MappingSet, fields: &[FieldDefinition]) -> Vec<String> {
    let mapped: HashSet<&str> = set
        .mappings
        .iter()
        .map(|m| m.destination_field.as_str())
        .collect();

    fields
        .iter()
        .filter(|f| f.required && !mapped.contains(f.name.as_str()))
        .map(|f| f.label.clone())
        .collect()
}

/// `Ok` when every required field is mapped.
pub fn ensure_saveable(set: &MappingSet, fields: &[FieldDefinition]) -> Result<(), ValidationError> {
    let labels = validate(set, fields);
    if labels.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingRequired { labels })
    }
}

/// Full validation findings for a set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Labels of unmapped required fields (blocks save)
    pub missing_required: Vec<String>,
    /// Destination fields not in the catalog
    pub unknown_destinations: Vec<String>,
    /// Mappings whose transform parameters fail their schema
    pub invalid_params: Vec<ParamIssue>,
}

/// A mapping with unusable transform parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamIssue {
    pub destination_field: String,
    pub message: String,
}

impl ValidationReport {
    /// Whether the set may be persisted.
    pub fn can_save(&self) -> bool {
        self.missing_required.is_empty()
    }

    /// Whether there is nothing at all to report.
    pub fn is_clean(&self) -> bool {
        self.can_save() && self.unknown_destinations.is_empty() && self.invalid_params.is_empty()
    }
}

/// Compute the full report.
pub fn report(set: &MappingSet, fields: &[FieldDefinition]) -> ValidationReport {
    let unknown_destinations = set
        .mappings
        .iter()
        .filter(|m| find_field(fields, &m.destination_field).is_none())
        .map(|m| m.destination_field.clone())
        .collect();

    let invalid_params = set
        .mappings
        .iter()
        .filter_map(|m| {
            validate_params(m.transform_type, m.transform_params.as_ref())
                .err()
                .map(|e| ParamIssue {
                    destination_field: m.destination_field.clone(),
                    message: e.to_string(),
                })
        })
        .collect();

    ValidationReport {
        missing_required: validate(set, fields),
        unknown_destinations,
        invalid_params,
    }
}

/// Check a raw document against the persisted mapping schema.
pub fn validate_document(data: &Value) -> Result<(), ValidationError> {
    let validator = jsonschema::draft7::new(&MAPPING_CONFIG_SCHEMA).map_err(|e| ValidationError::SchemaError {
        errors: vec![format!("Invalid schema: {}", e)],
    })?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::SchemaError { errors })
    }
}

/// Quick check against the persisted mapping schema.
pub fn is_valid_document(data: &Value) -> bool {
    jsonschema::draft7::is_valid(&MAPPING_CONFIG_SCHEMA, data)
}

/// Schema-check then deserialize a persisted document.
pub fn parse_document(data: Value) -> Result<MappingSet, ValidationError> {
    validate_document(&data)?;
    serde_json::from_value(data).map_err(|e| ValidationError::SchemaError {
        errors: vec![e.to_string()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldCatalog;
    use crate::models::Direction;
    use crate::transform::TransformKind;
    use serde_json::json;

    fn pfa_fields() -> Vec<FieldDefinition> {
        FieldCatalog::builtin().get_fields("PFA").unwrap().to_vec()
    }

    #[test]
    fn test_pfa_scenario_blocks_save() {
        let fields = pfa_fields();
        let mut set = MappingSet::create(Direction::Import, "PFA", None);
        set.add_or_replace("PFA_ID", "pfaId", "string").unwrap();
        set.add_or_replace("CAT", "category", "string").unwrap();

        let missing = validate(&set, &fields);
        assert_eq!(
            missing,
            vec![
                "Area / Silo", "Class", "Source", "DOR", "Original Start",
                "Original End", "Forecast Start", "Forecast End",
            ]
        );

        let err = ensure_saveable(&set, &fields).unwrap_err();
        assert!(matches!(err, ValidationError::MissingRequired { ref labels } if labels.len() == 8));
    }

    #[test]
    fn test_complete_set_is_saveable() {
        let fields = pfa_fields();
        let mut set = MappingSet::create(Direction::Import, "PFA", None);
        for f in fields.iter().filter(|f| f.required) {
            set.add_or_replace(&format!("src_{}", f.name), &f.name, f.data_type.as_str())
                .unwrap();
        }
        assert!(validate(&set, &fields).is_empty());
        assert!(ensure_saveable(&set, &fields).is_ok());
    }

    #[test]
    fn test_validate_empty_iff_required_mapped() {
        let fields = pfa_fields();
        let mut set = MappingSet::create(Direction::Import, "PFA", None);
        for f in &fields {
            set.add_or_replace("x", &f.name, "string").unwrap();
        }
        assert!(validate(&set, &fields).is_empty());
        set.remove("dor");
        assert_eq!(validate(&set, &fields), vec!["DOR"]);
    }

    #[test]
    fn test_report_findings() {
        let fields = pfa_fields();
        let mut set = MappingSet::create(Direction::Import, "PFA", None);
        set.add_or_replace("Rate", "monthlyRate", "number").unwrap();
        set.set_transform("monthlyRate", TransformKind::Divide);
        set.add_or_replace("X", "noSuchField", "string").unwrap();

        let report = report(&set, &fields);
        assert!(!report.can_save());
        assert_eq!(report.unknown_destinations, vec!["noSuchField"]);
        assert_eq!(report.invalid_params.len(), 1);
        assert_eq!(report.invalid_params[0].destination_field, "monthlyRate");
        assert!(!report.is_clean());
    }

    #[test]
    fn test_document_schema() {
        let doc = json!({
            "name": "n",
            "direction": "import",
            "entity": "PFA",
            "endpointId": null,
            "mappings": [{
                "id": "a-pfaId",
                "sourceField": "a",
                "destinationField": "pfaId",
                "dataType": "string",
                "transformType": "trim"
            }]
        });
        assert!(is_valid_document(&doc));
        let set = parse_document(doc).unwrap();
        assert_eq!(set.mappings.len(), 1);
    }

    #[test]
    fn test_document_schema_rejects_bad_transform() {
        let doc = json!({
            "direction": "sideways",
            "entity": "PFA",
            "mappings": [{ "id": "x", "sourceField": "a", "destinationField": "b",
                           "dataType": "string", "transformType": "explode" }]
        });
        let err = validate_document(&doc).unwrap_err();
        assert!(matches!(err, ValidationError::SchemaError { ref errors } if errors.len() >= 2));
    }
}
