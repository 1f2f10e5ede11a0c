//! Field Catalog - destination field definitions per entity.
//!
//! Built-in entities are `PFA`, `Asset` and `BEO`. Entity lookup is
//! case-insensitive. Field order is significant: validation reports missing
//! fields in catalog order.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::config::DEFAULT_ENTITY;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{DataType, FieldDefinition};

/// Registry of destination fields keyed by entity.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    /// Entity names in registration order
    entities: Vec<String>,
    /// Lowercased entity name -> fields
    fields: HashMap<String, Vec<FieldDefinition>>,
    default_entity: String,
}

/// Result of a lookup that may have fallen back to the default entity.
#[derive(Debug, Clone, Copy)]
pub struct CatalogLookup<'a> {
    pub entity: &'a str,
    pub fields: &'a [FieldDefinition],
    pub fallback: bool,
}

impl FieldCatalog {
    /// Empty catalog with the given default entity.
    pub fn new(default_entity: &str) -> Self {
        Self {
            entities: Vec::new(),
            fields: HashMap::new(),
            default_entity: default_entity.to_string(),
        }
    }

    /// The catalog shipped with the engine.
    pub fn builtin() -> Self {
        let mut catalog = Self::new(DEFAULT_ENTITY);
        catalog.register_unchecked("PFA", pfa_fields());
        catalog.register_unchecked("Asset", asset_fields());
        catalog.register_unchecked("BEO", beo_fields());
        catalog
    }

    /// Change which entity stands in for unknown ones.
    pub fn with_default_entity(mut self, entity: &str) -> Self {
        self.default_entity = entity.to_string();
        self
    }

    /// Load additional entities from JSON: `{"Entity": [FieldDefinition, ...]}`.
    ///
    /// Entities already present are replaced.
    pub fn extend_from_json(&mut self, json: &str) -> CatalogResult<()> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| CatalogError::InvalidCatalog(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| CatalogError::InvalidCatalog("expected an object of entities".into()))?;

        for (entity, fields) in obj {
            let fields: Vec<FieldDefinition> = serde_json::from_value(fields.clone())
                .map_err(|e| CatalogError::InvalidCatalog(format!("{}: {}", entity, e)))?;
            self.register(entity, fields)?;
        }
        Ok(())
    }

    /// Register an entity, rejecting duplicate field names.
    pub fn register(&mut self, entity: &str, fields: Vec<FieldDefinition>) -> CatalogResult<()> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(CatalogError::InvalidCatalog(format!(
                    "duplicate field '{}' in entity '{}'",
                    field.name, entity
                )));
            }
        }
        self.register_unchecked(entity, fields);
        Ok(())
    }

    fn register_unchecked(&mut self, entity: &str, fields: Vec<FieldDefinition>) {
        let key = entity.to_lowercase();
        if !self.fields.contains_key(&key) {
            self.entities.push(entity.to_string());
        }
        self.fields.insert(key, fields);
    }

    /// Registered entity names, in registration order.
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn default_entity(&self) -> &str {
        &self.default_entity
    }

    /// Ordered destination fields of an entity.
    pub fn get_fields(&self, entity: &str) -> CatalogResult<&[FieldDefinition]> {
        self.fields
            .get(&entity.to_lowercase())
            .map(|f| f.as_slice())
            .ok_or_else(|| CatalogError::UnknownEntity(entity.to_string()))
    }

    /// Like [`get_fields`](Self::get_fields) but falls back to the default entity.
    ///
    /// Returns `None` only when the default entity itself is not registered.
    pub fn fields_or_default(&self, entity: &str) -> Option<CatalogLookup<'_>> {
        if let Some(lookup) = self.lookup(entity) {
            return Some(lookup);
        }
        self.lookup(&self.default_entity).map(|l| CatalogLookup {
            fallback: true,
            ..l
        })
    }

    fn lookup(&self, entity: &str) -> Option<CatalogLookup<'_>> {
        let key = entity.to_lowercase();
        let name = self.entities.iter().find(|e| e.to_lowercase() == key)?;
        let fields = self.fields.get(&key)?;
        Some(CatalogLookup {
            entity: name.as_str(),
            fields: fields.as_slice(),
            fallback: false,
        })
    }

    /// A single field of an entity.
    pub fn field(&self, entity: &str, name: &str) -> CatalogResult<Option<&FieldDefinition>> {
        Ok(self.get_fields(entity)?.iter().find(|f| f.name == name))
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Look up a field definition by name in a slice.
pub fn find_field<'a>(fields: &'a [FieldDefinition], name: &str) -> Option<&'a FieldDefinition> {
    fields.iter().find(|f| f.name == name)
}

fn pfa_fields() -> Vec<FieldDefinition> {
    use DataType::*;
    vec![
        FieldDefinition::new("pfaId", "PFA ID", String).required(),
        FieldDefinition::new("areaSilo", "Area / Silo", String).required(),
        FieldDefinition::new("category", "Category", String).required(),
        FieldDefinition::new("class", "Class", String).required(),
        FieldDefinition::new("source", "Source", String).required(),
        FieldDefinition::new("dor", "DOR", String).required(),
        FieldDefinition::new("originalStart", "Original Start", Date).required(),
        FieldDefinition::new("originalEnd", "Original End", Date).required(),
        FieldDefinition::new("forecastStart", "Forecast Start", Date).required(),
        FieldDefinition::new("forecastEnd", "Forecast End", Date).required(),
        FieldDefinition::new("actualStart", "Actual Start", Date),
        FieldDefinition::new("actualEnd", "Actual End", Date),
        FieldDefinition::new("monthlyRate", "Monthly Rate", Number),
        FieldDefinition::new("purchasePrice", "Purchase Price", Number),
        FieldDefinition::new("manufacturer", "Manufacturer", String),
        FieldDefinition::new("model", "Model", String),
        FieldDefinition::new("equipment", "Equipment", String),
        FieldDefinition::new("contract", "Contract", String),
        FieldDefinition::new("isActualized", "Actualized", Boolean),
        FieldDefinition::new("isDiscontinued", "Discontinued", Boolean),
        FieldDefinition::new("isFundsTransferable", "Funds Transferable", Boolean),
        FieldDefinition::new("notes", "Notes", String),
    ]
}

fn asset_fields() -> Vec<FieldDefinition> {
    use DataType::*;
    vec![
        FieldDefinition::new("assetTag", "Asset Tag", String).required(),
        FieldDefinition::new("description", "Description", String).required(),
        FieldDefinition::new("category", "Category", String).required(),
        FieldDefinition::new("serialNumber", "Serial Number", String),
        FieldDefinition::new("manufacturer", "Manufacturer", String),
        FieldDefinition::new("model", "Model", String),
        FieldDefinition::new("acquisitionDate", "Acquisition Date", Date),
        FieldDefinition::new("acquisitionCost", "Acquisition Cost", Number),
        FieldDefinition::new("status", "Status", String),
        FieldDefinition::new("location", "Location", String),
        FieldDefinition::new("isOwned", "Owned", Boolean),
        FieldDefinition::new("metadata", "Metadata", Json),
    ]
}

fn beo_fields() -> Vec<FieldDefinition> {
    use DataType::*;
    vec![
        FieldDefinition::new("beoId", "BEO ID", String).required(),
        FieldDefinition::new("transactionDate", "Transaction Date", Date).required(),
        FieldDefinition::new("amount", "Amount", Number).required(),
        FieldDefinition::new("description", "Description", String),
        FieldDefinition::new("costCenter", "Cost Center", String),
        FieldDefinition::new("vendor", "Vendor", String),
        FieldDefinition::new("poNumber", "PO Number", String),
        FieldDefinition::new("approved", "Approved", Boolean),
    ]
}
