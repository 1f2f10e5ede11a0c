//! Mapping Set operations.
//!
//! All mutations keep the invariant that a destination field is bound at most
//! once: inserting a binding first drops any mapping to the same destination.
//! Source fields may fan out to several destinations.

use crate::catalog::find_field;
use crate::error::MappingError;
use crate::models::{
    mapping_id, DataType, Direction, FieldDefinition, FieldMapping, MappingSet, Suggestion, TransformParams,
};
use crate::transform::TransformKind;

pub use crate::config::DEFAULT_CONFIDENCE_THRESHOLD;

impl MappingSet {
    /// Create an empty set.
    pub fn create(direction: Direction, entity: &str, endpoint_id: Option<&str>) -> Self {
        Self {
            name: String::new(),
            direction,
            entity: entity.to_string(),
            endpoint_id: endpoint_id.map(str::to_string),
            mappings: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Bind `source_field` to `destination_field`, replacing any binding to that destination.
    ///
    /// The new mapping is appended with the `direct` transform. Empty field
    /// names leave the set untouched.
    pub fn add_or_replace(
        &mut self,
        source_field: &str,
        destination_field: &str,
        data_type: &str,
    ) -> Result<&FieldMapping, MappingError> {
        if source_field.trim().is_empty() {
            return Err(MappingError::InvalidBinding {
                reason: "source field is missing".to_string(),
            });
        }
        if destination_field.trim().is_empty() {
            return Err(MappingError::InvalidBinding {
                reason: "destination field is missing".to_string(),
            });
        }

        self.mappings.retain(|m| m.destination_field != destination_field);
        self.mappings
            .push(FieldMapping::new(source_field, destination_field, data_type));

        let last = self.mappings.len() - 1;
        Ok(&self.mappings[last])
    }

    /// Remove the mapping bound to `destination_field`. Returns whether one existed.
    pub fn remove(&mut self, destination_field: &str) -> bool {
        let before = self.mappings.len();
        self.mappings.retain(|m| m.destination_field != destination_field);
        self.mappings.len() != before
    }

    /// Change the transform of the mapping bound to `destination_field`.
    ///
    /// No-op (returns `false`) when nothing is bound there. Switching to a
    /// transform without parameters clears stale parameters.
    pub fn set_transform(&mut self, destination_field: &str, kind: TransformKind) -> bool {
        match self.get_mut(destination_field) {
            Some(mapping) => {
                mapping.transform_type = kind;
                if !kind.has_params() {
                    mapping.transform_params = None;
                }
                true
            }
            None => false,
        }
    }

    /// Replace the transform parameters of the mapping bound to `destination_field`.
    pub fn set_transform_params(&mut self, destination_field: &str, params: Option<TransformParams>) -> bool {
        match self.get_mut(destination_field) {
            Some(mapping) => {
                mapping.transform_params = params;
                true
            }
            None => false,
        }
    }

    /// Replace every mapping with the suggestions scoring above `threshold`.
    ///
    /// This is a full overwrite: mappings absent from the suggestions are
    /// dropped. Data types come from `fields` when the destination is known.
    pub fn apply_suggestions(&mut self, suggestions: &[Suggestion], threshold: f64, fields: &[FieldDefinition]) {
        self.mappings.clear();

        for suggestion in suggestions.iter().filter(|s| s.confidence > threshold) {
            let data_type = find_field(fields, &suggestion.destination)
                .map(|f| f.data_type)
                .unwrap_or(DataType::String);
            // empty names are dropped like malformed drops
            let _ = self.add_or_replace(&suggestion.source, &suggestion.destination, data_type.as_str());
        }
    }

    /// Mapping bound to a destination field.
    pub fn get(&self, destination_field: &str) -> Option<&FieldMapping> {
        self.mappings.iter().find(|m| m.destination_field == destination_field)
    }

    fn get_mut(&mut self, destination_field: &str) -> Option<&mut FieldMapping> {
        self.mappings
            .iter_mut()
            .find(|m| m.destination_field == destination_field)
    }

    /// Whether a destination field is bound.
    pub fn is_mapped(&self, destination_field: &str) -> bool {
        self.get(destination_field).is_some()
    }

    /// Mapping by id.
    pub fn by_id(&self, id: &str) -> Option<&FieldMapping> {
        self.mappings.iter().find(|m| m.id == id)
    }

    /// Source → destination pairs, in set order, for connector rendering.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mappings
            .iter()
            .map(|m| (m.source_field.as_str(), m.destination_field.as_str()))
    }

    /// Destinations fed by one source field.
    pub fn destinations_of<'a>(&'a self, source_field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.mappings
            .iter()
            .filter(move |m| m.source_field == source_field)
            .map(|m| m.destination_field.as_str())
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Whether `id` matches the natural key of its binding.
    pub fn has_natural_id(mapping: &FieldMapping) -> bool {
        mapping.id == mapping_id(&mapping.source_field, &mapping.destination_field)
    }
}
