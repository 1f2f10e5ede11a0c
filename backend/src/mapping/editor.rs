//! Editing session around a single mapping set.
//!
//! [`MappingEditor`] is what a canvas or table view talks to. It owns the set
//! and the destination fields of its entity, and refreshes the
//! [`ValidationReport`] after every change so the view can show the save gate
//! without recomputing it.
//!
//! Results of async work (field catalogs, automap suggestions) are applied
//! through [`RequestTicket`]s. A ticket issued before a newer
//! [`begin_request`](MappingEditor::begin_request) is stale and its result is
//! dropped.

use crate::api::logs::{log_scoped, LogLevel};
use crate::catalog::{find_field, CatalogLookup};
use crate::error::{DelimitedError, MappingError, ValidationError};
use crate::models::{DataType, FieldDefinition, MappingSet, Suggestion, TransformParams};
use crate::transform::TransformKind;
use crate::validation::{self, ValidationReport};

use super::delimited::ImportOutcome;

const SCOPE: &str = "editor";

/// Receives bindings proposed by a drag-and-drop surface.
///
/// Either side of the payload may be missing when the drop landed outside a
/// field. Implementations must treat that as a no-op.
pub trait BindingSink {
    /// Returns whether a mapping was created.
    fn on_binding_proposed(&mut self, source: Option<&str>, destination: Option<&str>) -> bool;
}

/// Generation marker for an in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

/// A mapping set being edited against a fixed destination catalog.
#[derive(Debug, Clone)]
pub struct MappingEditor {
    set: MappingSet,
    fields: Vec<FieldDefinition>,
    report: ValidationReport,
    generation: u64,
    fallback_catalog: bool,
}

impl MappingEditor {
    pub fn new(set: MappingSet, fields: Vec<FieldDefinition>) -> Self {
        let report = validation::report(&set, &fields);
        Self {
            set,
            fields,
            report,
            generation: 0,
            fallback_catalog: false,
        }
    }

    /// Editor whose fields come from a catalog lookup.
    pub fn from_lookup(set: MappingSet, lookup: CatalogLookup<'_>) -> Self {
        let mut editor = Self::new(set, lookup.fields.to_vec());
        editor.fallback_catalog = lookup.fallback;
        editor
    }

    pub fn set(&self) -> &MappingSet {
        &self.set
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// Whether the fields are the default entity's stand-ins.
    pub fn uses_fallback_catalog(&self) -> bool {
        self.fallback_catalog
    }

    pub fn into_set(self) -> MappingSet {
        self.set
    }

    /// Labels blocking save.
    pub fn missing_required(&self) -> &[String] {
        &self.report.missing_required
    }

    /// `Ok` when the set can be saved.
    pub fn ensure_saveable(&self) -> Result<(), ValidationError> {
        if self.report.can_save() {
            Ok(())
        } else {
            Err(ValidationError::MissingRequired {
                labels: self.report.missing_required.clone(),
            })
        }
    }

    fn refresh(&mut self) {
        self.report = validation::report(&self.set, &self.fields);
    }

    fn data_type_of(&self, destination: &str) -> DataType {
        find_field(&self.fields, destination)
            .map(|f| f.data_type)
            .unwrap_or(DataType::String)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Bind a source field to a destination, typed from the catalog.
    pub fn bind(&mut self, source: &str, destination: &str) -> Result<(), MappingError> {
        let data_type = self.data_type_of(destination);
        self.set.add_or_replace(source, destination, data_type.as_str())?;
        self.refresh();
        Ok(())
    }

    pub fn unbind(&mut self, destination: &str) -> bool {
        let removed = self.set.remove(destination);
        if removed {
            self.refresh();
        }
        removed
    }

    pub fn set_transform(&mut self, destination: &str, kind: TransformKind) -> bool {
        let changed = self.set.set_transform(destination, kind);
        if changed {
            self.refresh();
        }
        changed
    }

    pub fn set_transform_params(&mut self, destination: &str, params: Option<TransformParams>) -> bool {
        let changed = self.set.set_transform_params(destination, params);
        if changed {
            self.refresh();
        }
        changed
    }

    /// Replace the mappings with delimited text.
    pub fn import_delimited(&mut self, text: &str) -> Result<ImportOutcome, DelimitedError> {
        let outcome = self.set.import_from_delimited(text)?;
        for error in &outcome.errors {
            log_scoped(LogLevel::Warning, SCOPE, format!("Line {} skipped: {}", error.line, error.message));
        }
        self.refresh();
        Ok(outcome)
    }

    pub fn export_delimited(&self) -> String {
        self.set.export_to_delimited()
    }

    // =========================================================================
    // Async results
    // =========================================================================

    /// Start a new request; every earlier ticket becomes stale.
    pub fn begin_request(&mut self) -> RequestTicket {
        self.generation += 1;
        RequestTicket(self.generation)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Apply automap suggestions, replacing every mapping.
    pub fn apply_suggestions(&mut self, suggestions: &[Suggestion], threshold: f64) {
        self.set.apply_suggestions(suggestions, threshold, &self.fields);
        self.refresh();
        log_scoped(
            LogLevel::Info,
            SCOPE,
            format!("Applied {} of {} suggestions", self.set.len(), suggestions.len()),
        );
    }

    /// [`apply_suggestions`](Self::apply_suggestions) gated on a current ticket.
    pub fn apply_suggestions_for(&mut self, ticket: RequestTicket, suggestions: &[Suggestion], threshold: f64) -> bool {
        if !self.is_current(ticket) {
            log_scoped(LogLevel::Info, SCOPE, "Dropped stale suggestions");
            return false;
        }
        self.apply_suggestions(suggestions, threshold);
        true
    }

    /// Swap in a freshly fetched destination catalog.
    ///
    /// Existing mappings are kept; bindings to fields the new catalog lacks
    /// show up as unknown destinations in the report.
    pub fn load_fields(&mut self, fields: Vec<FieldDefinition>) {
        self.fields = fields;
        self.fallback_catalog = false;
        self.refresh();
    }

    /// [`load_fields`](Self::load_fields) gated on a current ticket.
    pub fn load_fields_for(&mut self, ticket: RequestTicket, fields: Vec<FieldDefinition>) -> bool {
        if !self.is_current(ticket) {
            log_scoped(LogLevel::Info, SCOPE, "Dropped stale field catalog");
            return false;
        }
        self.load_fields(fields);
        true
    }
}

impl BindingSink for MappingEditor {
    fn on_binding_proposed(&mut self, source: Option<&str>, destination: Option<&str>) -> bool {
        let (Some(source), Some(destination)) = (source, destination) else {
            log_scoped(LogLevel::Warning, SCOPE, "Ignored drop without source or destination");
            return false;
        };
        match self.bind(source, destination) {
            Ok(()) => true,
            Err(e) => {
                log_scoped(LogLevel::Warning, SCOPE, e.to_string());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldCatalog;
    use crate::models::Direction;

    fn pfa_editor() -> MappingEditor {
        let catalog = FieldCatalog::builtin();
        let set = MappingSet::create(Direction::Import, "PFA", None);
        MappingEditor::new(set, catalog.get_fields("PFA").unwrap().to_vec())
    }

    #[test]
    fn test_new_editor_reports_all_required() {
        let editor = pfa_editor();
        assert_eq!(editor.missing_required().len(), 10);
        assert_eq!(editor.missing_required()[0], "PFA ID");
    }

    #[test]
    fn test_drop_types_from_destination() {
        let mut editor = pfa_editor();
        assert!(editor.on_binding_proposed(Some("Start"), Some("originalStart")));
        assert_eq!(editor.set().get("originalStart").unwrap().data_type, "date");
        assert_eq!(editor.missing_required().len(), 9);
    }

    #[test]
    fn test_malformed_drop_is_noop() {
        let mut editor = pfa_editor();
        assert!(!editor.on_binding_proposed(None, Some("pfaId")));
        assert!(!editor.on_binding_proposed(Some("A"), None));
        assert!(!editor.on_binding_proposed(Some(""), Some("pfaId")));
        assert!(editor.set().is_empty());
    }

    #[test]
    fn test_report_follows_mutations() {
        let mut editor = pfa_editor();
        editor.bind("ID", "pfaId").unwrap();
        editor.bind("Cat", "category").unwrap();
        assert_eq!(editor.missing_required().len(), 8);
        assert!(editor.ensure_saveable().is_err());

        assert!(editor.unbind("category"));
        assert_eq!(editor.missing_required().len(), 9);
    }

    #[test]
    fn test_param_issues_tracked() {
        let mut editor = pfa_editor();
        editor.bind("Rate", "monthlyRate").unwrap();
        editor.set_transform("monthlyRate", TransformKind::Multiply);
        assert_eq!(editor.report().invalid_params.len(), 1);

        let params = serde_json::json!({"factor": 3}).as_object().cloned();
        editor.set_transform_params("monthlyRate", params);
        assert!(editor.report().invalid_params.is_empty());
    }

    #[test]
    fn test_stale_suggestions_dropped() {
        let mut editor = pfa_editor();
        let old = editor.begin_request();
        let new = editor.begin_request();

        assert!(!editor.apply_suggestions_for(old, &[Suggestion::new("ID", "pfaId", 0.9)], 0.5));
        assert!(editor.set().is_empty());

        assert!(editor.apply_suggestions_for(new, &[Suggestion::new("Cat", "category", 0.9)], 0.5));
        assert!(editor.set().is_mapped("category"));
    }

    #[test]
    fn test_stale_fields_dropped() {
        let mut editor = pfa_editor();
        let ticket = editor.begin_request();
        editor.begin_request();
        assert!(!editor.load_fields_for(ticket, Vec::new()));
        assert_eq!(editor.fields().len(), FieldCatalog::builtin().get_fields("PFA").unwrap().len());
    }

    #[test]
    fn test_load_fields_marks_unknown_destinations() {
        let mut editor = pfa_editor();
        editor.bind("ID", "pfaId").unwrap();
        let ticket = editor.begin_request();
        let asset = FieldCatalog::builtin().get_fields("Asset").unwrap().to_vec();
        assert!(editor.load_fields_for(ticket, asset));
        assert_eq!(editor.report().unknown_destinations, vec!["pfaId"]);
    }

    #[test]
    fn test_fallback_lookup_flag() {
        let catalog = FieldCatalog::builtin();
        let lookup = catalog.fields_or_default("Nope").unwrap();
        let editor = MappingEditor::from_lookup(MappingSet::create(Direction::Import, "Nope", None), lookup);
        assert!(editor.uses_fallback_catalog());
        assert_eq!(editor.missing_required().len(), 10);
    }

    #[test]
    fn test_import_refreshes_report() {
        let mut editor = pfa_editor();
        let outcome = editor.import_delimited("h\nID,pfaId,string,trim\n").unwrap();
        assert_eq!(outcome.imported, 1);
        assert_eq!(editor.missing_required().len(), 9);
    }
}
