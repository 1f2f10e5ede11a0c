//! Name-based suggestions, used when no AI client is configured.

use crate::models::{FieldDefinition, Suggestion};

/// Exact name match after normalization.
pub const NAME_MATCH: f64 = 1.0;
/// Source matches the destination label.
pub const LABEL_MATCH: f64 = 0.9;
/// One name contains the other.
pub const PARTIAL_MATCH: f64 = 0.6;

/// Lowercase and drop `_`, `-` and whitespace.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn score(source: &str, destination: &FieldDefinition) -> Option<f64> {
    let source = normalize(source);
    if source.is_empty() {
        return None;
    }
    let name = normalize(&destination.name);
    let label = normalize(&destination.label);

    if source == name {
        Some(NAME_MATCH)
    } else if source == label {
        Some(LABEL_MATCH)
    } else if !name.is_empty() && (source.contains(&name) || name.contains(&source)) {
        Some(PARTIAL_MATCH)
    } else {
        None
    }
}

/// One suggestion per destination that some source resembles, in catalog order.
///
/// The best-scoring source wins; on a tie the earlier source does.
pub fn heuristic_suggestions(source_fields: &[String], destination_fields: &[FieldDefinition]) -> Vec<Suggestion> {
    destination_fields
        .iter()
        .filter_map(|dest| {
            let mut best: Option<(&str, f64)> = None;
            for source in source_fields {
                if let Some(s) = score(source, dest) {
                    if best.map_or(true, |(_, b)| s > b) {
                        best = Some((source.as_str(), s));
                    }
                }
            }
            best.map(|(source, confidence)| Suggestion::new(source, &dest.name, confidence))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldCatalog;

    fn sources(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("PFA_ID"), "pfaid");
        assert_eq!(normalize("Original - Start"), "originalstart");
    }

    #[test]
    fn test_scores() {
        let catalog = FieldCatalog::builtin();
        let fields = catalog.get_fields("PFA").unwrap();
        let suggestions = heuristic_suggestions(&sources(&["PFA_ID", "DOR", "Monthly Rate", "Funds"]), fields);

        let find = |dest: &str| suggestions.iter().find(|s| s.destination == dest).map(|s| (s.source.as_str(), s.confidence));
        assert_eq!(find("pfaId"), Some(("PFA_ID", NAME_MATCH)));
        assert_eq!(find("dor"), Some(("DOR", NAME_MATCH)));
        assert_eq!(find("monthlyRate"), Some(("Monthly Rate", NAME_MATCH)));
        assert!(find("category").is_none());
    }

    #[test]
    fn test_label_match() {
        let fields = vec![FieldDefinition::new("areaSilo", "Area Silo", crate::models::DataType::String)];
        let suggestions = heuristic_suggestions(&sources(&["area-silo"]), &fields);
        assert_eq!(suggestions[0].confidence, NAME_MATCH);

        let fields = vec![FieldDefinition::new("loc", "Site Location", crate::models::DataType::String)];
        let suggestions = heuristic_suggestions(&sources(&["SITE_LOCATION"]), &fields);
        assert_eq!(suggestions[0].confidence, LABEL_MATCH);
    }

    #[test]
    fn test_best_source_wins_once_per_destination() {
        let fields = vec![FieldDefinition::new("model", "Model", crate::models::DataType::String)];
        let suggestions = heuristic_suggestions(&sources(&["ModelNumber", "Model"]), &fields);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].source, "Model");
        assert_eq!(suggestions[0].confidence, NAME_MATCH);
    }

    #[test]
    fn test_partial_match() {
        let fields = vec![FieldDefinition::new("manufacturer", "Manufacturer", crate::models::DataType::String)];
        let suggestions = heuristic_suggestions(&sources(&["EQUIP_MANUFACTURER"]), &fields);
        assert_eq!(suggestions[0].confidence, PARTIAL_MATCH);
    }

    #[test]
    fn test_empty_source_ignored() {
        let fields = vec![FieldDefinition::new("notes", "Notes", crate::models::DataType::String)];
        assert!(heuristic_suggestions(&sources(&["", "__"]), &fields).is_empty());
    }
}
