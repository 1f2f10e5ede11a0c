//! Preview - run a mapping set over sample source rows.
//!
//! Every mapping is applied to every row. A failing cell is recorded and the
//! rest of the row (and the batch) keeps going, so one bad value never hides
//! the others.

use serde::Serialize;
use serde_json::{Map, Value};

use super::executor::apply_checked;
use crate::models::{FieldMapping, MappingSet};

/// Result of previewing a mapping set
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    /// One output object per input row, keyed by destination field.
    /// Skipped rows hold `null` so indexes match the input.
    pub rows: Vec<Value>,
    /// Cells that failed to transform
    pub failures: Vec<CellFailure>,
    /// Rows that were not JSON objects
    pub skipped: Vec<SkippedRow>,
}

/// A cell that failed to transform
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellFailure {
    pub row: usize,
    pub source_field: String,
    pub destination_field: String,
    pub message: String,
}

/// A row that could not be read
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: String,
}

impl PreviewResult {
    /// True when every cell transformed
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    /// Total rows seen (including skipped ones)
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of distinct rows with at least one failing cell
    pub fn failed_rows(&self) -> usize {
        let mut rows: Vec<usize> = self.failures.iter().map(|f| f.row).collect();
        rows.dedup();
        rows.len() + self.skipped.len()
    }

    /// e.g. "2 of 10 rows failed to transform"
    pub fn summary(&self) -> String {
        format!(
            "{} of {} rows failed to transform",
            self.failed_rows(),
            self.total_rows()
        )
    }

    /// Failures for one row
    pub fn failures_for(&self, row: usize) -> impl Iterator<Item = &CellFailure> {
        self.failures.iter().filter(move |f| f.row == row)
    }
}

/// Apply every mapping of `set` to each row.
///
/// Source columns missing from a row read as `null`. Failed cells are left out
/// of the output row.
pub fn preview(set: &MappingSet, rows: &[Value]) -> PreviewResult {
    let mut result = PreviewResult::default();

    for (row_idx, row) in rows.iter().enumerate() {
        let Some(row_obj) = row.as_object() else {
            result.skipped.push(SkippedRow {
                row: row_idx,
                reason: "Row is not a JSON object".to_string(),
            });
            result.rows.push(Value::Null);
            continue;
        };

        let mut output = Map::new();
        for mapping in &set.mappings {
            match transform_cell(row_obj, mapping) {
                Ok(value) => {
                    output.insert(mapping.destination_field.clone(), value);
                }
                Err(message) => result.failures.push(CellFailure {
                    row: row_idx,
                    source_field: mapping.source_field.clone(),
                    destination_field: mapping.destination_field.clone(),
                    message,
                }),
            }
        }
        result.rows.push(Value::Object(output));
    }

    result
}

fn transform_cell(row: &Map<String, Value>, mapping: &FieldMapping) -> Result<Value, String> {
    let raw = row.get(&mapping.source_field).unwrap_or(&Value::Null);
    apply_checked(mapping.transform_type, mapping.transform_params.as_ref(), raw).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, FieldMapping};
    use crate::transform::kinds::TransformKind;
    use serde_json::json;

    fn sample_set() -> MappingSet {
        let mut factor = Map::new();
        factor.insert("factor".into(), json!(12));
        MappingSet {
            name: "pfa".into(),
            direction: Direction::Import,
            entity: "PFA".into(),
            endpoint_id: None,
            mappings: vec![
                FieldMapping::new("ID", "pfaId", "string").with_transform(TransformKind::Trim),
                FieldMapping::new("Rate", "monthlyRate", "number")
                    .with_transform(TransformKind::Multiply)
                    .with_params(factor),
                FieldMapping::new("Actual", "isActualized", "boolean").with_transform(TransformKind::EqualsY),
            ],
        }
    }

    #[test]
    fn test_preview_transforms_rows() {
        let rows = vec![json!({"ID": " P-1 ", "Rate": "10", "Actual": "y"})];
        let result = preview(&sample_set(), &rows);

        assert!(result.is_ok());
        assert_eq!(result.rows[0]["pfaId"], "P-1");
        assert_eq!(result.rows[0]["monthlyRate"], 120);
        assert_eq!(result.rows[0]["isActualized"], true);
    }

    #[test]
    fn test_bad_cell_does_not_abort_batch() {
        let rows = vec![
            json!({"ID": "P-1", "Rate": "abc", "Actual": "N"}),
            json!({"ID": "P-2", "Rate": "5", "Actual": "Y"}),
        ];
        let result = preview(&sample_set(), &rows);

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].row, 0);
        assert_eq!(result.failures[0].destination_field, "monthlyRate");
        assert_eq!(result.rows[0]["pfaId"], "P-1");
        assert!(result.rows[0].get("monthlyRate").is_none());
        assert_eq!(result.rows[1]["monthlyRate"], 60);
        assert_eq!(result.summary(), "1 of 2 rows failed to transform");
    }

    #[test]
    fn test_missing_column_reads_as_null() {
        let rows = vec![json!({"ID": "P-1"})];
        let result = preview(&sample_set(), &rows);

        assert_eq!(result.rows[0]["isActualized"], false);
        assert_eq!(result.failures_for(0).count(), 1);
    }

    #[test]
    fn test_non_object_rows_skipped() {
        let rows = vec![json!([1, 2]), json!({"ID": "x", "Rate": 1, "Actual": "n"})];
        let result = preview(&sample_set(), &rows);

        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.rows.len(), 2);
        assert!(result.rows[0].is_null());
        assert_eq!(result.summary(), "1 of 2 rows failed to transform");
    }

    #[test]
    fn test_failures_line_up_after_skipped_row() {
        let rows = vec![
            json!("not a row"),
            json!({"ID": "P-1", "Rate": "5", "Actual": "Y"}),
            json!({"ID": "P-2", "Rate": "abc", "Actual": "N"}),
        ];
        let result = preview(&sample_set(), &rows);

        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.failures_for(2).count(), 1);
        assert!(result.rows[2].get("monthlyRate").is_none());
        assert_eq!(result.rows[2]["pfaId"], "P-2");
        assert_eq!(result.rows[1]["monthlyRate"], 60);
        assert_eq!(result.summary(), "2 of 3 rows failed to transform");
    }
}
