//! Delimited mapping import/export.
//!
//! Format: a header row followed by one comma-separated row per mapping.
//!
//! ```text
//! sourceField,destinationField,dataType,transformType
//! PFA_ID,pfaId,string,trim
//! Start,originalStart,date,direct
//! ```
//!
//! There is no quoting or escaping: a value containing a comma splits into two
//! columns. Cells are taken verbatim, surrounding whitespace included. Existing exported files depend on this, so it stays.
//! Transform parameters are not part of the format.

use serde::Serialize;

use crate::error::DelimitedError;
use crate::models::{FieldMapping, MappingSet};
use crate::transform::TransformKind;

/// Column separator.
pub const DELIMITER: char = ',';

/// Header written by [`export_to_delimited`].
pub const HEADER: &str = "sourceField,destinationField,dataType,transformType";

/// A column of the delimited format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    SourceField,
    DestinationField,
    DataType,
    TransformType,
}

/// Expected column order of imported text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedColumns(pub Vec<Column>);

impl Default for DelimitedColumns {
    fn default() -> Self {
        Self(vec![
            Column::SourceField,
            Column::DestinationField,
            Column::DataType,
            Column::TransformType,
        ])
    }
}

impl DelimitedColumns {
    fn position(&self, column: Column) -> Option<usize> {
        self.0.iter().position(|c| *c == column)
    }
}

/// Mappings read from text plus the lines that could not be used.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub imported: usize,
    pub errors: Vec<ImportLineError>,
}

/// A data line that was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportLineError {
    /// 1-based line number in the input, header included
    pub line: usize,
    pub message: String,
}

impl From<ImportLineError> for DelimitedError {
    fn from(err: ImportLineError) -> Self {
        DelimitedError::Line {
            line: err.line,
            message: err.message,
        }
    }
}

impl ImportOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn summary(&self) -> String {
        format!("Imported {} mappings, {} lines rejected", self.imported, self.errors.len())
    }
}

impl MappingSet {
    /// Replace the mappings with those parsed from `text` (default column order).
    pub fn import_from_delimited(&mut self, text: &str) -> Result<ImportOutcome, DelimitedError> {
        self.import_with_columns(text, &DelimitedColumns::default())
    }

    /// Replace the mappings with those parsed from `text`.
    ///
    /// The first line is the header and is skipped. Blank lines are ignored.
    /// Blank or absent `dataType`/`transformType` default to `string`/`direct`.
    /// A line without source or destination, or with an unknown transform, is
    /// reported in the outcome and the rest still imports. Zero lines at all is
    /// an error; a header alone yields an empty set.
    pub fn import_with_columns(
        &mut self,
        text: &str,
        columns: &DelimitedColumns,
    ) -> Result<ImportOutcome, DelimitedError> {
        let mut lines = text.lines().enumerate();
        if lines.next().is_none() {
            return Err(DelimitedError::EmptyInput);
        }

        let mut outcome = ImportOutcome::default();
        let mut imported: Vec<FieldMapping> = Vec::new();
        let mut index = 0;

        for (line_idx, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let line_num = line_idx + 1;

            match parse_line(line, columns, index) {
                Ok(mapping) => {
                    imported.retain(|m| m.destination_field != mapping.destination_field);
                    imported.push(mapping);
                }
                Err(message) => outcome.errors.push(ImportLineError { line: line_num, message }),
            }
            index += 1;
        }

        outcome.imported = imported.len();
        self.mappings = imported;
        Ok(outcome)
    }

    /// Import that fails on the first rejected line instead of reporting it.
    pub fn import_strict(&mut self, text: &str) -> Result<ImportOutcome, DelimitedError> {
        let mut scratch = self.clone();
        let outcome = scratch.import_from_delimited(text)?;
        if let Some(first) = outcome.errors.first() {
            return Err(first.clone().into());
        }
        self.mappings = scratch.mappings;
        Ok(outcome)
    }

    /// Header plus one row per mapping, in set order.
    pub fn export_to_delimited(&self) -> String {
        export_to_delimited(self)
    }
}

/// Header plus one row per mapping, in set order.
pub fn export_to_delimited(set: &MappingSet) -> String {
    let mut out = String::from(HEADER);
    for mapping in &set.mappings {
        out.push('\n');
        out.push_str(
            &[
                mapping.source_field.as_str(),
                mapping.destination_field.as_str(),
                mapping.data_type.as_str(),
                mapping.transform_type.as_str(),
            ]
            .join(","),
        );
    }
    out.push('\n');
    out
}

fn parse_line(line: &str, columns: &DelimitedColumns, index: usize) -> Result<FieldMapping, String> {
    // Cells keep their whitespace so exported names come back unchanged.
    let values: Vec<&str> = line.split(DELIMITER).collect();
    let cell = |column: Column| {
        columns
            .position(column)
            .and_then(|i| values.get(i).copied())
            .unwrap_or("")
    };

    let source = cell(Column::SourceField);
    let destination = cell(Column::DestinationField);
    if source.trim().is_empty() {
        return Err("source field is missing".to_string());
    }
    if destination.trim().is_empty() {
        return Err("destination field is missing".to_string());
    }

    let data_type = match cell(Column::DataType) {
        blank if blank.trim().is_empty() => "string",
        other => other,
    };
    let transform_type = match cell(Column::TransformType).trim() {
        "" => TransformKind::Direct,
        other => other.parse::<TransformKind>().map_err(|e| e.to_string())?,
    };

    let mut mapping = FieldMapping::new(source, destination, data_type).with_transform(transform_type);
    mapping.id = format!("imported-{}", index);
    Ok(mapping)
}
