//! Mapping sets and their editing surfaces.
//!
//! - [`set`] - binding, transform and suggestion operations on a [`MappingSet`](crate::models::MappingSet)
//! - [`delimited`] - comma-separated import/export
//! - [`editor`] - a set plus its catalog, with live validation

pub mod delimited;
pub mod editor;
pub mod set;

pub use delimited::{
    export_to_delimited, Column, DelimitedColumns, ImportLineError, ImportOutcome, DELIMITER, HEADER,
};
pub use editor::{BindingSink, MappingEditor, RequestTicket};
pub use set::DEFAULT_CONFIDENCE_THRESHOLD;
