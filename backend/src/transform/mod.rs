//! Transformation module.
//!
//! - Kinds: transform catalog and parameter schemas
//! - Executor: apply one transform to one value
//! - Preview: run a mapping set over sample rows

pub mod executor;
pub mod kinds;
pub mod preview;

pub use executor::{apply, apply_checked, stringify};
pub use kinds::{
    param_schema, transform_kinds, transforms_description, validate_params, ParamSchema, ParamSpec,
    ParamType, TransformKind, TransformKindInfo,
};
pub use preview::{preview, CellFailure, PreviewResult, SkippedRow};
