//! # Fieldmap - field mapping configuration engine
//!
//! Describes how named source fields are transformed and connected to the
//! typed destination fields of an entity (PFA, Asset, BEO), validates that
//! every required destination is mapped, and runs the mappings over sample
//! data.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Catalog   │────▶│ Mapping Set │────▶│  Validator  │────▶│  Registry   │
//! │ (per entity)│     │ (+ automap) │     │ (save gate) │     │  (JSON dir) │
//! └─────────────┘     └──────┬──────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │  Transform  │  preview over sample rows
//!                     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fieldmap::{Direction, FieldCatalog, MappingSet, validate};
//!
//! let catalog = FieldCatalog::builtin();
//! let fields = catalog.get_fields("PFA")?;
//!
//! let mut set = MappingSet::create(Direction::Import, "PFA", Some("endpoint-1"));
//! set.add_or_replace("PFA_ID", "pfaId", "string")?;
//! set.add_or_replace("CAT", "category", "string")?;
//!
//! let missing = validate(&set, fields);
//! println!("Cannot save yet, missing: {}", missing.join(", "));
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per concern
//! - [`config`] - Defaults and environment settings
//! - [`models`] - Field definitions, mappings, sets, suggestions
//! - [`catalog`] - Destination fields per entity
//! - [`transform`] - Transform catalog, executor and preview
//! - [`mapping`] - Set operations, delimited import/export, editor
//! - [`validation`] - Required-field gate and document schema
//! - [`parser`] - Sample CSV reader
//! - [`automap`] - Heuristic and AI suggestions
//! - [`registry`] - Saved configurations
//! - [`api`] - HTTP server and log streaming

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Catalogs
pub mod catalog;
pub mod transform;

// Mapping
pub mod mapping;
pub mod validation;

// Sample data
pub mod parser;

// Suggestions
pub mod automap;

// Persistence
pub mod registry;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    AiError, CatalogError, DelimitedError, MappingError, RegistryError, SampleError, ServerError,
    TransformError, ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    mapping_id, DataType, Direction, FieldDefinition, FieldMapping, MappingSet, SourceSample, Suggestion,
    TransformParams,
};

// =============================================================================
// Re-exports - Catalog
// =============================================================================

pub use catalog::{CatalogLookup, FieldCatalog};

// =============================================================================
// Re-exports - Transforms
// =============================================================================

pub use transform::{
    apply, apply_checked, param_schema, preview, transform_kinds, transforms_description, validate_params,
    ParamSchema, ParamSpec, PreviewResult, TransformKind,
};

// =============================================================================
// Re-exports - Mapping
// =============================================================================

pub use mapping::{
    export_to_delimited, BindingSink, ImportOutcome, MappingEditor, RequestTicket, DEFAULT_CONFIDENCE_THRESHOLD,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{ensure_saveable, validate, validate_document, ValidationReport};

// =============================================================================
// Re-exports - Sample data
// =============================================================================

pub use parser::{parse_bytes, read_sample_file, SampleData};

// =============================================================================
// Re-exports - Automap
// =============================================================================

pub use automap::{heuristic_suggestions, AutomapClient, AutomapRequest};

// =============================================================================
// Re-exports - Registry
// =============================================================================

pub use registry::{ConfigRegistry, StoredConfig};

// =============================================================================
// Re-exports - Settings
// =============================================================================

pub use config::Settings;
