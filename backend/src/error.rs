//! Error types for the field mapping engine.
//!
//! One enum per concern:
//!
//! - [`CatalogError`] - Field catalog lookups
//! - [`MappingError`] - Malformed bindings (drag/drop payloads)
//! - [`DelimitedError`] - Delimited mapping import
//! - [`TransformError`] - Transform parameters and execution
//! - [`ValidationError`] - Save gate and document schema checks
//! - [`SampleError`] - Sample data files
//! - [`RegistryError`] - Saved configuration store
//! - [`AiError`] - Automap client
//! - [`ServerError`] - HTTP layer
//!
//! `From` conversions let `?` cross module boundaries.

use thiserror::Error;

// =============================================================================
// Catalog Errors
// =============================================================================

/// Errors from the field catalog.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    /// No catalog registered for this entity.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// A custom catalog could not be loaded.
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),
}

// =============================================================================
// Mapping Errors
// =============================================================================

/// Errors from mapping set mutations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    /// A binding must carry both a source and a destination field.
    #[error("Invalid binding: {reason}")]
    InvalidBinding { reason: String },
}

// =============================================================================
// Delimited Import Errors
// =============================================================================

/// Errors while importing delimited mapping text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DelimitedError {
    /// No lines at all, not even a header.
    #[error("Mapping text is empty")]
    EmptyInput,

    /// A single data line could not be turned into a mapping.
    #[error("Line {line}: {message}")]
    Line { line: usize, message: String },
}

// =============================================================================
// Transform Errors
// =============================================================================

/// Errors from the transform catalog and executor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// Parameters missing, mistyped, or unusable for this value.
    #[error("Invalid parameters for '{kind}': {message}")]
    InvalidParams { kind: String, message: String },

    /// Value could not be read as a date.
    #[error("Invalid date '{value}' for format '{format}'")]
    InvalidDate { value: String, format: String },

    /// Transform name not in the catalog.
    #[error("Unknown transform: {0}")]
    UnknownTransform(String),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors raised when a mapping set may not be saved.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Required destination fields have no mapping.
    #[error("Missing required fields: {}", labels.join(", "))]
    MissingRequired { labels: Vec<String> },

    /// The persisted document does not match the schema.
    #[error("Schema validation failed: {errors:?}")]
    SchemaError { errors: Vec<String> },
}

// =============================================================================
// Sample Data Errors
// =============================================================================

/// Errors while reading sample source data.
#[derive(Debug, Error)]
pub enum SampleError {
    /// No header line.
    #[error("Sample data is empty")]
    Empty,

    /// File could not be read.
    #[error("Cannot read sample file: {0}")]
    Io(#[from] std::io::Error),

    /// Bytes could not be decoded with the detected encoding.
    #[error("Cannot decode sample as {encoding}")]
    Decode { encoding: String },
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors from the saved configuration registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Configuration not found.
    #[error("Configuration not found: {0}")]
    NotFound(String),

    /// Save refused because the set is incomplete.
    #[error("Save blocked: {0}")]
    Blocked(#[from] ValidationError),

    /// Stored data is not a valid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error.
    #[error("Registry IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Registry JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// AI Client Errors
// =============================================================================

/// Errors from the automap client.
#[derive(Debug, Error)]
pub enum AiError {
    /// Missing API key.
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Provider returned an error body.
    #[error("API error: {0}")]
    ApiError(String),

    /// Response was not valid JSON.
    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    /// JSON did not contain suggestions.
    #[error("Failed to parse suggestions: {0}")]
    ParseError(String),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP layer errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid request payload.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request understood but refused (blocked save).
    #[error("Unprocessable: {0}")]
    Unprocessable(#[from] ValidationError),

    /// Registry failure.
    #[error("Registry error: {0}")]
    Registry(RegistryError),

    /// Automap failure.
    #[error("Automap error: {0}")]
    Ai(#[from] AiError),

    /// Anything else.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<RegistryError> for ServerError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => ServerError::NotFound(id),
            RegistryError::Blocked(v) => ServerError::Unprocessable(v),
            other => ServerError::Registry(other),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for catalog lookups.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for sample data parsing.
pub type SampleResult<T> = Result<T, SampleError>;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for automap operations.
pub type AiResult<T> = Result<T, AiError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_maps_to_server_status_variants() {
        let err: ServerError = RegistryError::NotFound("abc".into()).into();
        assert!(matches!(err, ServerError::NotFound(ref id) if id == "abc"));

        let blocked = RegistryError::Blocked(ValidationError::MissingRequired {
            labels: vec!["PFA ID".into()],
        });
        let err: ServerError = blocked.into();
        assert!(matches!(err, ServerError::Unprocessable(_)));
    }

    #[test]
    fn test_missing_required_lists_labels() {
        let err = ValidationError::MissingRequired {
            labels: vec!["Class".into(), "Source".into()],
        };
        assert_eq!(err.to_string(), "Missing required fields: Class, Source");
    }

    #[test]
    fn test_transform_error_format() {
        let err = TransformError::InvalidParams {
            kind: "divide".into(),
            message: "divisor must not be zero".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("divide"));
        assert!(msg.contains("divisor must not be zero"));
    }
}
