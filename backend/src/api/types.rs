//! Request and response bodies of the HTTP API.
//!
//! All JSON uses camelCase keys. Errors are `{"status": "error", "error": ...}`
//! with an HTTP status derived from [`ServerError`]; blocked saves add a
//! `missing` array of field labels.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{ServerError, ValidationError};
use crate::mapping::ImportLineError;
use crate::models::{Direction, FieldDefinition, MappingSet, Suggestion};
use crate::transform::{ParamSchema, PreviewResult, TransformKind};
use crate::validation::ValidationReport;

/// `GET /api/entities/{entity}/fields`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityFieldsResponse {
    /// Entity whose fields are returned (the default one on fallback)
    pub entity: String,
    pub fields: Vec<FieldDefinition>,
    /// Whether the requested entity was unknown
    pub fallback: bool,
}

/// One entry of `GET /api/transforms`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformInfo {
    pub kind: TransformKind,
    pub label: &'static str,
    pub has_params: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<ParamSchema>,
}

/// `POST /api/mappings/import`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub text: String,
    pub direction: Direction,
    pub entity: String,
    #[serde(default)]
    pub endpoint_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub config: MappingSet,
    pub imported: usize,
    pub errors: Vec<ImportLineError>,
    pub report: ValidationReport,
}

/// `POST /api/preview`
///
/// Rows come either as JSON objects or as raw CSV text.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub config: MappingSet,
    #[serde(default)]
    pub rows: Option<Vec<Value>>,
    #[serde(default)]
    pub csv: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    #[serde(flatten)]
    pub result: PreviewResult,
    pub summary: String,
}

/// `POST /api/automap`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomapBody {
    pub entity: String,
    pub source_fields: Vec<String>,
    #[serde(default)]
    pub sample_data: Map<String, Value>,
    #[serde(default = "default_direction")]
    pub direction: Direction,
    #[serde(default)]
    pub endpoint_id: Option<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Skip the AI client even when one is configured
    #[serde(default)]
    pub heuristic: bool,
}

fn default_direction() -> Direction {
    Direction::Import
}

/// Where suggestions came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Ai,
    Heuristic,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomapResponse {
    pub source: SuggestionSource,
    pub suggestions: Vec<Suggestion>,
    /// Set built from the suggestions above the threshold
    pub config: MappingSet,
    pub report: ValidationReport,
    pub fallback: bool,
}

/// `GET /api/mappings` filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingsQuery {
    pub direction: Option<Direction>,
    pub entity: Option<String>,
    pub endpoint_id: Option<String>,
}

/// Body for a failed request
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Ai(_) => StatusCode::BAD_GATEWAY,
            ServerError::Registry(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = error_response(&self.to_string());
        if let ServerError::Unprocessable(ValidationError::MissingRequired { labels }) = &self {
            body["missing"] = json!(labels);
        }
        if let ServerError::Unprocessable(ValidationError::SchemaError { errors }) = &self {
            body["errors"] = json!(errors);
        }
        (status, Json(body)).into_response()
    }
}
