//! HTTP server for the mapping engine.
//!
//! # API Endpoints
//!
//! | Method | Path                            | Description                              |
//! |--------|---------------------------------|------------------------------------------|
//! | GET    | `/health`                       | Health check                             |
//! | GET    | `/api/entities`                 | Entity names                             |
//! | GET    | `/api/entities/{entity}/fields` | Destination fields (falls back)          |
//! | GET    | `/api/transforms`               | Transform kinds and parameter schemas    |
//! | POST   | `/api/mappings/validate`        | Validation report for a set              |
//! | GET    | `/api/mappings`                 | Saved configurations                     |
//! | POST   | `/api/mappings`                 | Save (422 when required fields missing)  |
//! | GET    | `/api/mappings/{id}`            | One configuration                        |
//! | PUT    | `/api/mappings/{id}`            | Replace a configuration                  |
//! | DELETE | `/api/mappings/{id}`            | Delete a configuration                   |
//! | GET    | `/api/mappings/{id}/export`     | Delimited text                           |
//! | POST   | `/api/mappings/import`          | Delimited text to a set                  |
//! | POST   | `/api/preview`                  | Run a set over sample rows               |
//! | POST   | `/api/automap`                  | Suggestions and the set they produce     |
//! | GET    | `/api/logs`                     | SSE stream of log entries                |

use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, log_warning, LOG_BROADCASTER};
use super::state::AppState;
use super::types::{
    AutomapBody, AutomapResponse, EntityFieldsResponse, ImportRequest, ImportResponse, MappingsQuery,
    PreviewRequest, PreviewResponse, SuggestionSource, TransformInfo,
};
use crate::automap::AutomapRequest;
use crate::catalog::CatalogLookup;
use crate::config::DEFAULT_PREVIEW_ROWS;
use crate::error::{ServerError, ServerResult};
use crate::models::MappingSet;
use crate::parser;
use crate::registry::StoredConfig;
use crate::transform::{preview, transform_kinds};
use crate::validation::{self, parse_document, ValidationReport};

/// Router with every endpoint, bound to `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/entities", get(list_entities))
        .route("/api/entities/{entity}/fields", get(entity_fields))
        .route("/api/transforms", get(list_transforms))
        .route("/api/mappings/validate", post(validate_mapping))
        .route("/api/mappings/import", post(import_mapping))
        .route("/api/mappings", get(list_mappings).post(save_mapping))
        .route(
            "/api/mappings/{id}",
            get(get_mapping).put(update_mapping).delete(delete_mapping),
        )
        .route("/api/mappings/{id}/export", get(export_mapping))
        .route("/api/preview", post(preview_mapping))
        .route("/api/automap", post(automap))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process stops.
pub async fn start_server(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let port = state.settings.port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("🚀 Fieldmap server running on http://localhost:{}", port);
    println!("   Registry: {}", state.settings.registry_dir.display());
    println!(
        "   Automap:  {}",
        if state.automap.is_some() { "AI + heuristic" } else { "heuristic only" }
    );
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn lookup<'a>(state: &'a AppState, entity: &str) -> ServerResult<CatalogLookup<'a>> {
    state
        .catalog
        .fields_or_default(entity)
        .ok_or_else(|| ServerError::NotFound(format!("Unknown entity: {}", entity)))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "fieldmap",
        "version": env!("CARGO_PKG_VERSION"),
        "automap": if state.automap.is_some() { "ai" } else { "heuristic" },
    }))
}

async fn list_entities(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "entities": state.catalog.entities(),
        "default": state.catalog.default_entity(),
    }))
}

async fn entity_fields(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
) -> ServerResult<Json<EntityFieldsResponse>> {
    let found = lookup(&state, &entity)?;
    if found.fallback {
        log_warning(format!("Unknown entity '{}', using {} fields", entity, found.entity));
    }
    Ok(Json(EntityFieldsResponse {
        entity: found.entity.to_string(),
        fields: found.fields.to_vec(),
        fallback: found.fallback,
    }))
}

async fn list_transforms() -> Json<Vec<TransformInfo>> {
    Json(
        transform_kinds()
            .into_iter()
            .map(|info| TransformInfo {
                kind: info.kind,
                label: info.label,
                has_params: info.has_params,
                params: info.kind.param_schema(),
            })
            .collect(),
    )
}

async fn validate_mapping(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ServerResult<Json<ValidationReport>> {
    let set = parse_document(body)?;
    let found = lookup(&state, &set.entity)?;
    Ok(Json(validation::report(&set, found.fields)))
}

async fn list_mappings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MappingsQuery>,
) -> Json<Vec<StoredConfig>> {
    let registry = state.registry.read().await;
    let configs = match (query.direction, query.entity.as_deref()) {
        (Some(direction), Some(entity)) => registry
            .find(direction, entity, query.endpoint_id.as_deref())
            .into_iter()
            .cloned()
            .collect(),
        _ => registry.list().into_iter().cloned().collect(),
    };
    Json(configs)
}

async fn save_mapping(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ServerResult<impl IntoResponse> {
    let set = parse_document(body)?;
    let found = lookup(&state, &set.entity)?;

    let mut registry = state.registry.write().await;
    let id = registry.save(set, found.fields)?;
    let stored = registry.get(&id)?.clone();
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_mapping(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ServerResult<Json<StoredConfig>> {
    let registry = state.registry.read().await;
    Ok(Json(registry.get(&id)?.clone()))
}

async fn update_mapping(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ServerResult<Json<StoredConfig>> {
    let set = parse_document(body)?;
    let found = lookup(&state, &set.entity)?;

    let mut registry = state.registry.write().await;
    let stored = registry.update(&id, set, found.fields)?;
    Ok(Json(stored.clone()))
}

async fn delete_mapping(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    state.registry.write().await.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn export_mapping(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let text = state.registry.read().await.export_text(&id)?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], text))
}

async fn import_mapping(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ImportRequest>,
) -> ServerResult<Json<ImportResponse>> {
    let found = lookup(&state, &body.entity)?;

    let mut set = MappingSet::create(body.direction, &body.entity, body.endpoint_id.as_deref());
    if let Some(name) = &body.name {
        set = set.with_name(name);
    }
    let outcome = set
        .import_from_delimited(&body.text)
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;
    log_info(outcome.summary());

    let report = validation::report(&set, found.fields);
    Ok(Json(ImportResponse {
        config: set,
        imported: outcome.imported,
        errors: outcome.errors,
        report,
    }))
}

async fn preview_mapping(Json(body): Json<PreviewRequest>) -> ServerResult<Json<PreviewResponse>> {
    let rows = match (body.rows, body.csv) {
        (Some(rows), _) => rows,
        (None, Some(csv)) => {
            parser::parse_bytes(csv.as_bytes())
                .map_err(|e| ServerError::BadRequest(e.to_string()))?
                .records
        }
        (None, None) => return Err(ServerError::BadRequest("Provide rows or csv".to_string())),
    };

    let limit = body.limit.unwrap_or(DEFAULT_PREVIEW_ROWS);
    let result = preview(&body.config, &rows[..limit.min(rows.len())]);
    if !result.is_ok() {
        log_warning(format!("Preview of '{}': {}", body.config.entity, result.summary()));
    }

    Ok(Json(PreviewResponse {
        summary: result.summary(),
        result,
    }))
}

async fn automap(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AutomapBody>,
) -> ServerResult<Json<AutomapResponse>> {
    let found = lookup(&state, &body.entity)?;
    let request = AutomapRequest {
        source_fields: body.source_fields,
        destination_fields: found.fields.to_vec(),
        entity: found.entity.to_string(),
        sample_data: body.sample_data,
    };

    let (source, suggestions) = match (&state.automap, body.heuristic) {
        (Some(client), false) => match client.suggest(&request).await {
            Ok(suggestions) => (SuggestionSource::Ai, suggestions),
            Err(e) => {
                log_warning(format!("AI automap failed, using name matching: {}", e));
                (SuggestionSource::Heuristic, request.heuristic())
            }
        },
        _ => (SuggestionSource::Heuristic, request.heuristic()),
    };

    let threshold = body.threshold.unwrap_or(state.settings.confidence_threshold);
    let mut set = MappingSet::create(body.direction, &body.entity, body.endpoint_id.as_deref());
    set.apply_suggestions(&suggestions, threshold, found.fields);
    let report = validation::report(&set, found.fields);

    Ok(Json(AutomapResponse {
        source,
        suggestions,
        config: set,
        report,
        fallback: found.fallback,
    }))
}

/// SSE endpoint for log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(LOG_BROADCASTER.subscribe()).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldCatalog;
    use crate::config::Settings;
    use crate::registry::ConfigRegistry;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app() -> (Router, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::default().with_registry_dir(dir.path());
        let state = AppState::new(
            settings,
            FieldCatalog::builtin(),
            ConfigRegistry::with_dir(dir.path()),
            None,
        );
        (router(state.shared()), dir)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn asset_doc(mappings: &[(&str, &str)]) -> Value {
        json!({
            "name": "Asset feed",
            "direction": "import",
            "entity": "Asset",
            "endpointId": "ep-1",
            "mappings": mappings.iter().map(|(s, d)| json!({
                "id": format!("{}-{}", s, d),
                "sourceField": s,
                "destinationField": d,
                "dataType": "string",
                "transformType": "direct"
            })).collect::<Vec<_>>()
        })
    }

    fn complete_asset_doc() -> Value {
        asset_doc(&[("TAG", "assetTag"), ("DESC", "description"), ("CAT", "category")])
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _dir) = test_app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["automap"], "heuristic");
    }

    #[tokio::test]
    async fn test_entity_fields_and_fallback() {
        let (app, _dir) = test_app();
        let (status, body) = send(&app, "GET", "/api/entities/asset/fields", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entity"], "Asset");
        assert_eq!(body["fallback"], false);

        let (_, body) = send(&app, "GET", "/api/entities/Unknown/fields", None).await;
        assert_eq!(body["entity"], "PFA");
        assert_eq!(body["fallback"], true);
        assert_eq!(body["fields"][0]["name"], "pfaId");
    }

    #[tokio::test]
    async fn test_transforms_listing() {
        let (app, _dir) = test_app();
        let (_, body) = send(&app, "GET", "/api/transforms", None).await;
        let kinds = body.as_array().unwrap();
        assert_eq!(kinds.len(), 13);
        let divide = kinds.iter().find(|k| k["kind"] == "divide").unwrap();
        assert_eq!(divide["hasParams"], true);
        assert_eq!(divide["params"]["params"][0]["name"], "divisor");
    }

    #[tokio::test]
    async fn test_save_blocked_lists_missing_labels() {
        let (app, _dir) = test_app();
        let (status, body) = send(&app, "POST", "/api/mappings", Some(asset_doc(&[("TAG", "assetTag")]))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["missing"], json!(["Description", "Category"]));
    }

    #[tokio::test]
    async fn test_save_get_export_delete() {
        let (app, _dir) = test_app();
        let (status, body) = send(&app, "POST", "/api/mappings", Some(complete_asset_doc())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, "GET", &format!("/api/mappings/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["config"]["mappings"].as_array().unwrap().len(), 3);

        let (_, list) = send(&app, "GET", "/api/mappings?direction=import&entity=asset&endpointId=ep-1", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let request = Request::builder()
            .uri(format!("/api/mappings/{}/export", id))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&text).contains("TAG,assetTag,string,direct"));

        let (status, _) = send(&app, "DELETE", &format!("/api/mappings/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/api/mappings/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let (app, _dir) = test_app();
        let (status, _) = send(&app, "PUT", "/api/mappings/missing", Some(complete_asset_doc())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validate_report() {
        let (app, _dir) = test_app();
        let (status, body) = send(&app, "POST", "/api/mappings/validate", Some(asset_doc(&[("X", "bogus")]))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["missingRequired"], json!(["Asset Tag", "Description", "Category"]));
        assert_eq!(body["unknownDestinations"], json!(["bogus"]));
    }

    #[tokio::test]
    async fn test_schema_violation_rejected() {
        let (app, _dir) = test_app();
        let (status, body) = send(&app, "POST", "/api/mappings/validate", Some(json!({"entity": "PFA"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"].as_array().is_some());
    }

    #[tokio::test]
    async fn test_import_reports_bad_lines() {
        let (app, _dir) = test_app();
        let body = json!({
            "text": "sourceField,destinationField,dataType,transformType\nTAG,assetTag,string,trim\nX,description,string,explode\n",
            "direction": "import",
            "entity": "Asset"
        });
        let (status, body) = send(&app, "POST", "/api/mappings/import", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], 1);
        assert_eq!(body["errors"][0]["line"], 3);
        assert_eq!(body["config"]["mappings"][0]["transformType"], "trim");
    }

    #[tokio::test]
    async fn test_preview_from_csv() {
        let (app, _dir) = test_app();
        let mut config = asset_doc(&[("TAG", "assetTag")]);
        config["mappings"][0]["transformType"] = json!("uppercase");
        let body = json!({ "config": config, "csv": "TAG;DESC\ncr-1;Crane\ncr-2;Truck\n" });

        let (status, body) = send(&app, "POST", "/api/preview", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rows"][1]["assetTag"], "CR-2");
        assert_eq!(body["summary"], "0 of 2 rows failed to transform");
    }

    #[tokio::test]
    async fn test_preview_requires_rows() {
        let (app, _dir) = test_app();
        let body = json!({ "config": complete_asset_doc() });
        let (status, _) = send(&app, "POST", "/api/preview", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_automap_heuristic_without_client() {
        let (app, _dir) = test_app();
        let body = json!({
            "entity": "Asset",
            "sourceFields": ["Asset_Tag", "Description", "Misc"]
        });
        let (status, body) = send(&app, "POST", "/api/automap", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "heuristic");
        assert_eq!(body["config"]["mappings"].as_array().unwrap().len(), 2);
        assert_eq!(body["report"]["missingRequired"], json!(["Category"]));
    }
}
