//! REST API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use foyer_core::{ObservedDevice, Preferences, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

fn bad_request(msg: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ApiError::new(msg))).into_response()
}

/// Map store errors onto the HTTP taxonomy: NotFound → 404,
/// InvalidInput → 400, storage failures → 500 (the in-memory mutation
/// stands; see the store contract).
fn store_error(e: StoreError) -> Response {
    let status = match &e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiError::new(e.to_string()))).into_response()
}

/// Ingest a scan batch and rebuild the served snapshot
pub async fn ingest_devices(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    // Reject non-array payloads before any side effect
    if !body.is_array() {
        return bad_request("Request body must be a JSON array of observed devices");
    }
    let batch: Vec<ObservedDevice> = match serde_json::from_value(body) {
        Ok(batch) => batch,
        Err(e) => return bad_request(format!("Malformed device batch: {e}")),
    };

    let summary = state.registry.write().await.ingest(batch);
    info!(count = summary.count, "Ingested scan batch");

    Json(json!({
        "success": true,
        "count": summary.count,
    }))
    .into_response()
}

/// Serve the current snapshot, priority-sorted
pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.registry.read().await;
    Json(registry.current().to_vec())
}

/// List the known-device catalogue in priority order
pub async fn list_known_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.registry.read().await;
    Json(registry.store().all())
}

/// Update a device's display name
pub async fn rename_device(
    State(state): State<Arc<AppState>>,
    Path(mac): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let Some(name) = body.get("name").and_then(Value::as_str) else {
        return bad_request("Request body must contain a \"name\" string");
    };

    match state.registry.write().await.store_mut().rename(&mac, name) {
        Ok(device) => {
            info!(mac = %mac, name = %device.display_name, "Device renamed");
            Json(json!({"success": true, "device": device})).into_response()
        }
        Err(e) => store_error(e),
    }
}

/// Move a device within the priority order
pub async fn reprioritize_device(
    State(state): State<Arc<AppState>>,
    Path(mac): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let Some(priority) = body.get("priority").and_then(Value::as_i64) else {
        return bad_request("Request body must contain an integer \"priority\"");
    };
    if priority < 0 {
        return bad_request("Priority must not be negative");
    }

    match state
        .registry
        .write()
        .await
        .store_mut()
        .reprioritize(&mac, priority as usize)
    {
        Ok(device) => {
            info!(mac = %mac, priority = device.priority, "Device reprioritized");
            Json(json!({
                "success": true,
                "device": device,
                "message": format!("Priority set to {}", device.priority),
            }))
            .into_response()
        }
        Err(e) => store_error(e),
    }
}

/// Shallow-merge preference updates into a device
pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Path(mac): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let Some(partial) = body.get("preferences").filter(|v| v.is_object()) else {
        return bad_request("Request body must contain a \"preferences\" object");
    };
    let partial: Preferences = match serde_json::from_value(partial.clone()) {
        Ok(p) => p,
        Err(_) => {
            return bad_request("Preference values must be strings, numbers, or booleans")
        }
    };

    match state
        .registry
        .write()
        .await
        .store_mut()
        .update_preferences(&mac, partial)
    {
        Ok(device) => {
            debug!(mac = %mac, "Preferences updated");
            Json(json!({
                "success": true,
                "device": device,
                "message": "Preferences updated",
            }))
            .into_response()
        }
        Err(e) => store_error(e),
    }
}

/// Weather query parameters
#[derive(Deserialize)]
pub struct WeatherParams {
    location: Option<String>,
}

/// Weather lookup; upstream failures degrade to a fallback payload and
/// never surface as an error response
pub async fn get_weather(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WeatherParams>,
) -> impl IntoResponse {
    let report = state.weather.lookup(params.location.as_deref()).await;
    Json(report)
}
