use axum::Json;
use serde_json::{json, Value};

/// Liveness probe. Always `200 {"ok":true}`, whatever the configuration.
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}
