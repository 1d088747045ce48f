use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "app": state.config.app_name,
        "environment": state.config.environment,
        "now": Utc::now().to_rfc3339(),
    }))
}
