use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::database::DrinkStore;
use crate::error::ApiError;

/// GET /health - liveness plus a store round trip, no auth
pub async fn health(State(store): State<Arc<dyn DrinkStore>>) -> Result<Json<Value>, ApiError> {
    store.ping().await.map_err(|e| {
        tracing::warn!("Health check failed: {}", e);
        ApiError::service_unavailable("database unavailable")
    })?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "database": "ok"
        }
    })))
}
