use axum::{extract::State, response::IntoResponse, routing::get, Json};
use serde_json::json;

use crate::state::AppState;

pub async fn healthcheck(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.config();
    Json(json!({
        "status": "available",
        "system_info": {
            "environment": config.env,
            "version": config.version,
        }
    }))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/", get(healthcheck))
}
