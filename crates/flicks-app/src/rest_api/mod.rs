pub mod health;
pub mod movie;

use axum::response::IntoResponse;

use crate::error::ApiError;

/// Fallback for unknown routes, answers with the regular error envelope.
pub async fn not_found() -> impl IntoResponse {
    ApiError::NotFound
}
