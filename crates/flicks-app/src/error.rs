use std::collections::BTreeMap;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use tracing::{debug, error};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Field name to violation message, one entry per invalid field.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Record not found")]
    NotFound,

    #[error("Malformed request: {0}")]
    Format(String),

    #[error("Validation failed for {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
    Validation(FieldErrors),

    #[error("Edit conflict")]
    EditConflict,

    #[error("Persistence error: {0}")]
    Persistence(flicks_dal::Error),
}

impl From<flicks_dal::Error> for ApiError {
    fn from(value: flicks_dal::Error) -> Self {
        match value {
            flicks_dal::Error::RecordNotFound(what) => {
                debug!("{what} not found");
                ApiError::NotFound
            }
            flicks_dal::Error::EditConflict { id, version } => {
                debug!("Edit conflict on movie {id}, version {version} is stale");
                ApiError::EditConflict
            }
            other => ApiError::Persistence(other),
        }
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        let mut errors = FieldErrors::new();
        for (path, error) in report.iter() {
            // element errors like `genres[1]` are reported under the field
            let path = path.to_string();
            let field = path.split(['[', '.']).next().unwrap_or_default();
            errors
                .entry(field.to_string())
                .or_insert_with(|| error.message().to_string());
        }
        ApiError::Validation(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                json!({"error": "the requested resource could not be found"}),
            ),
            ApiError::Format(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Validation(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": errors }))
            }
            ApiError::EditConflict => (
                StatusCode::CONFLICT,
                json!({"error": "unable to update the record due to an edit conflict, please try again"}),
            ),
            ApiError::Persistence(e) => {
                error!("Persistence error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "the server encountered a problem and could not process your request"}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
