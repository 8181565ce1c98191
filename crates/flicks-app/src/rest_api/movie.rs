use axum::{
    response::IntoResponse,
    routing::{get, post},
    Json,
};
use flicks_dal::movie::{CreateMovie, MovieRepository};
use http::{header, StatusCode};
use serde::Serialize;
use serde_json::json;

use crate::{
    error::ApiResult,
    extract::{ExpectedVersion, JsonBody, RawBody, RecordId},
    mutation::patch_movie,
    state::AppState,
    validate::Garde,
};

crate::repository_from_request!(MovieRepository);

#[derive(Debug, Serialize)]
pub struct MovieEnvelope<T> {
    pub movie: T,
}

pub async fn create(
    repository: MovieRepository,
    Garde(JsonBody(payload)): Garde<JsonBody<CreateMovie>>,
) -> ApiResult<impl IntoResponse> {
    let movie = repository.create(payload).await?;
    let location = format!("/v1/movies/{}", movie.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(MovieEnvelope { movie }),
    ))
}

pub async fn show(id: RecordId, repository: MovieRepository) -> ApiResult<impl IntoResponse> {
    let movie = repository.get(id.0).await?;

    Ok((StatusCode::OK, Json(MovieEnvelope { movie })))
}

/// PATCH: the body is taken raw and decoded only after the record was
/// fetched and the expected version checked.
pub async fn update(
    id: RecordId,
    expected_version: ExpectedVersion,
    repository: MovieRepository,
    RawBody(body): RawBody,
) -> ApiResult<impl IntoResponse> {
    let movie = patch_movie(&repository, id, expected_version.as_deref(), &body).await?;

    Ok((StatusCode::OK, Json(MovieEnvelope { movie })))
}

pub async fn delete(id: RecordId, repository: MovieRepository) -> ApiResult<impl IntoResponse> {
    repository.delete(id.0).await?;

    Ok((
        StatusCode::OK,
        Json(json!({"message": "movie successfully deleted"})),
    ))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(create))
        .route("/{id}", get(show).patch(update).delete(delete))
}
