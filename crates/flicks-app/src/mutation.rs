//! Partial update of a movie under optimistic locking.
//!
//! An attempt goes `fetched -> precondition -> merged -> validated -> committed`.
//! It stops with [`ApiError::EditConflict`] when the caller's expected version
//! is stale or another writer commits first, and with
//! [`ApiError::Validation`] when the merged record is invalid. Nothing is
//! retried here; a conflicting client has to refetch and try again.

use flicks_dal::movie::{Movie, MovieRepository, UpdateMovie};
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    extract::{decode_json, RecordId},
    validate::validate,
};

pub async fn patch_movie(
    repository: &MovieRepository,
    id: RecordId,
    expected_version: Option<&str>,
    body: &[u8],
) -> ApiResult<Movie> {
    let movie = prepare_patch(repository, id, expected_version, body).await?;
    commit_patch(repository, movie).await
}

/// Fetch, precondition, merge and validate. Nothing is written.
async fn prepare_patch(
    repository: &MovieRepository,
    id: RecordId,
    expected_version: Option<&str>,
    body: &[u8],
) -> ApiResult<Movie> {
    let mut movie = repository.get(id.0).await?;

    if let Some(expected) = expected_version {
        if expected != movie.version.to_string() {
            debug!(
                "Movie {} is at version {}, client expected {expected}",
                movie.id, movie.version
            );
            return Err(ApiError::EditConflict);
        }
    }

    let patch: UpdateMovie = decode_json(body)?;
    patch.apply_to(&mut movie);
    validate(&movie)?;
    Ok(movie)
}

/// Versioned write of a prepared record; a competing commit since the fetch
/// ends in [`ApiError::EditConflict`].
async fn commit_patch(repository: &MovieRepository, mut movie: Movie) -> ApiResult<Movie> {
    movie.version = repository.update(&movie).await?;
    debug!("Movie {} updated to version {}", movie.id, movie.version);
    Ok(movie)
}
