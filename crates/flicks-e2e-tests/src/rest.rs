use anyhow::Result;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::info;

use crate::extend_url;

pub fn movies_url(base_url: &Url) -> Result<Url> {
    Ok(base_url.join("v1/movies")?)
}

pub fn movie_url(base_url: &Url, id: i64) -> Result<Url> {
    extend_url(&movies_url(base_url)?, id)
}

/// Posts a movie and returns the `movie` object from the response.
pub async fn create_movie(client: &reqwest::Client, base_url: &Url, payload: &Value) -> Result<Value> {
    let response = client
        .post(movies_url(base_url)?)
        .json(payload)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body: Value = response.json().await?;
    let movie = body["movie"].clone();
    assert_eq!(
        location.as_deref(),
        Some(format!("/v1/movies/{}", movie["id"]).as_str())
    );
    info!("Created movie {}", movie["id"]);
    Ok(movie)
}

pub async fn get_movie(
    client: &reqwest::Client,
    base_url: &Url,
    id: i64,
) -> Result<(StatusCode, Value)> {
    let response = client.get(movie_url(base_url, id)?).send().await?;
    let status = response.status();
    let body: Value = response.json().await?;
    Ok((status, body))
}

/// Sends a PATCH with a raw body, optionally guarded by `X-Expected-Version`.
pub async fn patch_movie(
    client: &reqwest::Client,
    base_url: &Url,
    id: i64,
    expected_version: Option<&str>,
    body: impl Into<reqwest::Body>,
) -> Result<(StatusCode, Value)> {
    let mut request = client
        .patch(movie_url(base_url, id)?)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body);
    if let Some(version) = expected_version {
        request = request.header("X-Expected-Version", version);
    }
    let response = request.send().await?;
    let status = response.status();
    let body: Value = response.json().await?;
    Ok((status, body))
}

pub async fn delete_movie(
    client: &reqwest::Client,
    base_url: &Url,
    id: i64,
) -> Result<(StatusCode, Value)> {
    let response = client.delete(movie_url(base_url, id)?).send().await?;
    let status = response.status();
    let body: Value = response.json().await?;
    Ok((status, body))
}
