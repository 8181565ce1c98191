use std::ops::Deref;

use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use bytes::Bytes;
use http::request::Parts;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::{ApiError, ApiResult};

pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

/// Largest accepted request body.
pub const MAX_BODY_SIZE: usize = 1_048_576;

/// Decodes a JSON document, mapping serde failures to a readable
/// [`ApiError::Format`].
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::Format("body must not be empty".to_string()));
    }
    serde_json::from_slice(body).map_err(|e| {
        let msg = match e.classify() {
            Category::Syntax if e.to_string().starts_with("trailing characters") => {
                "body must only contain a single JSON value".to_string()
            }
            Category::Syntax => format!(
                "body contains badly-formed JSON (at line {} column {})",
                e.line(),
                e.column()
            ),
            Category::Eof => "body contains badly-formed JSON".to_string(),
            Category::Data => format!("body contains invalid data: {e}"),
            Category::Io => format!("unable to read body: {e}"),
        };
        ApiError::Format(msg)
    })
}

/// JSON body extractor that reports every decode problem as a 400.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T> Deref for JsonBody<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let RawBody(body) = RawBody::from_request(req, state).await?;
        decode_json(&body).map(JsonBody)
    }
}

/// Undecoded request body, for handlers that decode it later.
#[derive(Debug, Clone)]
pub struct RawBody(pub Bytes);

impl<S> FromRequest<S> for RawBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|e| {
            if e.status() == http::StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::Format(format!(
                    "body must not be larger than {MAX_BODY_SIZE} bytes"
                ))
            } else {
                ApiError::Format(e.body_text())
            }
        })?;
        Ok(RawBody(body))
    }
}

/// Positive record identifier from the `{id}` path segment. Anything else is
/// reported as a missing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

impl RecordId {
    pub fn parse(raw: &str) -> ApiResult<Self> {
        match raw.parse::<i64>() {
            Ok(id) if id >= 1 => Ok(RecordId(id)),
            _ => Err(ApiError::NotFound),
        }
    }
}

impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound)?;
        RecordId::parse(&raw)
    }
}

/// Optional `X-Expected-Version` precondition, kept as opaque text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedVersion(pub Option<String>);

impl ExpectedVersion {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for ExpectedVersion
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(EXPECTED_VERSION_HEADER)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .filter(|v| !v.is_empty());
        Ok(ExpectedVersion(token))
    }
}
