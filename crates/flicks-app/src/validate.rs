use axum::extract::{FromRequest, Request};
use garde::Validate;
use std::ops::Deref;

use crate::error::{ApiError, ApiResult};

/// Validates `value`, collecting every violated field into one
/// [`ApiError::Validation`].
pub fn validate<T>(value: &T) -> ApiResult<()>
where
    T: Validate<Context = ()>,
{
    value.validate().map_err(ApiError::from)
}

/// Extractor wrapper that validates whatever the inner extractor produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct Garde<E>(pub E);

impl<S, Extractor, T> FromRequest<S> for Garde<Extractor>
where
    S: Send + Sync,
    T: Validate<Context = ()>,
    Extractor: Deref<Target = T> + FromRequest<S>,
    ApiError: From<<Extractor as FromRequest<S>>::Rejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let inner = Extractor::from_request(req, state).await?;
        validate(inner.deref())?;
        Ok(Garde(inner))
    }
}
