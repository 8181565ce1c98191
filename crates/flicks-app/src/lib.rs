pub mod error;
pub mod extract;
pub mod mutation;
pub mod rest_api;
pub mod state;
pub mod validate;

/// Lets a repository be used as a handler argument, built from the shared pool
/// with the configured query deadline.
#[macro_export]
macro_rules! repository_from_request {
    ($repo:ty) => {
        impl axum::extract::FromRequestParts<$crate::state::AppState> for $repo {
            type Rejection = std::convert::Infallible;

            fn from_request_parts(
                _parts: &mut http::request::Parts,
                state: &$crate::state::AppState,
            ) -> impl std::future::Future<Output = std::result::Result<Self, Self::Rejection>>
                   + core::marker::Send {
                futures::future::ready(std::result::Result::Ok(<$repo>::with_deadline(
                    state.pool().clone(),
                    state.config().query_timeout,
                )))
            }
        }
    };
}
