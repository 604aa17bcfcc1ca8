//! `Json` and `Query` extractors whose rejections render as [`ErrorResponse`].
//!
//! axum's own extractors answer malformed input with a `text/plain` body.
//! These wrappers forward to them and turn the rejection into an
//! [`AppError`], so clients always get the `{code, error, message}` shape.
//!
//! [`ErrorResponse`]: crate::errors::ErrorResponse

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// JSON body extractor rejecting with [`AppError::JsonExtractorRejection`].
///
/// # Example
/// ```ignore
/// async fn upload(ApiJson(body): ApiJson<UploadRequest>) -> Result<Json<Value>, AppError> {
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Query string extractor rejecting with [`AppError::QueryExtractorRejection`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}
