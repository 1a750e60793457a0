//! Extraction of the acting member from request headers.

use axum::{extract::FromRequestParts, http::request::Parts};
use plocky_core::ExternalId;

use crate::error::AppError;

/// Header carrying the opaque member identity, set by the authentication proxy.
pub const MEMBER_HEADER: &str = "x-member-id";

/// The member on whose behalf a request is made.
#[derive(Debug, Clone)]
pub struct Viewer(pub ExternalId);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(MEMBER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Viewer(ExternalId(value.to_owned())))
            .ok_or(AppError::MissingIdentity)
    }
}
