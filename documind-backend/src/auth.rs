//! Trusted-identity extraction.
//!
//! Authentication itself is the fronting identity provider's job; it
//! terminates the user's credentials and injects the authenticated user id
//! as a request header. This module trusts that header unconditionally,
//! which is exactly as safe as the deployment in front of it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use uuid::Uuid;

use crate::error::WebError;

/// Header set by the identity provider in front of this service.
pub const USER_ID_HEADER: &str = "x-documind-user";

/// The authenticated owner of the current request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnerId(pub Uuid);

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                WebError::new(
                    StatusCode::UNAUTHORIZED,
                    "Missing user identity".to_string(),
                )
            })?;

        let id = Uuid::parse_str(raw).map_err(|_| {
            WebError::new(
                StatusCode::UNAUTHORIZED,
                "Invalid user identity".to_string(),
            )
        })?;

        Ok(OwnerId(id))
    }
}
