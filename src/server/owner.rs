use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::CoreError;

/// Header set by the authentication proxy in front of this service.
pub const OWNER_HEADER: &str = "x-user-id";

/// Identity of the caller, as established upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerId(pub String);

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CoreError::Auth(format!("missing {OWNER_HEADER} header")))?;
        Ok(OwnerId(value.to_string()))
    }
}
