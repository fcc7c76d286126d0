//! Caller identity forwarded by the authenticating proxy.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::error::ApiError;

/// Header carrying the authenticated principal's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller of a request.
///
/// `auth_token` is the raw `Authorization` header value and is forwarded
/// unchanged to collaborator services; it may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub auth_token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::unauthenticated("missing caller identity"))?
            .to_string();

        let auth_token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(Caller {
            user_id,
            auth_token,
        })
    }
}
