//! Caller identity extractor.
//!
//! Tasklane sits behind an authenticating proxy that forwards the verified
//! user as the `X-User-Id` header. Every task and run handler requires it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use tasklane_types::task::Caller;

use crate::http::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller of a request.
pub struct CallerIdentity(pub Caller);

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts.headers.get(USER_ID_HEADER).ok_or_else(|| {
            AppError::Unauthorized("Missing caller identity. Provide an 'X-User-Id' header.".to_string())
        })?;
        let user_id = value
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid X-User-Id header encoding".to_string()))?
            .trim();
        if user_id.is_empty() {
            return Err(AppError::Unauthorized("Empty X-User-Id header".to_string()));
        }
        Ok(CallerIdentity(Caller::new(user_id)))
    }
}
