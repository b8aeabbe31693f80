/**
 * Identity Middleware
 *
 * Authentication happens upstream of the relay. The authenticating proxy
 * forwards the caller's identity in the `x-user-id` header; this module
 * lifts it into request extensions and checks it against path parameters.
 */

use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::backend::error::BackendError;

/// Header carrying the authenticated caller identity
pub const IDENTITY_HEADER: &str = "x-user-id";

/// Caller identity attached by `identity_middleware`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub identity: String,
}

/// Identity middleware
///
/// Reads `x-user-id`, rejects the request with 401 if it is missing or
/// blank, and stores an `AuthenticatedUser` in the request extensions.
pub async fn identity_middleware(mut request: Request, next: Next) -> Result<Response, BackendError> {
    let identity = request
        .headers()
        .get(IDENTITY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|identity| !identity.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            tracing::warn!("[Auth] Missing {} header", IDENTITY_HEADER);
            BackendError::handler(StatusCode::UNAUTHORIZED, "missing caller identity")
        })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { identity });
    Ok(next.run(request).await)
}

/// Require the caller to act as `publisher`
///
/// # Errors
///
/// 403 Forbidden when the identities differ
pub fn verify_matching_identity(user: &AuthenticatedUser, publisher: &str) -> Result<(), BackendError> {
    if user.identity != publisher {
        tracing::warn!(
            identity = %user.identity,
            publisher,
            "[Auth] Caller does not match publisher"
        );
        return Err(BackendError::handler(
            StatusCode::FORBIDDEN,
            "caller may not publish as this identity",
        ));
    }
    Ok(())
}

/// Axum extractor for the caller identity set by `identity_middleware`
#[derive(Clone, Debug)]
pub struct AuthUser(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| BackendError::handler(StatusCode::UNAUTHORIZED, "missing caller identity"))
    }
}
