//! Request guards: the `require_auth` layer and the `AuthUser` extractor.

use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::models::User;
use axum::{
    body::Body,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::session::authenticate;

/// Extractor that validates the Authorization header and provides the authenticated user.
///
/// Behind `require_auth` the user is already resolved and is taken from the
/// request extensions; otherwise the token is looked up.
/// ```ignore
/// async fn my_handler(AuthUser(user): AuthUser) -> impl IntoResponse {
///     // user is the authenticated User
/// }
/// ```
pub struct AuthUser(pub User);

#[derive(Debug, PartialEq)]
pub enum AuthError {
    MissingHeader,
    InvalidHeader,
    InvalidFormat,
    InvalidToken,
    /// The session store could not be reached
    Unavailable,
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingHeader => "Missing Authorization header",
            AuthError::InvalidHeader => "Invalid Authorization header",
            AuthError::InvalidFormat => "Invalid Authorization header format",
            AuthError::InvalidToken => "Invalid or expired token",
            AuthError::Unavailable => "Database connection failed",
        };

        (self.status(), Json(ErrorResponse::new(message))).into_response()
    }
}

/// Pull the bearer token out of the Authorization header.
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?;

    let auth_str = auth_header.to_str().map_err(|_| AuthError::InvalidHeader)?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<DbPool>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(AuthUser(user.clone()));
        }

        let pool = Arc::<DbPool>::from_ref(state);
        let token = bearer_token(&parts.headers)?;
        authenticate(&pool, token).map(AuthUser)
    }
}

/// Layer for routes that are protected by default. The resolved user is
/// stored in the request extensions for `AuthUser`.
pub async fn require_auth(
    State(pool): State<Arc<DbPool>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let resolved = bearer_token(request.headers()).and_then(|token| authenticate(&pool, token));
    let user = match resolved {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc123")), Ok("abc123"));
        assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingHeader));
        assert_eq!(bearer_token(&headers("Basic abc")), Err(AuthError::InvalidFormat));
        assert_eq!(bearer_token(&headers("Bearer ")), Err(AuthError::InvalidFormat));
    }

    #[test]
    fn test_unreachable_session_store_is_a_server_error() {
        assert_eq!(
            AuthError::Unavailable.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
