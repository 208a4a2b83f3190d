//! Bearer-token session extractor.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    Json,
};

use super::{ApiError, AppState};

/// A request made with a live session token.
///
/// Adding this extractor to a handler makes the route require login.
#[derive(Debug, Clone)]
pub struct Session {
    /// The token the request was made with
    pub token: String,
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for Session {
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Login required")),
            ));
        };

        if !state.sessions.is_valid(token) {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Session expired or invalid")),
            ));
        }

        Ok(Self {
            token: token.to_string(),
        })
    }
}
