use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use thiserror::Error;

use crate::{errors::AppError, AppState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("missing authorization header")]
    MissingCredential,
    #[error("malformed authorization header")]
    MalformedCredential,
    #[error("bearer token rejected")]
    InvalidCredential,
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::MissingCredential => {
                AppError::unauthorized("invalid_token", "Missing Authorization header")
            }
            CredentialError::MalformedCredential => AppError::unauthorized(
                "invalid_token",
                "Invalid Authorization header format, expected 'Bearer TOKEN'",
            ),
            CredentialError::InvalidCredential => {
                AppError::unauthorized("invalid_token", "Invalid bearer token")
            }
        }
    }
}

/// Pulls the bearer token out of `Authorization`, checking only its shape.
///
/// The scheme is matched case-insensitively and the token must be non-empty.
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, CredentialError> {
    let auth = headers
        .typed_try_get::<Authorization<Bearer>>()
        .map_err(|_| CredentialError::MalformedCredential)?
        .ok_or(CredentialError::MissingCredential)?;

    let token = auth.token().trim();
    if token.is_empty() {
        return Err(CredentialError::MalformedCredential);
    }

    Ok(token.to_string())
}

pub async fn require_bearer_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer(request.headers())?;

    if let Some(expected) = state.api_token.as_deref() {
        if token != expected {
            return Err(CredentialError::InvalidCredential.into());
        }
    }

    Ok(next.run(request).await)
}
