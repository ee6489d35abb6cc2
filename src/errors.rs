use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized: {message}")]
    Unauthorized {
        code: &'static str,
        message: &'static str,
    },
    #[error("bad request: {message}")]
    BadRequest {
        code: &'static str,
        message: &'static str,
    },
    #[error("upstream failure: {message}")]
    Upstream { code: &'static str, message: String },
    #[error("internal error")]
    Internal { code: &'static str, message: String },
}

/// OAuth-style error body, shared by the auth gate and generic server failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_description: String,
}

impl AppError {
    pub fn unauthorized(code: &'static str, message: &'static str) -> Self {
        Self::Unauthorized { code, message }
    }

    pub fn bad_request(code: &'static str, message: &'static str) -> Self {
        Self::BadRequest { code, message }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            code: "upstream_failure",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "internal_error",
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, challenge) = match self {
            Self::Unauthorized { code, message } => (
                StatusCode::UNAUTHORIZED,
                code,
                message.to_string(),
                Some(format!(
                    "Bearer error=\"{code}\", error_description=\"{message}\""
                )),
            ),
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, code, message.to_string(), None)
            }
            Self::Upstream { message, .. } | Self::Internal { message, .. } => {
                tracing::error!(error = %message, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server_error",
                    "Internal Server Error".to_string(),
                    None,
                )
            }
        };

        let mut response = (
            status,
            Json(ErrorResponse {
                error: code.to_string(),
                error_description: message,
            }),
        )
            .into_response();

        if let Some(value) = challenge.and_then(|value| HeaderValue::from_str(&value).ok()) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        http::{header, StatusCode},
        response::IntoResponse,
    };
    use http_body_util::BodyExt;

    use super::AppError;

    #[tokio::test]
    async fn unauthorized_sets_bearer_challenge() {
        let response =
            AppError::unauthorized("invalid_token", "Missing Authorization header").into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .and_then(|value| value.to_str().ok()),
            Some("Bearer error=\"invalid_token\", error_description=\"Missing Authorization header\"")
        );
    }

    #[tokio::test]
    async fn upstream_failure_hides_details() {
        let response = AppError::upstream("quota exceeded for key abc").into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        assert_eq!(
            body,
            "{\"error\":\"server_error\",\"error_description\":\"Internal Server Error\"}"
        );
    }
}
