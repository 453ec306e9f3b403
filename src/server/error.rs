use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::errors::IdeaSwipeError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("{message}")]
    Upstream {
        message: String,
        details: Option<String>,
    },
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl ApiError {
    pub fn upstream(message: impl Into<String>, source: &IdeaSwipeError) -> Self {
        ApiError::Upstream {
            message: message.into(),
            details: Some(source.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message, details) = match &self {
            ApiError::Validation(m) => ("Bad Request", m.as_str(), None),
            ApiError::Auth(m) => ("Unauthorized", m.as_str(), None),
            ApiError::Upstream { message, details } => {
                ("Internal server error", message.as_str(), details.as_deref())
            }
        };

        let body = ErrorBody {
            error,
            message,
            details,
        };
        (status, Json(body)).into_response()
    }
}
